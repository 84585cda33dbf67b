//! Manual single-asset rebalancing
//!
//! A confirmed user override. It keeps the sum at 1.0 and clamps the chosen
//! asset to the cap, but is never routed through the turnover limiter.

use tracing::{debug, warn};

use crate::error::{AllocatorError, Result};
use crate::types::PortfolioKind;
use crate::weights::{WeightVector, SUM_EPSILON};

/// Set `ticker` to `target_weight` (clamped to `[0, cap]`) and rescale the
/// other assets to fill the rest.
///
/// An unknown ticker returns the input unchanged. The other assets keep their
/// relative ratios; if they are all ~0 the remainder is split equally. Only
/// the adjusted asset is clamped, so the others may exceed `cap` when the
/// adjusted asset is pushed down.
pub fn rebalance_to_target(
    weights: &WeightVector,
    ticker: &str,
    target_weight: f64,
    cap: f64,
) -> WeightVector {
    if !weights.contains(ticker) {
        warn!("Rebalance ignored: {} is not in the portfolio", ticker);
        return weights.clone();
    }

    let target_weight = target_weight.max(0.0).min(cap);

    if weights.len() == 1 {
        return [(ticker, 1.0)].into_iter().collect();
    }

    let others: Vec<(&str, f64)> = weights.iter().filter(|(k, _)| *k != ticker).collect();
    let other_total_old: f64 = others.iter().map(|(_, w)| w).sum();
    let remaining = 1.0 - target_weight;

    let mut pairs: Vec<(&str, f64)> = if other_total_old <= SUM_EPSILON {
        let each = remaining / others.len() as f64;
        others.iter().map(|(k, _)| (*k, each)).collect()
    } else {
        let scale = remaining / other_total_old;
        others.iter().map(|(k, w)| (*k, w * scale)).collect()
    };
    pairs.push((ticker, target_weight));
    let out: WeightVector = pairs.into_iter().collect();

    debug!(
        "Rebalanced {}: {:.4} -> {:.4}",
        ticker,
        weights.weight(ticker),
        target_weight
    );

    let total = out.sum();
    if total > 0.0 {
        out.iter().map(|(k, v)| (k.to_string(), v / total)).collect()
    } else {
        out
    }
}

/// Strict variant: an unknown ticker is an error instead of a no-op
pub fn try_rebalance_to_target(
    portfolio: PortfolioKind,
    weights: &WeightVector,
    ticker: &str,
    target_weight: f64,
    cap: f64,
) -> Result<WeightVector> {
    if !weights.contains(ticker) {
        return Err(AllocatorError::UnknownTicker {
            portfolio,
            ticker: ticker.to_string(),
        });
    }
    Ok(rebalance_to_target(weights, ticker, target_weight, cap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::equal_weight;

    const EPS: f64 = 1e-6;

    fn wv(pairs: &[(&str, f64)]) -> WeightVector {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_target_is_clamped_to_cap() {
        let out = rebalance_to_target(&wv(&[("A", 0.5), ("B", 0.5)]), "A", 0.8, 0.15);
        assert!((out.weight("A") - 0.15).abs() < EPS);
        assert!((out.weight("B") - 0.85).abs() < EPS);
        assert!((out.sum() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_negative_target_clamps_to_zero() {
        let out = rebalance_to_target(&wv(&[("A", 0.5), ("B", 0.5)]), "A", -0.3, 0.15);
        assert_eq!(out.weight("A"), 0.0);
        assert!((out.weight("B") - 1.0).abs() < EPS);
    }

    #[test]
    fn test_single_asset_is_always_full_weight() {
        let out = rebalance_to_target(&wv(&[("X", 1.0)]), "X", 0.05, 0.15);
        assert_eq!(out, wv(&[("X", 1.0)]));

        let out = rebalance_to_target(&wv(&[("X", 0.3)]), "X", 0.9, 0.15);
        assert_eq!(out, wv(&[("X", 1.0)]));
    }

    #[test]
    fn test_unknown_ticker_is_noop() {
        let w = wv(&[("A", 0.5), ("B", 0.5)]);
        assert_eq!(rebalance_to_target(&w, "ZZZ", 0.1, 0.15), w);
    }

    #[test]
    fn test_strict_variant_reports_unknown_ticker() {
        let w = wv(&[("A", 0.5), ("B", 0.5)]);
        let err = try_rebalance_to_target(PortfolioKind::Bearish, &w, "ZZZ", 0.1, 0.15)
            .unwrap_err();
        assert!(matches!(err, AllocatorError::UnknownTicker { ref ticker, .. } if ticker == "ZZZ"));
        assert!(err.to_string().contains("bearish"));
    }

    #[test]
    fn test_others_keep_relative_ratios() {
        let w = wv(&[("A", 0.1), ("B", 0.6), ("C", 0.3)]);
        let out = rebalance_to_target(&w, "A", 0.0, 0.15);
        // B:C stays 2:1 and fills the whole unit
        assert!((out.weight("B") - 2.0 / 3.0).abs() < EPS);
        assert!((out.weight("C") - 1.0 / 3.0).abs() < EPS);
        assert!((out.weight("B") / out.weight("C") - 2.0).abs() < EPS);
    }

    #[test]
    fn test_zero_others_split_remainder_equally() {
        let w = wv(&[("A", 1.0), ("B", 0.0), ("C", 0.0)]);
        let out = rebalance_to_target(&w, "A", 0.1, 0.15);
        assert!((out.weight("A") - 0.1).abs() < EPS);
        assert!((out.weight("B") - 0.45).abs() < EPS);
        assert!((out.weight("C") - 0.45).abs() < EPS);
    }

    #[test]
    fn test_manual_move_ignores_turnover_limit() {
        // Turnover here is far above any per-update limit; manual overrides
        // are applied in full.
        let w = equal_weight(&["A", "B", "C", "D"]);
        let out = rebalance_to_target(&w, "A", 0.0, 0.15);
        assert_eq!(out.weight("A"), 0.0);
        assert!((out.weight("B") - 1.0 / 3.0).abs() < EPS);
        assert!((crate::weights::turnover(&w, &out) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_result_keeps_every_ticker() {
        let w = equal_weight(&["A", "B", "C", "D", "E"]);
        let out = rebalance_to_target(&w, "C", 0.12, 0.15);
        assert_eq!(out.len(), 5);
        assert!((out.sum() - 1.0).abs() < EPS);
    }
}
