//! Weight vectors and the arithmetic that keeps them bounded
//!
//! Every function here is pure: inputs are borrowed, a new vector is returned.
//! Callers own the "previous" vector and replace it after each cycle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Sums at or below this are treated as zero when rescaling
pub const SUM_EPSILON: f64 = 1e-9;

/// Ticker -> weight snapshot for one universe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightVector(BTreeMap<String, f64>);

impl WeightVector {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, ticker: &str) -> Option<f64> {
        self.0.get(ticker).copied()
    }

    /// Weight for a ticker, 0.0 when absent
    pub fn weight(&self, ticker: &str) -> f64 {
        self.get(ticker).unwrap_or(0.0)
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.0.contains_key(ticker)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn max_weight(&self) -> f64 {
        self.0.values().copied().fold(0.0, f64::max)
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn into_inner(self) -> BTreeMap<String, f64> {
        self.0
    }

    /// Copy with `amount` added to `ticker`, if present
    pub fn with_bonus(mut self, ticker: &str, amount: f64) -> Self {
        if let Some(w) = self.0.get_mut(ticker) {
            *w += amount;
        }
        self
    }

    /// Divide every weight by the total. Returns `None` when the total is not
    /// positive, leaving the caller to pick a fallback.
    fn normalized(&self) -> Option<Self> {
        let total = self.sum();
        if total <= 0.0 {
            return None;
        }
        Some(self.iter().map(|(k, v)| (k.to_string(), v / total)).collect())
    }
}

impl FromIterator<(String, f64)> for WeightVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, f64)> for WeightVector {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

impl From<BTreeMap<String, f64>> for WeightVector {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self(map)
    }
}

/// Per-asset cap and per-update churn limit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Ceiling on any single weight (e.g. 0.15)
    pub max_weight_per_stock: f64,
    /// Ceiling on total L1 movement between two cycles (e.g. 0.15)
    pub max_turnover_per_update: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_weight_per_stock: 0.15,
            max_turnover_per_update: 0.15,
        }
    }
}

/// `1/N` for each of N tickers; empty input gives an empty vector
pub fn equal_weight<S: AsRef<str>>(tickers: &[S]) -> WeightVector {
    if tickers.is_empty() {
        return WeightVector::new();
    }
    let w = 1.0 / tickers.len() as f64;
    tickers.iter().map(|t| (t.as_ref(), w)).collect()
}

/// Clip each weight to `[0, cap]`, then rescale to sum 1.0.
///
/// Renormalizing after the clip makes the cap soft: when many entries are
/// clipped, the survivors can end up above `cap`. If nothing positive is left
/// the clipped vector is returned as-is and sums to 0.
pub fn clamp_weights(weights: &WeightVector, cap: f64) -> WeightVector {
    let capped: WeightVector = weights
        .iter()
        .map(|(k, v)| (k, v.max(0.0).min(cap)))
        .collect();

    match capped.normalized() {
        Some(normalized) => normalized,
        None => {
            debug!("clamp_weights: nothing left after clipping, returning unnormalized");
            capped
        }
    }
}

/// L1 distance over the union of tickers; a missing ticker counts as 0
pub fn turnover(previous: &WeightVector, target: &WeightVector) -> f64 {
    union_keys(previous, target)
        .iter()
        .map(|k| (target.weight(k) - previous.weight(k)).abs())
        .sum()
}

/// Move from `previous` toward `target` by at most `max_turnover` of L1 distance.
///
/// When the raw move already fits, `target` is returned untouched. Otherwise
/// every ticker moves the same fraction `max_turnover / turnover` of the way,
/// negatives are floored at 0 and the result is renormalized. If that leaves
/// nothing positive, the unlimited `target` is applied instead.
pub fn limit_turnover(
    previous: &WeightVector,
    target: &WeightVector,
    max_turnover: f64,
) -> WeightVector {
    let raw = turnover(previous, target);
    if raw <= max_turnover {
        return target.clone();
    }

    let scale = max_turnover / raw;
    let limited: WeightVector = union_keys(previous, target)
        .into_iter()
        .map(|k| {
            let prev = previous.weight(&k);
            let blended = prev + scale * (target.weight(&k) - prev);
            (k, blended.max(0.0))
        })
        .collect();

    debug!(
        "limit_turnover: raw {:.4} > max {:.4}, moving {:.1}% of the way",
        raw,
        max_turnover,
        scale * 100.0
    );

    match limited.normalized() {
        Some(normalized) => normalized,
        None => {
            debug!("limit_turnover: blend collapsed to zero, applying target unlimited");
            target.clone()
        }
    }
}

fn union_keys(a: &WeightVector, b: &WeightVector) -> Vec<String> {
    let mut keys: Vec<String> = a.tickers().chain(b.tickers()).map(str::to_string).collect();
    keys.sort();
    keys.dedup();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn wv(pairs: &[(&str, f64)]) -> WeightVector {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_equal_weight() {
        let w = equal_weight(&["A", "B", "C", "D"]);
        assert_eq!(w.len(), 4);
        assert!((w.sum() - 1.0).abs() < 1e-9);
        for (_, v) in w.iter() {
            assert!((v - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn test_equal_weight_empty_universe() {
        let empty: [&str; 0] = [];
        let w = equal_weight(&empty);
        assert!(w.is_empty());
        assert_eq!(w.sum(), 0.0);
    }

    #[test]
    fn test_equal_weight_fifteen_tickers() {
        let tickers: Vec<String> = (0..15).map(|i| format!("T{}", i)).collect();
        let w = equal_weight(&tickers);
        assert!((w.sum() - 1.0).abs() < 1e-9);
        assert!((w.weight("T7") - 1.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_weights_caps_and_renormalizes() {
        // 10 tickers at 0.05 plus one at 0.5: the big one is clipped to 0.15
        let mut pairs: Vec<(String, f64)> = (0..10).map(|i| (format!("T{}", i), 0.05)).collect();
        pairs.push(("BIG".to_string(), 0.5));
        let w: WeightVector = pairs.into_iter().collect();

        let out = clamp_weights(&w, 0.15);
        assert!((out.sum() - 1.0).abs() < EPS);
        // 0.15 / 0.65 after renormalization
        assert!((out.weight("BIG") - 0.15 / 0.65).abs() < EPS);
        assert!((out.weight("T0") - 0.05 / 0.65).abs() < EPS);
    }

    #[test]
    fn test_clamp_weights_soft_cap_after_renormalization() {
        // Both clipped to 0.15 then rescaled back to 0.5 each: the cap is a
        // soft ceiling once renormalized, which is accepted behavior.
        let out = clamp_weights(&wv(&[("A", 0.5), ("B", 0.5)]), 0.15);
        assert!((out.weight("A") - 0.5).abs() < EPS);
        assert!((out.sum() - 1.0).abs() < EPS);
        assert!(out.max_weight() > 0.15);
    }

    #[test]
    fn test_clamp_weights_negative_inputs_floor_to_zero() {
        let out = clamp_weights(&wv(&[("A", -0.2), ("B", 0.1), ("C", 0.1)]), 0.15);
        assert_eq!(out.weight("A"), 0.0);
        assert!((out.weight("B") - 0.5).abs() < EPS);
        assert!((out.sum() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_clamp_weights_degenerate_returns_unnormalized() {
        let out = clamp_weights(&wv(&[("A", -1.0), ("B", 0.0)]), 0.15);
        assert_eq!(out.len(), 2);
        assert_eq!(out.sum(), 0.0);

        let empty = clamp_weights(&WeightVector::new(), 0.15);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_clamp_weights_within_cap_is_identity_on_unit_vectors() {
        let w = equal_weight(&["A", "B", "C", "D", "E", "F", "G", "H"]);
        let out = clamp_weights(&w, 0.15);
        assert_eq!(out.len(), 8);
        for (k, v) in out.iter() {
            assert!((v - w.weight(k)).abs() < EPS);
        }
    }

    #[test]
    fn test_turnover_counts_missing_keys_as_zero() {
        let prev = wv(&[("A", 0.5), ("B", 0.5)]);
        let next = wv(&[("B", 0.5), ("C", 0.5)]);
        assert!((turnover(&prev, &next) - 1.0).abs() < EPS);
        assert_eq!(turnover(&prev, &prev), 0.0);
    }

    #[test]
    fn test_limit_turnover_within_limit_returns_target() {
        let prev = wv(&[("A", 0.5), ("B", 0.5)]);
        let target = wv(&[("A", 0.55), ("B", 0.45)]);
        let out = limit_turnover(&prev, &target, 0.15);
        assert_eq!(out, target);
    }

    #[test]
    fn test_limit_turnover_is_idempotent_on_equal_vectors() {
        let w = wv(&[("A", 0.2), ("B", 0.3), ("C", 0.5)]);
        assert_eq!(limit_turnover(&w, &w, 0.15), w);
    }

    #[test]
    fn test_limit_turnover_scales_large_moves() {
        let prev = wv(&[("A", 1.0), ("B", 0.0)]);
        let target = wv(&[("A", 0.0), ("B", 1.0)]);
        // raw turnover 2.0, scale 0.075
        let out = limit_turnover(&prev, &target, 0.15);
        assert!((out.weight("A") - 0.925).abs() < EPS);
        assert!((out.weight("B") - 0.075).abs() < EPS);
        assert!((out.sum() - 1.0).abs() < EPS);
        assert!(turnover(&prev, &out) <= 0.15 + EPS);
    }

    #[test]
    fn test_limit_turnover_introduces_new_tickers_gradually() {
        let prev = wv(&[("A", 0.5), ("B", 0.5)]);
        let target = wv(&[("C", 0.5), ("D", 0.5)]);
        let out = limit_turnover(&prev, &target, 0.2);
        assert_eq!(out.len(), 4);
        assert!((out.weight("C") - 0.05).abs() < EPS);
        assert!((out.weight("A") - 0.45).abs() < EPS);
        assert!(turnover(&prev, &out) <= 0.2 + EPS);
    }

    #[test]
    fn test_limit_turnover_bound_holds_across_shapes() {
        let cases = vec![
            (
                equal_weight(&["A", "B", "C"]),
                wv(&[("A", 0.8), ("B", 0.1), ("C", 0.1)]),
            ),
            (
                wv(&[("A", 0.1), ("B", 0.9)]),
                wv(&[("A", 0.6), ("B", 0.4)]),
            ),
            (
                wv(&[("X", 1.0)]),
                equal_weight(&["A", "B", "C", "D"]),
            ),
        ];
        for (prev, target) in cases {
            let out = limit_turnover(&prev, &target, 0.15);
            assert!(turnover(&prev, &out) <= 0.15 + EPS);
            assert!((out.sum() - 1.0).abs() < EPS);
            assert!(out.iter().all(|(_, v)| v >= 0.0));
        }
    }

    #[test]
    fn test_limit_turnover_zero_sum_falls_back_to_target() {
        // Previous is all zeros and the target is degenerate too; the blend
        // cannot be renormalized, so the target is applied unlimited.
        let prev = wv(&[("A", 0.0), ("B", 0.0)]);
        let target = wv(&[("A", -0.5), ("B", 0.0)]);
        let out = limit_turnover(&prev, &target, 0.15);
        assert_eq!(out, target);
    }

    #[test]
    fn test_serializes_with_sorted_keys() {
        let w = wv(&[("MSFT", 0.5), ("AAPL", 0.5)]);
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"{"AAPL":0.5,"MSFT":0.5}"#);
    }
}
