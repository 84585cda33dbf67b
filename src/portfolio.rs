//! Portfolio construction - universes + regime + previous weights -> final weights

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::types::{PortfolioKind, Regime};
use crate::weights::{clamp_weights, equal_weight, limit_turnover, RiskLimits, WeightVector};

/// Additive bonus for a set of tickers in one portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tilt {
    pub portfolio: PortfolioKind,
    pub tickers: Vec<String>,
    pub bonus: f64,
}

/// Regime -> tilts applied before capping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiltTable {
    #[serde(default)]
    pub bullish: Vec<Tilt>,
    #[serde(default)]
    pub bearish: Vec<Tilt>,
    #[serde(default)]
    pub neutral: Vec<Tilt>,
}

impl TiltTable {
    /// No tilts in any regime
    pub fn none() -> Self {
        Self {
            bullish: vec![],
            bearish: vec![],
            neutral: vec![],
        }
    }

    pub fn for_regime(&self, regime: Regime) -> &[Tilt] {
        match regime {
            Regime::Bullish => &self.bullish,
            Regime::Bearish => &self.bearish,
            Regime::Neutral => &self.neutral,
        }
    }
}

impl Default for TiltTable {
    /// Mega-cap tilt when risk-on, defensive tilt when risk-off
    fn default() -> Self {
        Self {
            bullish: vec![Tilt {
                portfolio: PortfolioKind::Bullish,
                tickers: ["NVDA", "MSFT", "AAPL", "AMZN"].map(String::from).to_vec(),
                bonus: 0.01,
            }],
            bearish: vec![Tilt {
                portfolio: PortfolioKind::Bearish,
                tickers: ["BRK-B", "JNJ", "PG", "WMT"].map(String::from).to_vec(),
                bonus: 0.01,
            }],
            neutral: vec![],
        }
    }
}

/// Final weights for both portfolios after one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPair {
    pub bull: WeightVector,
    pub bear: WeightVector,
}

impl PortfolioPair {
    pub fn get(&self, kind: PortfolioKind) -> &WeightVector {
        match kind {
            PortfolioKind::Bullish => &self.bull,
            PortfolioKind::Bearish => &self.bear,
        }
    }
}

/// Builds capped, tilted, turnover-limited weights. Holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct PortfolioBuilder {
    limits: RiskLimits,
    tilts: TiltTable,
}

impl PortfolioBuilder {
    pub fn new(limits: RiskLimits, tilts: TiltTable) -> Self {
        Self { limits, tilts }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Equal weight, plus this regime's tilts for `kind`, capped and renormalized
    pub fn target_weights<S: AsRef<str>>(
        &self,
        kind: PortfolioKind,
        universe: &[S],
        regime: Regime,
    ) -> WeightVector {
        let mut target = equal_weight(universe);

        for tilt in self
            .tilts
            .for_regime(regime)
            .iter()
            .filter(|t| t.portfolio == kind)
        {
            for ticker in &tilt.tickers {
                target = target.with_bonus(ticker, tilt.bonus);
            }
        }

        clamp_weights(&target, self.limits.max_weight_per_stock)
    }

    /// One portfolio: target, then turnover-limited against `previous`.
    /// An empty `previous` means first cycle, so the target applies directly.
    pub fn build_one<S: AsRef<str>>(
        &self,
        kind: PortfolioKind,
        universe: &[S],
        regime: Regime,
        previous: &WeightVector,
    ) -> WeightVector {
        let target = self.target_weights(kind, universe, regime);
        if previous.is_empty() {
            debug!("{} portfolio: no previous weights, applying target", kind);
            return target;
        }
        limit_turnover(previous, &target, self.limits.max_turnover_per_update)
    }

    /// Both portfolios for one cycle. Pure function of its inputs.
    pub fn build_portfolios<S: AsRef<str>>(
        &self,
        bullish_universe: &[S],
        bearish_universe: &[S],
        regime: Regime,
        prev_bull: &WeightVector,
        prev_bear: &WeightVector,
    ) -> PortfolioPair {
        let bull = self.build_one(PortfolioKind::Bullish, bullish_universe, regime, prev_bull);
        let bear = self.build_one(PortfolioKind::Bearish, bearish_universe, regime, prev_bear);

        info!(
            "Built portfolios for {} regime: bull {} assets, bear {} assets",
            regime,
            bull.len(),
            bear.len()
        );

        PortfolioPair { bull, bear }
    }
}

/// One row of the weights table shown to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightRow {
    pub ticker: String,
    pub weight: f64,
    /// Approximate price, display only
    pub price: Option<Decimal>,
}

/// Rows sorted by weight, heaviest first; weights rounded to 4dp, prices to 2dp
pub fn weight_rows(weights: &WeightVector, prices: &HashMap<String, Decimal>) -> Vec<WeightRow> {
    let mut rows: Vec<WeightRow> = weights
        .iter()
        .map(|(ticker, weight)| WeightRow {
            ticker: ticker.to_string(),
            weight: (weight * 10_000.0).round() / 10_000.0,
            price: prices.get(ticker).map(|p| p.round_dp(2)),
        })
        .collect();
    rows.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.ticker.cmp(&b.ticker)));
    rows
}
