//! Regime classifier - aggregates headline analyses into one market regime

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{HeadlineAnalysis, Regime, RegimeDecision, SentimentLabel};

pub const REASON_NO_SIGNAL: &str = "no signal";
pub const REASON_RISK_OFF: &str = "risk-off: negative macro/geopolitical dominance";
pub const REASON_RISK_ON: &str = "risk-on: positive dominance";
pub const REASON_MIXED: &str = "mixed signals";

/// Impact sums for one batch of analyses
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SignalTotals {
    /// Impact of Positive headlines
    pub pos: f64,
    /// Impact of Negative headlines
    pub neg: f64,
    /// Part of `neg` from Macro, Geopolitical or Mixed headlines
    pub macro_geo_neg: f64,
}

impl SignalTotals {
    pub fn from_analyses(analyses: &[HeadlineAnalysis]) -> Self {
        analyses.iter().fold(Self::default(), |mut acc, a| {
            match a.label {
                SentimentLabel::Positive => acc.pos += a.impact_score,
                SentimentLabel::Negative => {
                    acc.neg += a.impact_score;
                    if a.category.is_systemic() {
                        acc.macro_geo_neg += a.impact_score;
                    }
                }
                SentimentLabel::Neutral => {}
            }
            acc
        })
    }
}

/// Rule-based regime classifier.
///
/// Thresholds are absolute impact sums, not per-headline averages, so larger
/// batches cross them more easily.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeClassifier {
    pub conviction_threshold: f64,
}

impl Default for RegimeClassifier {
    fn default() -> Self {
        Self {
            conviction_threshold: 1.0,
        }
    }
}

impl RegimeClassifier {
    pub fn new(conviction_threshold: f64) -> Self {
        Self {
            conviction_threshold,
        }
    }

    /// Classify a batch. Rules are checked in order; the first match wins.
    pub fn classify(&self, analyses: &[HeadlineAnalysis]) -> RegimeDecision {
        if analyses.is_empty() {
            return RegimeDecision::new(Regime::Neutral, REASON_NO_SIGNAL);
        }

        let totals = SignalTotals::from_analyses(analyses);
        debug!(
            "Regime inputs: pos={:.2} neg={:.2} macro_geo_neg={:.2} ({} headlines)",
            totals.pos,
            totals.neg,
            totals.macro_geo_neg,
            analyses.len()
        );

        if totals.macro_geo_neg >= self.conviction_threshold && totals.neg > totals.pos {
            RegimeDecision::new(Regime::Bearish, REASON_RISK_OFF)
        } else if totals.pos >= self.conviction_threshold && totals.pos > totals.neg {
            RegimeDecision::new(Regime::Bullish, REASON_RISK_ON)
        } else {
            RegimeDecision::new(Regime::Neutral, REASON_MIXED)
        }
    }
}

/// Classify with the default threshold of 1.0
pub fn determine_regime(analyses: &[HeadlineAnalysis]) -> RegimeDecision {
    RegimeClassifier::default().classify(analyses)
}
