//! Decision log helpers - what changed, why, and whether it is worth logging

use sha2::{Digest, Sha256};
use std::collections::{HashSet, VecDeque};

use crate::types::{AnalyzedHeadline, Regime};
use crate::weights::{turnover, WeightVector};

/// Weight moves at or below this are noise
const CHANGE_NOISE: f64 = 0.0001;
/// Hashes remembered by a gate before the oldest is forgotten
const MAX_REMEMBERED: usize = 100;
/// Headline characters quoted in a log message
const TITLE_PREVIEW: usize = 50;

/// One ticker's move between two weight vectors
#[derive(Debug, Clone, PartialEq)]
pub struct WeightChange {
    pub ticker: String,
    pub old: f64,
    pub new: f64,
    pub delta: f64,
}

/// The `n` largest moves by absolute size, noise filtered out
pub fn top_changes(old: &WeightVector, new: &WeightVector, n: usize) -> Vec<WeightChange> {
    let mut tickers: Vec<&str> = old.tickers().chain(new.tickers()).collect();
    tickers.sort_unstable();
    tickers.dedup();

    let mut changes: Vec<WeightChange> = tickers
        .into_iter()
        .filter_map(|t| {
            let (o, w) = (old.weight(t), new.weight(t));
            let delta = w - o;
            (delta.abs() > CHANGE_NOISE).then(|| WeightChange {
                ticker: t.to_string(),
                old: o,
                new: w,
                delta,
            })
        })
        .collect();

    changes.sort_by(|a, b| b.delta.abs().total_cmp(&a.delta.abs()));
    changes.truncate(n);
    changes
}

/// Directional headlines with impact at least `min_impact`, strongest first
pub fn relevant_headlines(
    analyzed: &[AnalyzedHeadline],
    min_impact: f64,
    n: usize,
) -> Vec<&AnalyzedHeadline> {
    let mut relevant: Vec<&AnalyzedHeadline> = analyzed
        .iter()
        .filter(|a| a.analysis.impact_score >= min_impact && a.analysis.label.is_directional())
        .collect();
    relevant.sort_by(|a, b| b.analysis.impact_score.total_cmp(&a.analysis.impact_score));
    relevant.truncate(n);
    relevant
}

/// Stable fingerprint of a decision, at minute precision.
///
/// `scope` names what was decided (the regime call or one portfolio), so an
/// empty vector in one scope never collides with another. Weights are rounded
/// to 3dp so tiny float drift does not defeat the match.
pub fn decision_hash(scope: &str, regime: Regime, weights: &WeightVector, timestamp: &str) -> String {
    let minute: String = timestamp.chars().take(16).collect();
    let rounded: WeightVector = weights
        .iter()
        .map(|(k, v)| (k, (v * 1000.0).round() / 1000.0))
        .collect();
    let weights_json = serde_json::to_string(&rounded).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(format!("{}|{}|{}|{}", scope, regime, weights_json, minute).as_bytes());
    hex::encode(hasher.finalize())
}

/// Remembers logged decisions so repeated evaluation does not spam the log
#[derive(Debug, Default)]
pub struct DecisionGate {
    seen: HashSet<String>,
    order: VecDeque<String>,
}

impl DecisionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log only new decisions that moved at least `min_turnover`, or that
    /// were driven by high-impact news. Nothing is remembered until
    /// [`DecisionGate::remember`] is called for a written entry.
    pub fn should_log(
        &self,
        old: &WeightVector,
        new: &WeightVector,
        hash: &str,
        min_turnover: f64,
        high_impact_news: bool,
    ) -> bool {
        if self.seen.contains(hash) {
            return false;
        }
        turnover(old, new) >= min_turnover || high_impact_news
    }

    /// Mark a decision as logged, forgetting the oldest beyond capacity
    pub fn remember(&mut self, hash: &str) {
        if !self.seen.insert(hash.to_string()) {
            return;
        }
        self.order.push_back(hash.to_string());
        while self.order.len() > MAX_REMEMBERED {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
    }

    pub fn remembered(&self) -> usize {
        self.seen.len()
    }
}

/// `'Title preview...' (Source, Label, impact 0.00) | ...`
pub fn format_drivers(drivers: &[&AnalyzedHeadline]) -> String {
    drivers
        .iter()
        .map(|d| {
            let preview: String = d.headline.title.chars().take(TITLE_PREVIEW).collect();
            format!(
                "'{}...' ({}, {}, impact {:.2})",
                preview, d.headline.source, d.analysis.label, d.analysis.impact_score
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Human-readable summary of one update: turnover, top moves, drivers
pub fn format_decision_message(
    action: &str,
    portfolio_name: &str,
    old: &WeightVector,
    new: &WeightVector,
    drivers: &[&AnalyzedHeadline],
) -> String {
    let mut parts = vec![
        format!("{} in {}", action, portfolio_name),
        format!("(Turnover: {:.1}%)", turnover(old, new) * 100.0),
    ];

    let changes = top_changes(old, new, 3);
    if !changes.is_empty() {
        let text = changes
            .iter()
            .map(|c| {
                format!(
                    "{}: {:.1}%→{:.1}% ({:+.1}%)",
                    c.ticker,
                    c.old * 100.0,
                    c.new * 100.0,
                    c.delta * 100.0
                )
            })
            .collect::<Vec<_>>()
            .join(" | ");
        parts.push(format!("Changes: {}", text));
    }

    if !drivers.is_empty() {
        parts.push(format!("Drivers: {}", format_drivers(drivers)));
    }

    parts.join(" — ")
}

/// Label of the strongest headline that names `ticker`, else the market regime
pub fn infer_asset_sentiment(analyzed: &[AnalyzedHeadline], ticker: &str, regime: Regime) -> String {
    let needle = ticker.to_lowercase();
    analyzed
        .iter()
        .filter(|a| a.headline.title.to_lowercase().contains(&needle))
        // first of equal maxima wins
        .rev()
        .max_by(|a, b| a.analysis.impact_score.total_cmp(&b.analysis.impact_score))
        .map(|a| a.analysis.label.to_string())
        .unwrap_or_else(|| format!("Market: {}", regime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Headline, HeadlineAnalysis, NewsCategory, SentimentLabel};

    fn wv(pairs: &[(&str, f64)]) -> WeightVector {
        pairs.iter().copied().collect()
    }

    fn analyzed(title: &str, label: SentimentLabel, impact: f64) -> AnalyzedHeadline {
        AnalyzedHeadline {
            headline: Headline::new(title, "Wire"),
            analysis: HeadlineAnalysis::new(label, impact, NewsCategory::Company),
        }
    }

    #[test]
    fn test_top_changes_sorted_and_filtered() {
        let old = wv(&[("A", 0.5), ("B", 0.3), ("C", 0.2)]);
        let new = wv(&[("A", 0.4), ("B", 0.30005), ("D", 0.29995)]);
        let changes = top_changes(&old, &new, 3);

        let tickers: Vec<&str> = changes.iter().map(|c| c.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["D", "C", "A"]);
        assert!((changes[1].delta + 0.2).abs() < 1e-9);
        assert_eq!(changes[1].new, 0.0);
    }

    #[test]
    fn test_relevant_headlines() {
        let batch = vec![
            analyzed("low", SentimentLabel::Positive, 0.2),
            analyzed("neutral", SentimentLabel::Neutral, 0.9),
            analyzed("mid", SentimentLabel::Negative, 0.5),
            analyzed("high", SentimentLabel::Positive, 0.8),
        ];
        let picked = relevant_headlines(&batch, 0.40, 2);
        let titles: Vec<&str> = picked.iter().map(|a| a.headline.title.as_str()).collect();
        assert_eq!(titles, vec!["high", "mid"]);
    }

    #[test]
    fn test_decision_hash_minute_precision() {
        let w = wv(&[("A", 0.5), ("B", 0.5)]);
        let h1 = decision_hash("bull", Regime::Bullish, &w, "2026-10-19T10:15:03Z");
        let h2 = decision_hash("bull", Regime::Bullish, &w, "2026-10-19T10:15:59Z");
        let h3 = decision_hash("bull", Regime::Bullish, &w, "2026-10-19T10:16:00Z");
        let h4 = decision_hash("bull", Regime::Bearish, &w, "2026-10-19T10:15:03Z");
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert_ne!(h1, h4);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn test_decision_hash_ignores_sub_rounding_drift() {
        let a = wv(&[("A", 0.5), ("B", 0.5)]);
        let b = wv(&[("A", 0.50001), ("B", 0.49999)]);
        let ts = "2026-10-19T10:15:03Z";
        assert_eq!(
            decision_hash("bear", Regime::Neutral, &a, ts),
            decision_hash("bear", Regime::Neutral, &b, ts)
        );
    }

    #[test]
    fn test_decision_hash_is_scoped() {
        let empty = WeightVector::new();
        let ts = "2026-10-19T10:15:03Z";
        assert_ne!(
            decision_hash("regime", Regime::Neutral, &empty, ts),
            decision_hash("Bullish (Risk-On)", Regime::Neutral, &empty, ts)
        );
    }

    #[test]
    fn test_gate_dedupes_and_requires_movement() {
        let mut gate = DecisionGate::new();
        let old = wv(&[("A", 0.5), ("B", 0.5)]);
        let tiny = wv(&[("A", 0.502), ("B", 0.498)]);
        let big = wv(&[("A", 0.6), ("B", 0.4)]);

        assert!(!gate.should_log(&old, &tiny, "h1", 0.01, false));
        assert!(gate.should_log(&old, &tiny, "h1", 0.01, true));
        gate.remember("h1");
        assert!(!gate.should_log(&old, &big, "h1", 0.01, true));
        assert!(gate.should_log(&old, &big, "h2", 0.01, false));
        gate.remember("h2");
        gate.remember("h2");
        assert_eq!(gate.remembered(), 2);
    }

    #[test]
    fn test_gate_only_remembers_written_decisions() {
        let mut gate = DecisionGate::new();
        let old = wv(&[("A", 0.5), ("B", 0.5)]);
        let big = wv(&[("A", 0.6), ("B", 0.4)]);

        // Checking twice without a write still allows the entry
        assert!(gate.should_log(&old, &big, "h1", 0.01, false));
        assert!(gate.should_log(&old, &big, "h1", 0.01, false));
        assert_eq!(gate.remembered(), 0);

        gate.remember("h1");
        assert!(!gate.should_log(&old, &big, "h1", 0.01, false));
    }

    #[test]
    fn test_gate_forgets_oldest_beyond_capacity() {
        let mut gate = DecisionGate::new();
        let w = WeightVector::new();
        for i in 0..105 {
            let hash = format!("h{}", i);
            assert!(gate.should_log(&w, &w, &hash, 0.0, false));
            gate.remember(&hash);
        }
        assert_eq!(gate.remembered(), 100);
        // h0 was evicted, h104 is still remembered
        assert!(gate.should_log(&w, &w, "h0", 0.0, false));
        assert!(!gate.should_log(&w, &w, "h104", 0.0, false));
    }

    #[test]
    fn test_format_decision_message() {
        let old = wv(&[("A", 0.5), ("B", 0.5)]);
        let new = wv(&[("A", 0.15), ("B", 0.85)]);
        let drivers_src = vec![analyzed("Chipmaker beats estimates", SentimentLabel::Positive, 0.62)];
        let drivers: Vec<&AnalyzedHeadline> = drivers_src.iter().collect();

        let msg = format_decision_message("Manual reallocation", "Bullish (Risk-On)", &old, &new, &drivers);
        assert!(msg.starts_with("Manual reallocation in Bullish (Risk-On) — (Turnover: 70.0%)"));
        assert!(msg.contains("A: 50.0%→15.0% (-35.0%)"));
        assert!(msg.contains("B: 50.0%→85.0% (+35.0%)"));
        assert!(msg.contains("Drivers: 'Chipmaker beats estimates...' (Wire, Positive, impact 0.62)"));
    }

    #[test]
    fn test_format_decision_message_without_changes() {
        let w = wv(&[("A", 1.0)]);
        let msg = format_decision_message("Automated rebalance", "Bearish (Risk-Reduced)", &w, &w, &[]);
        assert_eq!(msg, "Automated rebalance in Bearish (Risk-Reduced) — (Turnover: 0.0%)");
    }

    #[test]
    fn test_infer_asset_sentiment() {
        let batch = vec![
            analyzed("Tsla recalls cars", SentimentLabel::Negative, 0.4),
            analyzed("TSLA deliveries beat", SentimentLabel::Positive, 0.7),
        ];
        assert_eq!(infer_asset_sentiment(&batch, "TSLA", Regime::Neutral), "Positive");
        assert_eq!(infer_asset_sentiment(&batch, "NVDA", Regime::Bearish), "Market: Bearish");
    }

    #[test]
    fn test_infer_asset_sentiment_tie_keeps_first_headline() {
        let batch = vec![
            analyzed("XOM cuts output", SentimentLabel::Negative, 0.5),
            analyzed("XOM raises dividend", SentimentLabel::Positive, 0.5),
        ];
        assert_eq!(infer_asset_sentiment(&batch, "XOM", Regime::Neutral), "Negative");
    }
}
