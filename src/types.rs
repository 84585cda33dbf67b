//! Shared domain types: headlines, sentiment analyses, regimes

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single headline as delivered by a headline source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub source: String,
    /// Free-form publication date as reported by the feed (may be empty)
    #[serde(default)]
    pub published: String,
}

impl Headline {
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source: source.into(),
            published: String::new(),
        }
    }
}

/// Sentiment direction of a headline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Positive or Negative, i.e. the headline takes a side
    pub fn is_directional(&self) -> bool {
        !matches!(self, SentimentLabel::Neutral)
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Positive => write!(f, "Positive"),
            SentimentLabel::Neutral => write!(f, "Neutral"),
            SentimentLabel::Negative => write!(f, "Negative"),
        }
    }
}

/// Coarse bucket of the impact score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactLabel {
    Low,
    Medium,
    High,
}

impl ImpactLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.70 {
            ImpactLabel::High
        } else if score >= 0.40 {
            ImpactLabel::Medium
        } else {
            ImpactLabel::Low
        }
    }
}

impl fmt::Display for ImpactLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImpactLabel::Low => write!(f, "Low"),
            ImpactLabel::Medium => write!(f, "Medium"),
            ImpactLabel::High => write!(f, "High"),
        }
    }
}

/// What a headline is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NewsCategory {
    Macro,
    Geopolitical,
    Company,
    #[default]
    Mixed,
}

impl NewsCategory {
    /// Categories that count toward risk-off pressure when negative
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            NewsCategory::Macro | NewsCategory::Geopolitical | NewsCategory::Mixed
        )
    }
}

impl fmt::Display for NewsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewsCategory::Macro => write!(f, "Macro"),
            NewsCategory::Geopolitical => write!(f, "Geopolitical"),
            NewsCategory::Company => write!(f, "Company"),
            NewsCategory::Mixed => write!(f, "Mixed"),
        }
    }
}

/// Classifier output for one headline. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineAnalysis {
    pub label: SentimentLabel,
    /// Polarity in [-1, 1]
    #[serde(default)]
    pub compound: f64,
    /// Market relevance in [0, 1]
    pub impact_score: f64,
    pub impact_label: ImpactLabel,
    #[serde(default)]
    pub category: NewsCategory,
}

impl HeadlineAnalysis {
    /// Build an analysis from the three fields the regime rules read
    pub fn new(label: SentimentLabel, impact_score: f64, category: NewsCategory) -> Self {
        Self {
            label,
            compound: 0.0,
            impact_score,
            impact_label: ImpactLabel::from_score(impact_score),
            category,
        }
    }
}

/// A headline paired with its analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedHeadline {
    pub headline: Headline,
    pub analysis: HeadlineAnalysis,
}

/// Market regime derived from one batch of headlines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Regime {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Bullish => write!(f, "Bullish"),
            Regime::Bearish => write!(f, "Bearish"),
            Regime::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Regime plus the human-readable reason it was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeDecision {
    pub regime: Regime,
    pub reason: String,
}

impl RegimeDecision {
    pub fn new(regime: Regime, reason: impl Into<String>) -> Self {
        Self {
            regime,
            reason: reason.into(),
        }
    }
}

impl Default for RegimeDecision {
    /// Nothing classified yet
    fn default() -> Self {
        Self::new(Regime::Neutral, "no signal")
    }
}

/// The two portfolios the allocator maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortfolioKind {
    /// Risk-on universe
    Bullish,
    /// Risk-reduced universe
    Bearish,
}

impl PortfolioKind {
    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            PortfolioKind::Bullish => "Bullish (Risk-On)",
            PortfolioKind::Bearish => "Bearish (Risk-Reduced)",
        }
    }
}

impl fmt::Display for PortfolioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortfolioKind::Bullish => write!(f, "bullish"),
            PortfolioKind::Bearish => write!(f, "bearish"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impact_label_buckets() {
        assert_eq!(ImpactLabel::from_score(0.0), ImpactLabel::Low);
        assert_eq!(ImpactLabel::from_score(0.39), ImpactLabel::Low);
        assert_eq!(ImpactLabel::from_score(0.40), ImpactLabel::Medium);
        assert_eq!(ImpactLabel::from_score(0.70), ImpactLabel::High);
    }

    #[test]
    fn test_systemic_categories() {
        assert!(NewsCategory::Macro.is_systemic());
        assert!(NewsCategory::Geopolitical.is_systemic());
        assert!(NewsCategory::Mixed.is_systemic());
        assert!(!NewsCategory::Company.is_systemic());
    }

    #[test]
    fn test_analysis_deserializes_without_optional_fields() {
        let json = r#"{"label":"Negative","impact_score":0.6,"impact_label":"Medium"}"#;
        let analysis: HeadlineAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(analysis.label, SentimentLabel::Negative);
        assert_eq!(analysis.category, NewsCategory::Mixed);
    }
}
