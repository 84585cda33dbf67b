//! Headline sentiment + impact classifier
//!
//! Explainable rule layers:
//! - base polarity is the VADER compound score
//! - finance-language nudges of +/-0.10
//! - category and impact from macro / geopolitical / company keyword families

use vader_sentiment::SentimentIntensityAnalyzer;

use crate::types::{HeadlineAnalysis, ImpactLabel, NewsCategory, SentimentLabel};

const FINANCE_NUDGE: f64 = 0.10;
const LABEL_THRESHOLD: f64 = 0.15;

const POS_FINANCE: &[&str] = &[
    "beats",
    "beat",
    "surge",
    "soar",
    "record",
    "upgrade",
    "raises guidance",
    "strong demand",
    "profit jumps",
    "rally",
    "growth accelerates",
];

const NEG_FINANCE: &[&str] = &[
    "miss",
    "misses",
    "plunge",
    "drop",
    "falls",
    "downgrade",
    "cuts guidance",
    "lawsuit",
    "probe",
    "sec",
    "fine",
    "fraud",
    "recall",
    "bankruptcy",
    "layoffs",
];

const MACRO_KEYS: &[&str] = &[
    "inflation",
    "cpi",
    "rate",
    "rates",
    "fed",
    "ecb",
    "boe",
    "recession",
    "gdp",
    "unemployment",
    "yield",
];

const GEO_KEYS: &[&str] = &[
    "war",
    "conflict",
    "sanction",
    "election",
    "attack",
    "tariff",
    "trade ban",
    "border",
];

const COMPANY_KEYS: &[&str] = &[
    "earnings",
    "guidance",
    "revenue",
    "profit",
    "ceo",
    "ipo",
    "merger",
    "acquisition",
    "buyback",
];

/// Keyword-family impact boosts
const MACRO_BOOST: f64 = 0.20;
const GEO_BOOST: f64 = 0.20;
const COMPANY_BOOST: f64 = 0.15;

/// Rule-based headline classifier on top of VADER polarity
pub struct SentimentAnalyzer {
    vader: SentimentIntensityAnalyzer<'static>,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            vader: SentimentIntensityAnalyzer::new(),
        }
    }

    /// Analyze one headline
    pub fn analyze(&self, headline: &str) -> HeadlineAnalysis {
        score_headline(self.polarity(headline), headline)
    }

    /// VADER compound score in [-1, 1]
    pub fn polarity(&self, headline: &str) -> f64 {
        self.vader
            .polarity_scores(headline)
            .get("compound")
            .copied()
            .unwrap_or(0.0)
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply finance nudges, category and impact rules to a base polarity
pub fn score_headline(base: f64, headline: &str) -> HeadlineAnalysis {
    let tokens = tokenize(headline);

    let mut compound = base;
    if any_phrase(&tokens, POS_FINANCE) {
        compound += FINANCE_NUDGE;
    }
    if any_phrase(&tokens, NEG_FINANCE) {
        compound -= FINANCE_NUDGE;
    }
    let compound = compound.clamp(-1.0, 1.0);

    let label = if compound >= LABEL_THRESHOLD {
        SentimentLabel::Positive
    } else if compound <= -LABEL_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    };

    let macro_hit = any_phrase(&tokens, MACRO_KEYS);
    let geo_hit = any_phrase(&tokens, GEO_KEYS);
    let company_hit = any_phrase(&tokens, COMPANY_KEYS);

    let category = match (macro_hit, geo_hit, company_hit) {
        (true, false, false) => NewsCategory::Macro,
        (false, true, false) => NewsCategory::Geopolitical,
        (false, false, true) => NewsCategory::Company,
        _ => NewsCategory::Mixed,
    };

    let mut impact = (compound.abs() * 0.7).min(1.0);
    if macro_hit {
        impact += MACRO_BOOST;
    }
    if geo_hit {
        impact += GEO_BOOST;
    }
    if company_hit {
        impact += COMPANY_BOOST;
    }
    let impact_score = impact.clamp(0.0, 1.0);

    HeadlineAnalysis {
        label,
        compound,
        impact_score,
        impact_label: ImpactLabel::from_score(impact_score),
        category,
    }
}

/// Lowercase word tokens; apostrophes are dropped so "isn't" becomes "isnt"
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.replace('\'', ""))
        .filter(|t| !t.is_empty())
        .collect()
}

/// True when any phrase appears as a run of whole tokens
fn any_phrase(tokens: &[String], phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| {
        let words: Vec<&str> = phrase.split_whitespace().collect();
        !words.is_empty()
            && tokens
                .windows(words.len())
                .any(|w| w.iter().zip(&words).all(|(t, p)| t == p))
    })
}
