//! Allocator configuration
//!
//! Every field has a default, so an empty or missing file is a valid config.
//! Sources, later ones winning:
//! 1. `allocator.yaml` (or the path in `ALLOCATOR_CONFIG`), optional
//! 2. `ALLOCATOR__*` environment variables, e.g. `ALLOCATOR__REFRESH_SECS=30`

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AllocatorError, Result};
use crate::portfolio::TiltTable;
use crate::types::PortfolioKind;
use crate::weights::RiskLimits;

const DEFAULT_CONFIG_FILE: &str = "allocator.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    #[serde(default = "default_max_weight")]
    pub max_weight_per_stock: f64,
    #[serde(default = "default_max_turnover")]
    pub max_turnover_per_update: f64,
    #[serde(default = "default_bullish_universe")]
    pub bullish_universe: Vec<String>,
    #[serde(default = "default_bearish_universe")]
    pub bearish_universe: Vec<String>,
    #[serde(default)]
    pub tilts: TiltTable,
    #[serde(default = "default_feeds")]
    pub feeds: Vec<String>,
    #[serde(default = "default_headline_limit")]
    pub headline_limit: usize,
    /// Display prices are skipped when unset
    #[serde(default)]
    pub price_api_url: Option<String>,
    #[serde(default = "default_journal_dir")]
    pub journal_dir: PathBuf,
    /// Automated rebalances moving less than this are not logged
    #[serde(default = "default_decision_min_turnover")]
    pub decision_min_turnover: f64,
    /// Headlines at or above this impact count as decision drivers
    #[serde(default = "default_high_impact_threshold")]
    pub high_impact_threshold: f64,
}

fn default_refresh_secs() -> u64 {
    5
}

fn default_max_weight() -> f64 {
    0.15
}

fn default_max_turnover() -> f64 {
    0.15
}

fn default_bullish_universe() -> Vec<String> {
    [
        "NVDA", "TSLA", "AAPL", "MSFT", "AMZN", "GOOGL", "META", "AVGO", "AMD", "CRM", "NOW",
        "ASML", "TSM", "NFLX", "INTC",
    ]
    .map(String::from)
    .to_vec()
}

fn default_bearish_universe() -> Vec<String> {
    [
        "AAPL", "BRK-B", "JNJ", "PG", "KO", "PEP", "WMT", "COST", "MCD", "V", "MA", "UNH", "XOM",
        "CVX", "NEE",
    ]
    .map(String::from)
    .to_vec()
}

fn default_feeds() -> Vec<String> {
    vec![
        "https://finance.yahoo.com/news/rssindex".to_string(),
        "https://feeds.marketwatch.com/marketwatch/topstories/".to_string(),
        "https://www.investing.com/rss/news_25.rss".to_string(),
    ]
}

fn default_headline_limit() -> usize {
    18
}

fn default_journal_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("news-allocator")
}

fn default_decision_min_turnover() -> f64 {
    0.01
}

fn default_high_impact_threshold() -> f64 {
    0.40
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            refresh_secs: default_refresh_secs(),
            max_weight_per_stock: default_max_weight(),
            max_turnover_per_update: default_max_turnover(),
            bullish_universe: default_bullish_universe(),
            bearish_universe: default_bearish_universe(),
            tilts: TiltTable::default(),
            feeds: default_feeds(),
            headline_limit: default_headline_limit(),
            price_api_url: None,
            journal_dir: default_journal_dir(),
            decision_min_turnover: default_decision_min_turnover(),
            high_impact_threshold: default_high_impact_threshold(),
        }
    }
}

impl AllocatorConfig {
    /// Load from the file named by `ALLOCATOR_CONFIG` (default `allocator.yaml`)
    /// plus environment overrides, then validate
    pub fn load() -> Result<Self> {
        let path = std::env::var("ALLOCATOR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load from an optional file plus environment overrides, then validate
    pub fn load_from(path: &str) -> Result<Self> {
        let cfg: Self = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("ALLOCATOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a YAML document directly, without environment overrides
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(yaml)
            .map_err(|e| AllocatorError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let fraction = |name: &str, v: f64| {
            if v > 0.0 && v <= 1.0 {
                Ok(())
            } else {
                Err(AllocatorError::InvalidConfig(format!(
                    "{} must be in (0, 1], got {}",
                    name, v
                )))
            }
        };
        fraction("max_weight_per_stock", self.max_weight_per_stock)?;
        fraction("max_turnover_per_update", self.max_turnover_per_update)?;

        if self.refresh_secs == 0 {
            return Err(AllocatorError::InvalidConfig(
                "refresh_secs must be at least 1".to_string(),
            ));
        }

        for (kind, universe) in [
            (PortfolioKind::Bullish, &self.bullish_universe),
            (PortfolioKind::Bearish, &self.bearish_universe),
        ] {
            let mut seen = HashSet::new();
            if let Some(dup) = universe.iter().find(|t| !seen.insert(t.as_str())) {
                return Err(AllocatorError::InvalidConfig(format!(
                    "duplicate ticker {} in {} universe",
                    dup, kind
                )));
            }
        }

        let tilts = self
            .tilts
            .bullish
            .iter()
            .chain(&self.tilts.bearish)
            .chain(&self.tilts.neutral);
        for tilt in tilts {
            if tilt.bonus < 0.0 {
                return Err(AllocatorError::InvalidConfig(format!(
                    "tilt bonus for {} portfolio must not be negative, got {}",
                    tilt.portfolio, tilt.bonus
                )));
            }
        }

        Ok(())
    }

    pub fn limits(&self) -> RiskLimits {
        RiskLimits {
            max_weight_per_stock: self.max_weight_per_stock,
            max_turnover_per_update: self.max_turnover_per_update,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn universe(&self, kind: PortfolioKind) -> &[String] {
        match kind {
            PortfolioKind::Bullish => &self.bullish_universe,
            PortfolioKind::Bearish => &self.bearish_universe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AllocatorConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.bullish_universe.len(), 15);
        assert_eq!(cfg.bearish_universe.len(), 15);
        assert_eq!(cfg.limits(), RiskLimits::default());
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(5));
        assert!(cfg.journal_dir.ends_with("news-allocator"));
    }

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let cfg = AllocatorConfig::from_yaml_str("{}").unwrap();
        assert_eq!(cfg, AllocatorConfig::default());
    }

    #[test]
    fn test_yaml_overrides_and_tilts() {
        let yaml = r#"
max_weight_per_stock: 0.25
bullish_universe: [A, B, C, D]
tilts:
  bullish:
    - portfolio: bullish
      tickers: [A]
      bonus: 0.05
"#;
        let cfg = AllocatorConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.max_weight_per_stock, 0.25);
        assert_eq!(cfg.max_turnover_per_update, 0.15);
        assert_eq!(cfg.universe(PortfolioKind::Bullish).len(), 4);
        assert_eq!(cfg.tilts.bullish[0].bonus, 0.05);
        assert!(cfg.tilts.bearish.is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = [
            "max_weight_per_stock: 0.0",
            "max_weight_per_stock: 1.5",
            "max_turnover_per_update: -0.1",
            "refresh_secs: 0",
            "bearish_universe: [KO, PEP, KO]",
            "tilts: {bearish: [{portfolio: bearish, tickers: [KO], bonus: -0.01}]}",
        ];
        for yaml in cases {
            let err = AllocatorConfig::from_yaml_str(yaml).unwrap_err();
            assert!(
                matches!(err, AllocatorError::InvalidConfig(_)),
                "{} should be rejected",
                yaml
            );
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allocator.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "refresh_secs: 30\nheadline_limit: 9\nprice_api_url: http://localhost:8080").unwrap();

        let cfg = AllocatorConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.refresh_secs, 30);
        assert_eq!(cfg.headline_limit, 9);
        assert_eq!(cfg.price_api_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let cfg = AllocatorConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.headline_limit, 18);
    }
}
