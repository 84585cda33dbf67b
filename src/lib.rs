//! News Allocator Library
//!
//! Headline-driven regime detection and capped, turnover-limited weights
//! for a bullish and a bearish portfolio. Simulation only; nothing trades.

pub mod config;
pub mod decision;
pub mod error;
pub mod journal;
pub mod news;
pub mod portfolio;
pub mod prices;
pub mod rebalance;
pub mod regime;
pub mod runner;
pub mod sentiment;
pub mod state;
pub mod types;
pub mod weights;

// Re-export main types for convenience
pub use config::AllocatorConfig;
pub use decision::DecisionGate;
pub use error::{AllocatorError, Result};
pub use journal::{AuditSink, DecisionRecord, JournalSink, MemorySink};
pub use news::{HeadlineSource, RssHeadlineSource, StaticHeadlineSource};
pub use portfolio::{PortfolioBuilder, PortfolioPair, Tilt, TiltTable, WeightRow};
pub use prices::{HttpPriceSource, PriceSource, StaticPriceSource};
pub use rebalance::{rebalance_to_target, try_rebalance_to_target};
pub use regime::{determine_regime, RegimeClassifier};
pub use runner::{AllocatorRunner, CycleReport, ManualOutcome};
pub use sentiment::{score_headline, SentimentAnalyzer};
pub use state::{SessionState, StateManager};
pub use types::*;
pub use weights::{clamp_weights, equal_weight, limit_turnover, turnover, RiskLimits, WeightVector};
