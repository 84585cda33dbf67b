//! Session state - the previous weights threaded between cycles, plus the
//! `state/now.json` observability file

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::Result;
use crate::types::{PortfolioKind, Regime};
use crate::weights::WeightVector;

/// Last confirmed weights per portfolio. Empty until the first cycle completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub bull_weights: WeightVector,
    pub bear_weights: WeightVector,
}

impl SessionState {
    pub fn weights(&self, kind: PortfolioKind) -> &WeightVector {
        match kind {
            PortfolioKind::Bullish => &self.bull_weights,
            PortfolioKind::Bearish => &self.bear_weights,
        }
    }

    /// Replace one portfolio's weights
    pub fn set_weights(&mut self, kind: PortfolioKind, weights: WeightVector) {
        match kind {
            PortfolioKind::Bullish => self.bull_weights = weights,
            PortfolioKind::Bearish => self.bear_weights = weights,
        }
    }
}

/// Current status (state/now.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NowState {
    pub timestamp: String,
    pub regime: Regime,
    pub reason: String,
    pub headlines_analyzed: usize,
    pub cycles_completed: u64,
    pub bull_weights: WeightVector,
    pub bear_weights: WeightVector,
}

/// Writes state files for observability
pub struct StateManager {
    state_dir: PathBuf,
}

impl StateManager {
    pub fn new(workspace_dir: impl AsRef<Path>) -> Self {
        Self {
            state_dir: workspace_dir.as_ref().join("state"),
        }
    }

    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.state_dir).await?;
        Ok(())
    }

    pub fn now_path(&self) -> PathBuf {
        self.state_dir.join("now.json")
    }

    pub async fn write_now(&self, state: &NowState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        fs::write(self.now_path(), json).await?;
        debug!("Wrote state/now.json");
        Ok(())
    }
}
