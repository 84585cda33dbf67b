//! Allocator Runner - refresh loop and manual confirmations
//!
//! The runner owns the session weights. Every cycle reads the previous
//! weights, computes new ones and writes them back, so cycles and manual
//! confirmations never interleave.

use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::AllocatorConfig;
use crate::decision::{
    decision_hash, format_decision_message, format_drivers, infer_asset_sentiment,
    relevant_headlines, DecisionGate,
};
use crate::error::Result;
use crate::journal::{AuditSink, DecisionRecord};
use crate::news::{clean_text, HeadlineSource, StaticHeadlineSource};
use crate::portfolio::{weight_rows, PortfolioBuilder, PortfolioPair, WeightRow};
use crate::prices::PriceSource;
use crate::rebalance::try_rebalance_to_target;
use crate::regime::RegimeClassifier;
use crate::sentiment::SentimentAnalyzer;
use crate::state::{NowState, SessionState, StateManager};
use crate::types::{AnalyzedHeadline, Headline, PortfolioKind, Regime, RegimeDecision};
use crate::weights::WeightVector;

/// Drivers quoted per decision message
const MAX_DRIVERS: usize = 2;
/// Decision hash scope of the per-cycle regime entry
const REGIME_SCOPE: &str = "regime";

/// Outcome of one refresh cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub timestamp: String,
    pub regime: RegimeDecision,
    pub analyzed: Vec<AnalyzedHeadline>,
    /// Live sources returned nothing and the built-in headlines were used
    pub used_fallback: bool,
    pub portfolios: PortfolioPair,
    pub bull_rows: Vec<WeightRow>,
    pub bear_rows: Vec<WeightRow>,
    pub decisions_logged: usize,
    /// Decision or snapshot writes that failed after the weights were applied
    pub journal_failures: usize,
}

/// Outcome of a confirmed manual reallocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualOutcome {
    pub weights: WeightVector,
    /// False when the move was too small or a duplicate
    pub logged: bool,
}

/// Drives the allocator: headlines in, audited weights out
pub struct AllocatorRunner {
    config: AllocatorConfig,
    headlines: Arc<dyn HeadlineSource>,
    fallback: StaticHeadlineSource,
    prices: Arc<dyn PriceSource>,
    sink: Arc<dyn AuditSink>,
    state_manager: Option<StateManager>,
    analyzer: SentimentAnalyzer,
    classifier: RegimeClassifier,
    builder: PortfolioBuilder,
    gate: DecisionGate,
    session: SessionState,
    last_analyzed: Vec<AnalyzedHeadline>,
    last_regime: RegimeDecision,
    cycles: u64,
}

impl AllocatorRunner {
    pub fn new(
        config: AllocatorConfig,
        headlines: Arc<dyn HeadlineSource>,
        prices: Arc<dyn PriceSource>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        let builder = PortfolioBuilder::new(config.limits(), config.tilts.clone());
        Self {
            config,
            headlines,
            fallback: StaticHeadlineSource::fallback(),
            prices,
            sink,
            state_manager: None,
            analyzer: SentimentAnalyzer::new(),
            classifier: RegimeClassifier::default(),
            builder,
            gate: DecisionGate::new(),
            session: SessionState::default(),
            last_analyzed: Vec::new(),
            last_regime: RegimeDecision::default(),
            cycles: 0,
        }
    }

    /// Also write `state/now.json` after every cycle
    pub fn with_state_manager(mut self, state_manager: StateManager) -> Self {
        self.state_manager = Some(state_manager);
        self
    }

    /// Headlines used when the live source comes back empty
    pub fn with_fallback(mut self, fallback: StaticHeadlineSource) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn last_regime(&self) -> &RegimeDecision {
        &self.last_regime
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles
    }

    /// Sentiment label for one ticker from the last cycle's headlines
    pub fn asset_sentiment(&self, ticker: &str) -> String {
        infer_asset_sentiment(&self.last_analyzed, ticker, self.last_regime.regime)
    }

    pub async fn recent_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>> {
        self.sink.recent_decisions(limit).await
    }

    /// Run until Ctrl-C
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Refresh on every tick until `shutdown` resolves. A failed cycle is
    /// logged and the previous weights are kept.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Allocator starting: refresh every {}s, {} feeds",
            self.config.refresh_secs,
            self.config.feeds.len()
        );

        let mut refresh = interval(self.config.refresh_interval());
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = refresh.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!("Refresh cycle error: {}", e);
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutting down after {} cycles", self.cycles);
                    return Ok(());
                }
            }
        }
    }

    /// One full refresh: headlines, regime, both portfolios, audit trail.
    ///
    /// News and sentiment are journaled before anything is computed, so a
    /// failure there fails the cycle. Once the new weights are applied, a
    /// failed decision or snapshot write is logged and counted instead.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let now = Utc::now().to_rfc3339();

        let (headlines, used_fallback) = self.fetch_headlines().await;
        let analyzed = self.analyze(headlines);

        for item in &analyzed {
            let news_id = self.sink.record_news(&now, &item.headline).await?;
            self.sink
                .record_sentiment(news_id, &now, &item.analysis)
                .await?;
        }

        let analyses: Vec<_> = analyzed.iter().map(|a| a.analysis.clone()).collect();
        let regime = self.classifier.classify(&analyses);
        info!(
            "Regime: {} ({}) from {} headlines",
            regime.regime,
            regime.reason,
            analyzed.len()
        );

        let portfolios = self.builder.build_portfolios(
            &self.config.bullish_universe,
            &self.config.bearish_universe,
            regime.regime,
            &self.session.bull_weights,
            &self.session.bear_weights,
        );

        let previous = self.session.clone();
        self.session.bull_weights = portfolios.bull.clone();
        self.session.bear_weights = portfolios.bear.clone();
        self.last_analyzed = analyzed.clone();
        self.last_regime = regime.clone();
        self.cycles += 1;

        let drivers = relevant_headlines(&analyzed, self.config.high_impact_threshold, MAX_DRIVERS);
        let mut decisions_logged = 0;
        let mut journal_failures = 0;

        let empty = WeightVector::new();
        let regime_hash = decision_hash(REGIME_SCOPE, regime.regime, &empty, &now);
        if self
            .gate
            .should_log(&empty, &empty, &regime_hash, 0.0, !drivers.is_empty())
        {
            let message = if drivers.is_empty() {
                regime.reason.clone()
            } else {
                format!("{} — Drivers: {}", regime.reason, format_drivers(&drivers))
            };
            match self.write_decision(&regime_hash, &now, regime.regime, &message).await {
                Ok(()) => decisions_logged += 1,
                Err(e) => {
                    warn!("Failed to log regime decision: {}", e);
                    journal_failures += 1;
                }
            }
        }

        for kind in [PortfolioKind::Bullish, PortfolioKind::Bearish] {
            let old = previous.weights(kind);
            let new = portfolios.get(kind);
            let hash = decision_hash(kind.display_name(), regime.regime, new, &now);

            if !old.is_empty()
                && self
                    .gate
                    .should_log(old, new, &hash, self.config.decision_min_turnover, false)
            {
                let message =
                    format_decision_message("Automated rebalance", kind.display_name(), old, new, &drivers);
                match self.write_decision(&hash, &now, regime.regime, &message).await {
                    Ok(()) => decisions_logged += 1,
                    Err(e) => {
                        warn!("Failed to log {} rebalance: {}", kind, e);
                        journal_failures += 1;
                    }
                }
            }

            if let Err(e) = self
                .sink
                .record_snapshot(&now, regime.regime, kind.display_name(), new)
                .await
            {
                warn!("Failed to record {} snapshot: {}", kind, e);
                journal_failures += 1;
            }
        }

        let prices = self.prices.latest_prices(&self.all_tickers()).await;
        let bull_rows = weight_rows(&portfolios.bull, &prices);
        let bear_rows = weight_rows(&portfolios.bear, &prices);

        self.write_now(&now, analyzed.len()).await;

        debug!(
            "Cycle {} done: {} decisions logged, {} journal failures, {} prices",
            self.cycles,
            decisions_logged,
            journal_failures,
            prices.len()
        );

        Ok(CycleReport {
            timestamp: now,
            regime,
            analyzed,
            used_fallback,
            portfolios,
            bull_rows,
            bear_rows,
            decisions_logged,
            journal_failures,
        })
    }

    /// Apply a user-confirmed weight for one asset. Bypasses the turnover
    /// limit; an unknown ticker is an error and leaves the session untouched.
    ///
    /// The decision entry is written before the weights are applied. If that
    /// write fails nothing changes and a retry is logged again.
    pub async fn confirm_manual(
        &mut self,
        kind: PortfolioKind,
        ticker: &str,
        target_weight: f64,
    ) -> Result<ManualOutcome> {
        let now = Utc::now().to_rfc3339();
        let regime = self.last_regime.regime;
        let old = self.session.weights(kind).clone();

        let updated = try_rebalance_to_target(
            kind,
            &old,
            ticker,
            target_weight,
            self.config.max_weight_per_stock,
        )?;

        let drivers = relevant_headlines(
            &self.last_analyzed,
            self.config.high_impact_threshold,
            MAX_DRIVERS,
        );
        let hash = decision_hash(kind.display_name(), regime, &updated, &now);
        let logged = self.gate.should_log(
            &old,
            &updated,
            &hash,
            self.config.decision_min_turnover,
            !drivers.is_empty(),
        );
        let message = format_decision_message(
            "Manual reallocation",
            kind.display_name(),
            &old,
            &updated,
            &drivers,
        );

        if logged {
            self.write_decision(&hash, &now, regime, &message).await?;
            info!("Manual reallocation of {} in {} portfolio logged", ticker, kind);
        } else {
            info!("Manual reallocation of {} applied, change too small to log", ticker);
        }

        self.session.set_weights(kind, updated.clone());

        let snapshot_name = format!("{}_MANUAL", kind.display_name());
        if let Err(e) = self
            .sink
            .record_snapshot(&now, regime, &snapshot_name, &updated)
            .await
        {
            warn!("Failed to record {} snapshot: {}", snapshot_name, e);
        }

        self.write_now(&now, self.last_analyzed.len()).await;

        Ok(ManualOutcome {
            weights: updated,
            logged,
        })
    }

    /// Write a decision the gate let through. Only written entries are
    /// remembered, so a failed write is retried on the next evaluation.
    async fn write_decision(
        &mut self,
        hash: &str,
        now: &str,
        regime: Regime,
        message: &str,
    ) -> Result<()> {
        self.sink.log_decision(now, regime, message).await?;
        self.gate.remember(hash);
        Ok(())
    }

    async fn fetch_headlines(&self) -> (Vec<Headline>, bool) {
        let limit = self.config.headline_limit;
        match self.headlines.fetch(limit).await {
            Ok(headlines) if !headlines.is_empty() => return (headlines, false),
            Ok(_) => warn!("{} source returned no headlines, using fallback", self.headlines.name()),
            Err(e) => warn!("{} source failed: {}, using fallback", self.headlines.name(), e),
        }

        match self.fallback.fetch(limit).await {
            Ok(headlines) => (headlines, true),
            Err(e) => {
                warn!("Fallback headlines unavailable: {}", e);
                (Vec::new(), true)
            }
        }
    }

    fn analyze(&self, headlines: Vec<Headline>) -> Vec<AnalyzedHeadline> {
        headlines
            .into_iter()
            .filter_map(|h| {
                let title = clean_text(&h.title);
                if title.is_empty() {
                    return None;
                }
                let analysis = self.analyzer.analyze(&title);
                Some(AnalyzedHeadline {
                    headline: Headline {
                        title,
                        source: clean_text(&h.source),
                        published: clean_text(&h.published),
                    },
                    analysis,
                })
            })
            .collect()
    }

    fn all_tickers(&self) -> Vec<String> {
        let mut tickers: Vec<String> = self
            .config
            .bullish_universe
            .iter()
            .chain(&self.config.bearish_universe)
            .cloned()
            .collect();
        tickers.sort();
        tickers.dedup();
        tickers
    }

    /// now.json is observability only; a write failure does not fail the cycle
    async fn write_now(&self, now: &str, headlines_analyzed: usize) {
        let Some(manager) = &self.state_manager else {
            return;
        };
        let state = NowState {
            timestamp: now.to_string(),
            regime: self.last_regime.regime,
            reason: self.last_regime.reason.clone(),
            headlines_analyzed,
            cycles_completed: self.cycles,
            bull_weights: self.session.bull_weights.clone(),
            bear_weights: self.session.bear_weights.clone(),
        };
        if let Err(e) = manager.write_now(&state).await {
            warn!("Failed to write now.json: {}", e);
        }
    }
}
