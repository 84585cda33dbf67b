//! Audit journal - append-only record of news, sentiment, snapshots and decisions

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Headline, HeadlineAnalysis, ImpactLabel, NewsCategory, Regime, SentimentLabel};
use crate::weights::WeightVector;

const NEWS_FILE: &str = "news.jsonl";
const SENTIMENT_FILE: &str = "sentiment.jsonl";
const SNAPSHOT_FILE: &str = "portfolio_snapshots.jsonl";
const DECISION_FILE: &str = "decision_log.jsonl";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
    pub id: Uuid,
    pub fetched_at: String,
    pub title: String,
    pub source: String,
    pub published: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub news_id: Uuid,
    pub analyzed_at: String,
    pub label: SentimentLabel,
    pub compound: f64,
    pub impact_label: ImpactLabel,
    pub impact_score: f64,
    pub category: NewsCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: Uuid,
    pub created_at: String,
    pub regime: Regime,
    pub portfolio_name: String,
    pub weights: WeightVector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: Uuid,
    pub created_at: String,
    pub regime: Regime,
    pub message: String,
}

/// Write-side of the audit trail. The allocator never reads it back;
/// `recent_decisions` exists for display.
#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    /// Store a headline, returning the id its analysis should reference
    async fn record_news(&self, fetched_at: &str, headline: &Headline) -> Result<Uuid>;

    async fn record_sentiment(
        &self,
        news_id: Uuid,
        analyzed_at: &str,
        analysis: &HeadlineAnalysis,
    ) -> Result<()>;

    async fn record_snapshot(
        &self,
        created_at: &str,
        regime: Regime,
        portfolio_name: &str,
        weights: &WeightVector,
    ) -> Result<()>;

    async fn log_decision(&self, created_at: &str, regime: Regime, message: &str) -> Result<()>;

    /// Newest first
    async fn recent_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>>;
}

fn sentiment_record(news_id: Uuid, analyzed_at: &str, a: &HeadlineAnalysis) -> SentimentRecord {
    SentimentRecord {
        news_id,
        analyzed_at: analyzed_at.to_string(),
        label: a.label,
        compound: a.compound,
        impact_label: a.impact_label,
        impact_score: a.impact_score,
        category: a.category,
    }
}

/// JSON-lines files under one directory
pub struct JournalSink {
    dir: PathBuf,
}

impl JournalSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn append<T: Serialize>(&self, file: &str, record: &T) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let path = self.dir.join(file);
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        f.write_all(line.as_bytes()).await?;
        f.flush().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl AuditSink for JournalSink {
    async fn record_news(&self, fetched_at: &str, headline: &Headline) -> Result<Uuid> {
        let record = NewsRecord {
            id: Uuid::new_v4(),
            fetched_at: fetched_at.to_string(),
            title: headline.title.clone(),
            source: headline.source.clone(),
            published: headline.published.clone(),
        };
        self.append(NEWS_FILE, &record).await?;
        Ok(record.id)
    }

    async fn record_sentiment(
        &self,
        news_id: Uuid,
        analyzed_at: &str,
        analysis: &HeadlineAnalysis,
    ) -> Result<()> {
        self.append(SENTIMENT_FILE, &sentiment_record(news_id, analyzed_at, analysis))
            .await
    }

    async fn record_snapshot(
        &self,
        created_at: &str,
        regime: Regime,
        portfolio_name: &str,
        weights: &WeightVector,
    ) -> Result<()> {
        let record = SnapshotRecord {
            id: Uuid::new_v4(),
            created_at: created_at.to_string(),
            regime,
            portfolio_name: portfolio_name.to_string(),
            weights: weights.clone(),
        };
        self.append(SNAPSHOT_FILE, &record).await?;
        debug!("Saved {} snapshot", portfolio_name);
        Ok(())
    }

    async fn log_decision(&self, created_at: &str, regime: Regime, message: &str) -> Result<()> {
        let record = DecisionRecord {
            id: Uuid::new_v4(),
            created_at: created_at.to_string(),
            regime,
            message: message.to_string(),
        };
        self.append(DECISION_FILE, &record).await
    }

    async fn recent_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>> {
        let path = self.dir.join(DECISION_FILE);
        let content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut records = content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(serde_json::from_str::<DecisionRecord>)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        records.reverse();
        records.truncate(limit);
        Ok(records)
    }
}

#[derive(Debug, Default)]
struct MemoryJournal {
    news: Vec<NewsRecord>,
    sentiment: Vec<SentimentRecord>,
    snapshots: Vec<SnapshotRecord>,
    decisions: Vec<DecisionRecord>,
}

/// In-memory sink that captures everything written to it
#[derive(Debug, Default)]
pub struct MemorySink {
    inner: Mutex<MemoryJournal>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn news(&self) -> Vec<NewsRecord> {
        self.lock().news.clone()
    }

    pub fn sentiment(&self) -> Vec<SentimentRecord> {
        self.lock().sentiment.clone()
    }

    pub fn snapshots(&self) -> Vec<SnapshotRecord> {
        self.lock().snapshots.clone()
    }

    pub fn decisions(&self) -> Vec<DecisionRecord> {
        self.lock().decisions.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryJournal> {
        // A poisoned journal still holds valid records
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl AuditSink for MemorySink {
    async fn record_news(&self, fetched_at: &str, headline: &Headline) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.lock().news.push(NewsRecord {
            id,
            fetched_at: fetched_at.to_string(),
            title: headline.title.clone(),
            source: headline.source.clone(),
            published: headline.published.clone(),
        });
        Ok(id)
    }

    async fn record_sentiment(
        &self,
        news_id: Uuid,
        analyzed_at: &str,
        analysis: &HeadlineAnalysis,
    ) -> Result<()> {
        self.lock()
            .sentiment
            .push(sentiment_record(news_id, analyzed_at, analysis));
        Ok(())
    }

    async fn record_snapshot(
        &self,
        created_at: &str,
        regime: Regime,
        portfolio_name: &str,
        weights: &WeightVector,
    ) -> Result<()> {
        self.lock().snapshots.push(SnapshotRecord {
            id: Uuid::new_v4(),
            created_at: created_at.to_string(),
            regime,
            portfolio_name: portfolio_name.to_string(),
            weights: weights.clone(),
        });
        Ok(())
    }

    async fn log_decision(&self, created_at: &str, regime: Regime, message: &str) -> Result<()> {
        self.lock().decisions.push(DecisionRecord {
            id: Uuid::new_v4(),
            created_at: created_at.to_string(),
            regime,
            message: message.to_string(),
        });
        Ok(())
    }

    async fn recent_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>> {
        Ok(self
            .lock()
            .decisions
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}
