//! Price sources - approximate prices for display only
//!
//! The allocator never reads prices; failures degrade to missing entries.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{AllocatorError, Result};

/// Trait for display price sources
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    /// Latest known price per ticker; tickers without a price are omitted
    async fn latest_prices(&self, tickers: &[String]) -> HashMap<String, Decimal>;

    /// Source name
    fn name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[allow(dead_code)]
    symbol: String,
    price: String,
}

/// Reads `GET {base_url}/prices/{symbol}` from a price service
pub struct HttpPriceSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPriceSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Fetch current price for a symbol
    pub async fn fetch_price(&self, symbol: &str) -> Result<Decimal> {
        fetch_price(&self.client, &self.base_url, symbol).await
    }
}

async fn fetch_price(client: &reqwest::Client, base_url: &str, symbol: &str) -> Result<Decimal> {
    let url = format!("{}/prices/{}", base_url, symbol);
    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        return Err(AllocatorError::Feed {
            url,
            message: format!("price fetch returned {}", response.status()),
        });
    }

    let data: PriceResponse = response.json().await?;
    data.price.parse().map_err(|e| AllocatorError::Feed {
        url,
        message: format!("invalid price {:?}: {}", data.price, e),
    })
}

#[async_trait::async_trait]
impl PriceSource for HttpPriceSource {
    /// Requests every ticker concurrently
    async fn latest_prices(&self, tickers: &[String]) -> HashMap<String, Decimal> {
        let mut requests = JoinSet::new();
        for ticker in tickers {
            let client = self.client.clone();
            let base_url = self.base_url.clone();
            let ticker = ticker.clone();
            requests.spawn(async move {
                let price = fetch_price(&client, &base_url, &ticker).await;
                (ticker, price)
            });
        }

        let mut prices = HashMap::new();
        while let Some(joined) = requests.join_next().await {
            match joined {
                Ok((ticker, Ok(price))) => {
                    prices.insert(ticker, price);
                }
                Ok((ticker, Err(e))) => warn!("No price for {}: {}", ticker, e),
                Err(e) => warn!("Price task failed: {}", e),
            }
        }
        debug!("Priced {}/{} tickers", prices.len(), tickers.len());
        prices
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Fixed prices, or none at all
#[derive(Debug, Clone, Default)]
pub struct StaticPriceSource {
    prices: HashMap<String, Decimal>,
}

impl StaticPriceSource {
    pub fn new(prices: HashMap<String, Decimal>) -> Self {
        Self { prices }
    }
}

#[async_trait::async_trait]
impl PriceSource for StaticPriceSource {
    async fn latest_prices(&self, tickers: &[String]) -> HashMap<String, Decimal> {
        tickers
            .iter()
            .filter_map(|t| self.prices.get(t).map(|p| (t.clone(), *p)))
            .collect()
    }

    fn name(&self) -> &str {
        "static"
    }
}
