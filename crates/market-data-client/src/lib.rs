//! HTTP clients for the external market data providers.
//!
//! - [`FinnhubClient`]: quotes and company profiles
//! - [`EdgarClient`]: XBRL company facts and the SEC ticker catalog
//! - [`OpenFigiClient`]: ticker to FIGI mapping
//! - [`MockMarketData`]: canned data for every provider, used in mock mode

pub mod edgar;
pub mod finnhub;
pub mod mock;
pub mod openfigi;

pub use edgar::EdgarClient;
pub use finnhub::FinnhubClient;
pub use mock::MockMarketData;
pub use openfigi::OpenFigiClient;

use analysis_core::ProviderError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Settings shared by the provider clients.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub finnhub_api_key: String,
    /// SEC rejects requests without a descriptive User-Agent.
    pub edgar_user_agent: String,
    pub request_timeout: Duration,
    /// Max EDGAR requests per second.
    pub edgar_rate_limit: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            finnhub_api_key: String::new(),
            edgar_user_agent: "fin-insight/1.0".to_string(),
            request_timeout: Duration::from_secs(10),
            edgar_rate_limit: 10,
        }
    }
}

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
pub(crate) struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub(crate) fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    pub(crate) async fn acquire(&self, provider: &str) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            let oldest = match ts.front() {
                Some(&oldest) if ts.len() >= self.max_requests => oldest,
                _ => {
                    ts.push_back(now);
                    return;
                }
            };

            // Wait until the oldest request falls out of the window
            let sleep_dur = (oldest + self.window).duration_since(now) + Duration::from_millis(10);
            drop(ts);
            tracing::debug!(
                "Rate limiter: waiting {:.2}s for {} slot",
                sleep_dur.as_secs_f64(),
                provider
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

pub(crate) fn build_http_client(config: &ProviderConfig) -> Client {
    Client::builder()
        .timeout(config.request_timeout)
        .user_agent(config.edgar_user_agent.clone())
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Checks the status and decodes the JSON body, tagging every failure with
/// the provider name. Non-2xx responses carry the status code as error code.
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: &str,
    what: &str,
    response: Result<reqwest::Response, reqwest::Error>,
) -> Result<T, ProviderError> {
    let response = response.map_err(|e| {
        ProviderError::new(provider, format!("failed to fetch {}: {}", what, e))
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::new(
            provider,
            format!("API error (status {}): {}", status.as_u16(), body),
        )
        .with_code(status.as_u16().to_string()));
    }

    response.json::<T>().await.map_err(|e| {
        ProviderError::new(provider, format!("failed to parse {} response: {}", what, e))
    })
}
