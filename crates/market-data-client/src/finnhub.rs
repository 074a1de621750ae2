use analysis_core::{CompanyProfile, PriceProvider, ProviderError, Quote};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::{build_http_client, read_json, ProviderConfig};

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER: &str = "Finnhub";

#[derive(Clone)]
pub struct FinnhubClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl FinnhubClient {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            api_key: config.finnhub_api_key.clone(),
            client: build_http_client(config),
            base_url: BASE_URL.to_string(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        ticker: &str,
        what: &str,
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", ticker), ("token", self.api_key.as_str())])
            .send()
            .await;
        read_json(PROVIDER, what, response).await
    }
}

#[async_trait]
impl PriceProvider for FinnhubClient {
    async fn get_quote(&self, ticker: &str) -> Result<Quote, ProviderError> {
        let raw: QuoteResponse = self.get("/quote", ticker, "quote").await?;
        quote_from_response(ticker, raw)
    }

    async fn get_profile(&self, ticker: &str) -> Result<CompanyProfile, ProviderError> {
        let raw: ProfileResponse = self.get("/stock/profile2", ticker, "profile").await?;
        Ok(profile_from_response(raw))
    }
}

/// Finnhub answers unknown symbols with an all-zero quote instead of an error.
fn quote_from_response(ticker: &str, raw: QuoteResponse) -> Result<Quote, ProviderError> {
    if raw.c == 0.0 {
        return Err(ProviderError::new(
            PROVIDER,
            format!("invalid ticker or no data available for {}", ticker),
        )
        .with_code("NO_DATA"));
    }

    Ok(Quote {
        ticker: ticker.to_string(),
        current_price: raw.c,
        high: raw.h,
        low: raw.l,
        open: raw.o,
        previous_close: raw.pc,
        change: raw.d.unwrap_or(0.0),
        change_percent: raw.dp.unwrap_or(0.0),
        volume: None,
        market_cap: None,
        timestamp: DateTime::from_timestamp(raw.t, 0).unwrap_or_else(Utc::now),
    })
}

fn profile_from_response(raw: ProfileResponse) -> CompanyProfile {
    let non_empty = |s: Option<String>| s.filter(|v| !v.is_empty());
    CompanyProfile {
        name: raw.name.unwrap_or_default(),
        market_cap_millions: raw.market_capitalization.unwrap_or(0.0),
        shares_outstanding_millions: raw.share_outstanding.unwrap_or(0.0),
        exchange: non_empty(raw.exchange),
        currency: non_empty(raw.currency),
        country: non_empty(raw.country),
    }
}

// Finnhub API types
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    c: f64,
    // null for symbols with no trading history
    d: Option<f64>,
    dp: Option<f64>,
    #[serde(default)]
    h: f64,
    #[serde(default)]
    l: f64,
    #[serde(default)]
    o: f64,
    #[serde(default)]
    pc: f64,
    #[serde(default)]
    t: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    name: Option<String>,
    market_capitalization: Option<f64>,
    share_outstanding: Option<f64>,
    exchange: Option<String>,
    currency: Option<String>,
    country: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_price_is_no_data() {
        let raw: QuoteResponse = serde_json::from_str(
            r#"{"c":0,"d":null,"dp":null,"h":0,"l":0,"o":0,"pc":0,"t":0}"#,
        )
        .unwrap();
        let err = quote_from_response("ZZZZ", raw).unwrap_err();
        assert_eq!(err.code.as_deref(), Some("NO_DATA"));
        assert_eq!(err.provider, "Finnhub");
    }

    #[test]
    fn test_quote_parsing() {
        let raw: QuoteResponse = serde_json::from_str(
            r#"{"c":175.43,"d":2.15,"dp":1.24,"h":176.5,"l":173.2,"o":174.0,"pc":173.28,"t":1700000000}"#,
        )
        .unwrap();
        let quote = quote_from_response("AAPL", raw).unwrap();
        assert_eq!(quote.current_price, 175.43);
        assert_eq!(quote.previous_close, 173.28);
        assert_eq!(quote.timestamp.timestamp(), 1_700_000_000);
        assert!(quote.market_cap.is_none());
    }

    #[test]
    fn test_profile_parsing() {
        let raw: ProfileResponse = serde_json::from_str(
            r#"{"name":"Apple Inc","marketCapitalization":2800000,"shareOutstanding":16000,"exchange":"NASDAQ","currency":"USD","country":""}"#,
        )
        .unwrap();
        let profile = profile_from_response(raw);
        assert_eq!(profile.name, "Apple Inc");
        assert_eq!(profile.market_cap_millions, 2_800_000.0);
        assert_eq!(profile.shares_outstanding_millions, 16_000.0);
        assert_eq!(profile.exchange.as_deref(), Some("NASDAQ"));
        assert!(profile.country.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires FINNHUB_API_KEY and network
    async fn test_live_quote() {
        let config = ProviderConfig {
            finnhub_api_key: std::env::var("FINNHUB_API_KEY").unwrap_or_default(),
            ..ProviderConfig::default()
        };
        let client = FinnhubClient::new(&config);
        let quote = client.get_quote("AAPL").await.unwrap();
        assert!(quote.current_price > 0.0);
    }
}
