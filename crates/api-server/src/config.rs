use analysis_core::AnalysisError;
use anyhow::{Context, Result};
use cik_resolver::ResolverConfig;
use market_data_client::ProviderConfig;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub providers: ProviderConfig,
    pub resolver: ResolverConfig,
    /// Serve canned data instead of calling providers
    pub use_mock_data: bool,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let use_mock_data = matches!(
            var("USE_MOCK_DATA", "false").trim().to_lowercase().as_str(),
            "true" | "1" | "yes"
        );

        let finnhub_api_key = lookup("FINNHUB_API_KEY").unwrap_or_default();
        if finnhub_api_key.trim().is_empty() && !use_mock_data {
            return Err(AnalysisError::Config(
                "FINNHUB_API_KEY is required unless USE_MOCK_DATA=true".to_string(),
            )
            .into());
        }

        let request_timeout_secs: u64 = var("REQUEST_TIMEOUT_SECS", "10")
            .parse()
            .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?;
        let catalog_ttl_hours: i64 = var("CIK_CATALOG_TTL_HOURS", "24")
            .parse()
            .context("CIK_CATALOG_TTL_HOURS must be a whole number of hours")?;
        let catalog_ttl = chrono::Duration::try_hours(catalog_ttl_hours)
            .filter(|ttl| *ttl > chrono::Duration::zero())
            .ok_or_else(|| {
                AnalysisError::Config(format!(
                    "CIK_CATALOG_TTL_HOURS must be a positive number of hours, got {}",
                    catalog_ttl_hours
                ))
            })?;
        let edgar_rate_limit: usize = var("EDGAR_RATE_LIMIT", "10")
            .parse()
            .context("EDGAR_RATE_LIMIT must be a positive integer")?;

        Ok(Self {
            providers: ProviderConfig {
                finnhub_api_key,
                edgar_user_agent: var("EDGAR_USER_AGENT", "fin-insight/1.0"),
                request_timeout: Duration::from_secs(request_timeout_secs),
                edgar_rate_limit,
            },
            resolver: ResolverConfig { catalog_ttl },
            use_mock_data,
            host: var("API_HOST", "0.0.0.0"),
            port: var("API_PORT", "3000").parse().context("API_PORT must be a valid port")?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_in_mock_mode() {
        let config = AppConfig::from_lookup(lookup(&[("USE_MOCK_DATA", "true")])).unwrap();

        assert!(config.use_mock_data);
        assert_eq!(config.providers.edgar_user_agent, "fin-insight/1.0");
        assert_eq!(config.providers.request_timeout, Duration::from_secs(10));
        assert_eq!(config.providers.edgar_rate_limit, 10);
        assert_eq!(config.resolver.catalog_ttl, chrono::Duration::hours(24));
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_api_key_required_without_mock() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("FINNHUB_API_KEY"));

        let config = AppConfig::from_lookup(lookup(&[
            ("FINNHUB_API_KEY", "abc123"),
            ("CIK_CATALOG_TTL_HOURS", "6"),
            ("API_PORT", "8080"),
        ]))
        .unwrap();
        assert!(!config.use_mock_data);
        assert_eq!(config.resolver.catalog_ttl, chrono::Duration::hours(6));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_catalog_ttl_must_be_positive_and_in_range() {
        for hours in ["0", "-6", "9999999999999999"] {
            let err = AppConfig::from_lookup(lookup(&[
                ("USE_MOCK_DATA", "true"),
                ("CIK_CATALOG_TTL_HOURS", hours),
            ]))
            .unwrap_err();
            assert!(
                err.to_string().contains("CIK_CATALOG_TTL_HOURS"),
                "unexpected error for {}: {}",
                hours,
                err
            );
        }
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let result = AppConfig::from_lookup(lookup(&[
            ("USE_MOCK_DATA", "true"),
            ("REQUEST_TIMEOUT_SECS", "soon"),
        ]));
        assert!(result.is_err());
    }
}
