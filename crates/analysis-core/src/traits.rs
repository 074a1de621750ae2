use async_trait::async_trait;
use crate::{CompanyProfile, FigiMapping, FinancialStatement, ProviderError, Quote, TickerCatalog};

/// Price and company-profile provider (Finnhub in production)
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn get_quote(&self, ticker: &str) -> Result<Quote, ProviderError>;

    async fn get_profile(&self, ticker: &str) -> Result<CompanyProfile, ProviderError>;
}

/// Regulatory filings provider (SEC EDGAR in production)
#[async_trait]
pub trait FilingsProvider: Send + Sync {
    /// `cik` is the 10-digit zero-padded identifier.
    async fn get_financial_statement(&self, cik: &str) -> Result<FinancialStatement, ProviderError>;
}

/// Bulk ticker -> CIK catalog source, consumed by the CIK resolver
#[async_trait]
pub trait TickerCatalogSource: Send + Sync {
    /// Human-readable provider tag used in errors and logs.
    fn source_name(&self) -> &str;

    async fn get_ticker_catalog(&self) -> Result<TickerCatalog, ProviderError>;
}

/// Identifier-mapping provider (OpenFIGI in production)
#[async_trait]
pub trait IdentifierProvider: Send + Sync {
    async fn map_ticker(&self, ticker: &str) -> Result<FigiMapping, ProviderError>;
}
