use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Providers report market cap and share counts in millions.
pub const MILLION: f64 = 1_000_000.0;

/// A value that is either present or carries the reason it is missing.
///
/// Engines must match on this instead of treating zero as "no data".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum DataField<T> {
    Present(T),
    Unavailable(String),
}

impl<T> DataField<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        DataField::Unavailable(reason.into())
    }

    pub fn is_present(&self) -> bool {
        matches!(self, DataField::Present(_))
    }

    pub fn as_present(&self) -> Option<&T> {
        match self {
            DataField::Present(value) => Some(value),
            DataField::Unavailable(_) => None,
        }
    }

    pub fn as_present_mut(&mut self) -> Option<&mut T> {
        match self {
            DataField::Present(value) => Some(value),
            DataField::Unavailable(_) => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            DataField::Present(_) => None,
            DataField::Unavailable(reason) => Some(reason),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            DataField::Present(value) => Some(value),
            DataField::Unavailable(_) => None,
        }
    }
}

/// Real-time price data for a ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    pub current_price: f64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub previous_close: f64,
    pub change: f64,
    pub change_percent: f64,
    #[serde(default)]
    pub volume: Option<u64>,
    /// Absolute market cap, filled in from the profile provider.
    #[serde(default)]
    pub market_cap: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Company profile as reported by the price provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub market_cap_millions: f64,
    pub shares_outstanding_millions: f64,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Latest annual/quarterly figures pulled from regulatory filings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatement {
    pub revenue: f64,
    pub net_income: f64,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub total_debt: f64,
    pub shareholders_equity: f64,
    pub operating_cash_flow: f64,
    pub capital_expenditure: f64,
    pub free_cash_flow: f64,
    /// e.g. "2024-FY", "2024-Q3"
    pub period: String,
    pub fiscal_year: i32,
    #[serde(default)]
    pub report_date: Option<NaiveDate>,
    #[serde(default)]
    pub filing_date: Option<NaiveDate>,
}

/// Free cash flow is only derived when both operating cash flow and capex are
/// positive; otherwise it is reported as zero.
pub fn derive_free_cash_flow(operating_cash_flow: f64, capital_expenditure: f64) -> f64 {
    if operating_cash_flow > 0.0 && capital_expenditure > 0.0 {
        operating_cash_flow - capital_expenditure
    } else {
        0.0
    }
}

/// Multi-year reference metrics used for trend comparison
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalMetrics {
    #[serde(default)]
    pub pe_ratios: Vec<f64>,
    #[serde(default)]
    pub pe_ratio_avg_5y: Option<f64>,
    #[serde(default)]
    pub roe_history: Vec<f64>,
    #[serde(default)]
    pub fcf_yield_history: Vec<f64>,
}

/// Result of mapping a ticker through the identifier provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigiMapping {
    pub figi: String,
    pub name: String,
}

/// One row of the bulk ticker catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// 10-digit, zero-padded
    pub cik: String,
    pub title: String,
}

/// Uppercase ticker -> catalog entry
pub type TickerCatalog = HashMap<String, CatalogEntry>;

/// Formats a numeric CIK as the canonical 10-digit zero-padded string.
pub fn pad_cik(cik: u64) -> String {
    format!("{:010}", cik)
}

/// Aggregated company data from all providers.
///
/// Every field that may be missing is a [`DataField`] whose unavailable
/// reason names the failed source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyData {
    pub ticker: String,
    pub company_name: String,
    pub cik: DataField<String>,
    pub figi: DataField<String>,
    pub quote: DataField<Quote>,
    pub financials: DataField<FinancialStatement>,
    pub historical: DataField<HistoricalMetrics>,
    /// In millions of shares.
    pub shares_outstanding: DataField<f64>,
}

impl CompanyData {
    /// Empty record for `ticker`: every optional field unavailable, name
    /// falling back to the ticker itself.
    pub fn new(ticker: &str) -> Self {
        let ticker = ticker.trim().to_uppercase();
        Self {
            company_name: ticker.clone(),
            ticker,
            cik: DataField::unavailable("not requested"),
            figi: DataField::unavailable("not requested"),
            quote: DataField::unavailable("not requested"),
            financials: DataField::unavailable("not requested"),
            historical: DataField::unavailable("not requested"),
            shares_outstanding: DataField::unavailable("not requested"),
        }
    }

    pub fn current_price(&self) -> Option<f64> {
        self.quote
            .as_present()
            .map(|q| q.current_price)
            .filter(|p| *p > 0.0)
    }

    pub fn market_cap(&self) -> Option<f64> {
        self.quote
            .as_present()
            .and_then(|q| q.market_cap)
            .filter(|m| *m > 0.0)
    }

    pub fn shares_outstanding(&self) -> Option<f64> {
        self.shares_outstanding.as_present().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_cash_flow_requires_both_positive() {
        assert_eq!(derive_free_cash_flow(110.0, 11.0), 99.0);
        assert_eq!(derive_free_cash_flow(110.0, 0.0), 0.0);
        assert_eq!(derive_free_cash_flow(-5.0, 11.0), 0.0);
    }

    #[test]
    fn test_pad_cik() {
        assert_eq!(pad_cik(320193), "0000320193");
        assert_eq!(pad_cik(1652044), "0001652044");
    }

    #[test]
    fn test_new_company_data_is_all_unavailable() {
        let data = CompanyData::new(" aapl ");
        assert_eq!(data.ticker, "AAPL");
        assert_eq!(data.company_name, "AAPL");
        assert!(!data.quote.is_present());
        assert!(!data.financials.is_present());
        assert!(data.current_price().is_none());
        assert!(data.market_cap().is_none());
        assert!(data.shares_outstanding().is_none());
    }

    #[test]
    fn test_data_field_serializes_tagged() {
        let present: DataField<f64> = DataField::Present(16000.0);
        let json = serde_json::to_value(&present).unwrap();
        assert_eq!(json["status"], "present");
        assert_eq!(json["value"], 16000.0);

        let missing: DataField<f64> = DataField::unavailable("Finnhub: timeout");
        let json = serde_json::to_value(&missing).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["value"], "Finnhub: timeout");
        assert_eq!(missing.unavailable_reason(), Some("Finnhub: timeout"));
    }
}
