use analysis_core::{
    CatalogEntry, CompanyProfile, FigiMapping, FilingsProvider, FinancialStatement,
    IdentifierProvider, PriceProvider, ProviderError, Quote, TickerCatalog, TickerCatalogSource,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

const MOCK_COMPANY: &str = "Mock Company Inc.";

/// (ticker, CIK, FIGI, name)
const MOCK_COMPANIES: &[(&str, &str, &str, &str)] = &[
    ("AAPL", "0000320193", "BBG000B9XRY4", "Apple Inc."),
    ("MSFT", "0000789019", "BBG000BPH459", "Microsoft Corporation"),
    ("GOOGL", "0001652044", "BBG009S39JX6", "Alphabet Inc."),
    ("AMZN", "0001018724", "BBG000BVPV84", "Amazon.com Inc."),
    ("TSLA", "0001318605", "BBG000N9MNX3", "Tesla Inc."),
];

/// Canned data for every provider, so the service runs without API keys.
#[derive(Debug, Clone, Default)]
pub struct MockMarketData;

impl MockMarketData {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PriceProvider for MockMarketData {
    async fn get_quote(&self, ticker: &str) -> Result<Quote, ProviderError> {
        Ok(Quote {
            ticker: ticker.to_uppercase(),
            current_price: 175.43,
            high: 176.50,
            low: 173.20,
            open: 174.00,
            previous_close: 173.28,
            change: 2.15,
            change_percent: 1.24,
            volume: Some(52_000_000),
            market_cap: None,
            timestamp: Utc::now(),
        })
    }

    async fn get_profile(&self, _ticker: &str) -> Result<CompanyProfile, ProviderError> {
        Ok(CompanyProfile {
            name: MOCK_COMPANY.to_string(),
            market_cap_millions: 2_800_000.0,
            shares_outstanding_millions: 16_000.0,
            exchange: Some("NASDAQ".to_string()),
            currency: Some("USD".to_string()),
            country: Some("US".to_string()),
        })
    }
}

#[async_trait]
impl FilingsProvider for MockMarketData {
    async fn get_financial_statement(&self, _cik: &str) -> Result<FinancialStatement, ProviderError> {
        Ok(FinancialStatement {
            revenue: 394_328_000_000.0,
            net_income: 96_995_000_000.0,
            total_assets: 352_755_000_000.0,
            total_liabilities: 290_437_000_000.0,
            total_debt: 109_280_000_000.0,
            shareholders_equity: 62_318_000_000.0,
            operating_cash_flow: 110_543_000_000.0,
            capital_expenditure: 10_959_000_000.0,
            free_cash_flow: 99_584_000_000.0,
            period: "2024-FY".to_string(),
            fiscal_year: 2024,
            report_date: NaiveDate::from_ymd_opt(2024, 9, 30),
            filing_date: NaiveDate::from_ymd_opt(2024, 11, 1),
        })
    }
}

#[async_trait]
impl TickerCatalogSource for MockMarketData {
    fn source_name(&self) -> &str {
        "MockEDGAR"
    }

    async fn get_ticker_catalog(&self) -> Result<TickerCatalog, ProviderError> {
        Ok(MOCK_COMPANIES
            .iter()
            .map(|(ticker, cik, _, name)| {
                (
                    ticker.to_string(),
                    CatalogEntry {
                        cik: cik.to_string(),
                        title: name.to_string(),
                    },
                )
            })
            .collect())
    }
}

#[async_trait]
impl IdentifierProvider for MockMarketData {
    async fn map_ticker(&self, ticker: &str) -> Result<FigiMapping, ProviderError> {
        let upper = ticker.to_uppercase();
        let mapping = MOCK_COMPANIES
            .iter()
            .find(|(t, ..)| *t == upper)
            .map(|(_, _, figi, name)| FigiMapping {
                figi: figi.to_string(),
                name: name.to_string(),
            })
            .unwrap_or_else(|| FigiMapping {
                figi: String::new(),
                name: MOCK_COMPANY.to_string(),
            });
        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_covers_every_provider() {
        let mock = MockMarketData::new();

        let quote = mock.get_quote("aapl").await.unwrap();
        assert_eq!(quote.ticker, "AAPL");
        assert_eq!(quote.current_price, 175.43);

        let profile = mock.get_profile("AAPL").await.unwrap();
        assert_eq!(profile.shares_outstanding_millions, 16_000.0);

        let statement = mock.get_financial_statement("0000320193").await.unwrap();
        assert_eq!(statement.free_cash_flow, statement.operating_cash_flow - statement.capital_expenditure);

        let catalog = mock.get_ticker_catalog().await.unwrap();
        assert_eq!(catalog["TSLA"].cik, "0001318605");

        let mapping = mock.map_ticker("msft").await.unwrap();
        assert_eq!(mapping.figi, "BBG000BPH459");
        let unknown = mock.map_ticker("ZZZZ").await.unwrap();
        assert_eq!(unknown.name, MOCK_COMPANY);
    }
}
