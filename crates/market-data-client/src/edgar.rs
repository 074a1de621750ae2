use analysis_core::{
    derive_free_cash_flow, pad_cik, CatalogEntry, FilingsProvider, FinancialStatement,
    ProviderError, TickerCatalog, TickerCatalogSource,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::{build_http_client, read_json, ProviderConfig, RateLimiter};

const FACTS_BASE_URL: &str = "https://data.sec.gov";
const TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";
const PROVIDER: &str = "EDGAR";

/// SEC EDGAR client: XBRL company facts and the bulk ticker catalog.
#[derive(Clone)]
pub struct EdgarClient {
    client: Client,
    rate_limiter: RateLimiter,
}

impl EdgarClient {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: build_http_client(config),
            rate_limiter: RateLimiter::new(config.edgar_rate_limit, Duration::from_secs(1)),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, ProviderError> {
        self.rate_limiter.acquire(PROVIDER).await;
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await;
        read_json(PROVIDER, what, response).await
    }
}

#[async_trait]
impl FilingsProvider for EdgarClient {
    async fn get_financial_statement(&self, cik: &str) -> Result<FinancialStatement, ProviderError> {
        let url = format!("{}/api/xbrl/companyfacts/CIK{}.json", FACTS_BASE_URL, cik);
        let facts: CompanyFacts = self.get(&url, "company facts").await?;
        parse_financial_statement(&facts).ok_or_else(|| {
            ProviderError::new(PROVIDER, format!("no us-gaap facts reported for CIK {}", cik))
                .with_code("NO_DATA")
        })
    }
}

#[async_trait]
impl TickerCatalogSource for EdgarClient {
    fn source_name(&self) -> &str {
        PROVIDER
    }

    async fn get_ticker_catalog(&self) -> Result<TickerCatalog, ProviderError> {
        let raw: HashMap<String, CompanyTicker> = self.get(TICKERS_URL, "ticker catalog").await?;
        Ok(catalog_from_response(raw))
    }
}

/// The SEC file is an object keyed by row index: `{"0": {...}, "1": {...}}`.
fn catalog_from_response(raw: HashMap<String, CompanyTicker>) -> TickerCatalog {
    raw.into_values()
        .map(|row| {
            (
                row.ticker.trim().to_uppercase(),
                CatalogEntry {
                    cik: pad_cik(row.cik_str),
                    title: row.title,
                },
            )
        })
        .collect()
}

/// Picks the latest 10-K/10-Q USD value for each concept used by the
/// analysis engines. Returns `None` when the filer reports no us-gaap facts.
fn parse_financial_statement(facts: &CompanyFacts) -> Option<FinancialStatement> {
    let us_gaap = facts.facts.get("us-gaap")?;
    let mut latest: Option<&FactValue> = None;
    let mut value_of = |concept: &str| -> f64 {
        match latest_value(us_gaap, concept) {
            Some(v) => {
                if latest.map_or(true, |l| v.end > l.end) {
                    latest = Some(v);
                }
                v.as_f64()
            }
            None => 0.0,
        }
    };

    let mut revenue = value_of("Revenues");
    if revenue == 0.0 {
        revenue = value_of("RevenueFromContractWithCustomerExcludingAssessedTax");
    }
    let net_income = value_of("NetIncomeLoss");
    let total_assets = value_of("Assets");
    let total_liabilities = value_of("Liabilities");
    let shareholders_equity = value_of("StockholdersEquity");

    let mut total_debt = value_of("LongTermDebt") + value_of("ShortTermBorrowings");
    if total_debt == 0.0 {
        total_debt = value_of("DebtCurrent");
    }

    let operating_cash_flow = value_of("NetCashProvidedByUsedInOperatingActivities");
    let capital_expenditure = value_of("PaymentsToAcquirePropertyPlantAndEquipment");

    let (fiscal_year, period, report_date, filing_date) = match latest {
        Some(v) => (
            v.fy.unwrap_or(0),
            format!("{}-{}", v.fy.unwrap_or(0), v.fp.as_deref().unwrap_or("FY")),
            parse_date(&v.end),
            v.filed.as_deref().and_then(parse_date),
        ),
        None => (0, String::new(), None, None),
    };

    Some(FinancialStatement {
        revenue,
        net_income,
        total_assets,
        total_liabilities,
        total_debt,
        shareholders_equity,
        operating_cash_flow,
        capital_expenditure,
        free_cash_flow: derive_free_cash_flow(operating_cash_flow, capital_expenditure),
        period,
        fiscal_year,
        report_date,
        filing_date,
    })
}

fn latest_value<'a>(facts: &'a HashMap<String, Fact>, concept: &str) -> Option<&'a FactValue> {
    facts
        .get(concept)?
        .units
        .iter()
        .filter(|(unit, _)| unit.as_str() == "USD" || unit.as_str() == "USD/shares")
        .flat_map(|(_, values)| values.iter())
        .filter(|v| v.form == "10-K" || v.form == "10-Q")
        .filter(|v| v.val.as_f64().is_some() || v.val.as_str().is_some())
        .max_by(|a, b| a.end.cmp(&b.end))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

// EDGAR API types
#[derive(Debug, Deserialize)]
struct CompanyTicker {
    cik_str: u64,
    ticker: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct CompanyFacts {
    #[serde(default)]
    facts: HashMap<String, HashMap<String, Fact>>,
}

#[derive(Debug, Deserialize)]
struct Fact {
    #[serde(default)]
    units: HashMap<String, Vec<FactValue>>,
}

#[derive(Debug, Deserialize)]
struct FactValue {
    end: String,
    // Numbers occasionally arrive as strings
    val: serde_json::Value,
    fy: Option<i32>,
    fp: Option<String>,
    #[serde(default)]
    form: String,
    filed: Option<String>,
}

impl FactValue {
    fn as_f64(&self) -> f64 {
        match &self.val {
            serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
            serde_json::Value::String(s) => s.parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }
}
