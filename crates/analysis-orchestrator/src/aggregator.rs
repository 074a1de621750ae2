use analysis_core::{
    AnalysisError, CompanyData, DataField, FigiMapping, FilingsProvider, FinancialStatement,
    IdentifierProvider, PriceProvider, MILLION,
};
use cik_resolver::CikResolver;
use std::collections::BTreeMap;
use std::sync::Arc;

const NO_HISTORY_SOURCE: &str = "no historical metrics source configured";

/// Fans out to every provider for one ticker and merges what comes back.
///
/// Provider failures become warnings; aggregation itself never fails.
pub struct CompanyAggregator {
    prices: Arc<dyn PriceProvider>,
    filings: Arc<dyn FilingsProvider>,
    identifiers: Arc<dyn IdentifierProvider>,
    resolver: Arc<CikResolver>,
}

impl CompanyAggregator {
    pub fn new(
        prices: Arc<dyn PriceProvider>,
        filings: Arc<dyn FilingsProvider>,
        identifiers: Arc<dyn IdentifierProvider>,
        resolver: Arc<CikResolver>,
    ) -> Self {
        Self {
            prices,
            filings,
            identifiers,
            resolver,
        }
    }

    pub fn resolver(&self) -> &Arc<CikResolver> {
        &self.resolver
    }

    /// Collect quote, profile, filings and identifier data for `ticker`.
    ///
    /// Returns one warning per failed source. Identifier-mapping failures are
    /// only logged.
    pub async fn aggregate(&self, ticker: &str) -> (CompanyData, Vec<String>) {
        let mut data = CompanyData::new(ticker);
        let ticker = data.ticker.clone();
        let mut warnings = Vec::new();

        tracing::info!("Aggregating company data for {}", ticker);

        let (quote, profile, financials, figi) = tokio::join!(
            self.prices.get_quote(&ticker),
            self.prices.get_profile(&ticker),
            self.fetch_financials(&ticker),
            self.identifiers.map_ticker(&ticker),
        );

        match quote {
            Ok(quote) => data.quote = DataField::Present(quote),
            Err(e) => {
                tracing::warn!("Quote error for {}: {}", ticker, e);
                warnings.push(format!("Price data unavailable: {}", e));
                data.quote = DataField::Unavailable(e.to_string());
            }
        }

        let mut profile_name = None;
        match profile {
            Ok(profile) => {
                if profile.market_cap_millions > 0.0 {
                    if let Some(quote) = data.quote.as_present_mut() {
                        quote.market_cap = Some(profile.market_cap_millions * MILLION);
                    }
                }
                data.shares_outstanding = if profile.shares_outstanding_millions > 0.0 {
                    DataField::Present(profile.shares_outstanding_millions)
                } else {
                    DataField::unavailable("shares outstanding not reported by profile")
                };
                profile_name = Some(profile.name).filter(|n| !n.trim().is_empty());
            }
            Err(e) => {
                tracing::warn!("Profile error for {}: {}", ticker, e);
                warnings.push(format!("Company profile unavailable: {}", e));
                data.shares_outstanding = DataField::Unavailable(e.to_string());
            }
        }

        let (cik, financials) = financials;
        data.cik = cik;
        match financials {
            Ok(statement) => data.financials = DataField::Present(statement),
            Err(e) => {
                tracing::warn!("Filings error for {}: {}", ticker, e);
                warnings.push(format!("Fundamental data unavailable: {}", e));
                data.financials = DataField::Unavailable(e.to_string());
            }
        }

        let mut figi_name = None;
        match figi {
            Ok(FigiMapping { figi, name }) => {
                data.figi = if figi.is_empty() {
                    DataField::unavailable("no FIGI assigned")
                } else {
                    DataField::Present(figi)
                };
                figi_name = Some(name).filter(|n| !n.trim().is_empty());
            }
            Err(e) => {
                // Optional enrichment; not surfaced as a warning
                tracing::warn!("Identifier mapping error for {}: {}", ticker, e);
                data.figi = DataField::Unavailable(e.to_string());
            }
        }

        data.company_name = profile_name.or(figi_name).unwrap_or_else(|| ticker.clone());
        data.historical = DataField::unavailable(NO_HISTORY_SOURCE);

        (data, warnings)
    }

    /// Resolve the CIK, then fetch the latest statement for it.
    async fn fetch_financials(
        &self,
        ticker: &str,
    ) -> (DataField<String>, Result<FinancialStatement, AnalysisError>) {
        let cik = match self.resolver.resolve(ticker).await {
            Ok(cik) => cik,
            Err(e) => return (DataField::Unavailable(e.to_string()), Err(e)),
        };
        let statement = self
            .filings
            .get_financial_statement(&cik)
            .await
            .map_err(AnalysisError::from);
        (DataField::Present(cik), statement)
    }
}

/// How current each data category is, keyed by category name.
pub fn data_freshness(data: &CompanyData) -> BTreeMap<String, String> {
    let mut freshness = BTreeMap::new();

    let price = if data.quote.is_present() { "real-time" } else { "unavailable" };
    freshness.insert("price".to_string(), price.to_string());

    let fundamentals = match data.financials.as_present() {
        Some(f) if f.report_date.is_some() => f.period.clone(),
        Some(_) => "available".to_string(),
        None => "unavailable".to_string(),
    };
    freshness.insert("fundamentals".to_string(), fundamentals);

    freshness
}
