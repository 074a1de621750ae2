use analysis_core::{AnalysisError, CompanyData};
use chrono::{DateTime, Utc};
use fundamental_analysis::{Scorecard, ScorecardEngine};
use serde::Serialize;
use std::collections::BTreeMap;
use valuation_engine::{DcfOverrides, ValuationEngine, ValuationResult};

pub mod aggregator;
pub use aggregator::{data_freshness, CompanyAggregator};

/// Combined per-ticker analysis returned to API callers
#[derive(Debug, Clone, Serialize)]
pub struct StockAnalysis {
    pub ticker: String,
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fundamental_scorecard: Option<Scorecard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valuation: Option<ValuationResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub data_freshness: BTreeMap<String, String>,
}

impl StockAnalysis {
    fn new(data: &CompanyData, warnings: Vec<String>) -> Self {
        Self {
            ticker: data.ticker.clone(),
            company_name: data.company_name.clone(),
            current_price: data.current_price(),
            last_updated: Utc::now(),
            fundamental_scorecard: None,
            valuation: None,
            warnings,
            data_freshness: data_freshness(data),
        }
    }
}

pub struct AnalysisOrchestrator {
    aggregator: CompanyAggregator,
    scorecard_engine: ScorecardEngine,
    valuation_engine: ValuationEngine,
}

impl AnalysisOrchestrator {
    pub fn new(aggregator: CompanyAggregator) -> Self {
        Self {
            aggregator,
            scorecard_engine: ScorecardEngine::new(),
            valuation_engine: ValuationEngine::new(),
        }
    }

    pub fn aggregator(&self) -> &CompanyAggregator {
        &self.aggregator
    }

    /// Fundamentals scorecard. Never fails; degraded sources show up as warnings.
    pub async fn fundamentals(&self, ticker: &str) -> StockAnalysis {
        let (data, warnings) = self.aggregator.aggregate(ticker).await;
        let mut analysis = StockAnalysis::new(&data, warnings);
        analysis.fundamental_scorecard = Some(self.scorecard_engine.score(&data));
        analysis
    }

    /// DCF valuation. Fails when the data cannot support a per-share value
    /// or the assumptions are degenerate.
    pub async fn valuation(
        &self,
        ticker: &str,
        overrides: Option<&DcfOverrides>,
    ) -> Result<StockAnalysis, AnalysisError> {
        let (data, warnings) = self.aggregator.aggregate(ticker).await;
        let valuation = self.valuation_engine.valuate(&data, overrides)?;
        let mut analysis = StockAnalysis::new(&data, warnings);
        analysis.valuation = Some(valuation);
        Ok(analysis)
    }

    /// Scorecard plus valuation; a failed valuation becomes a warning.
    pub async fn metrics(&self, ticker: &str, overrides: Option<&DcfOverrides>) -> StockAnalysis {
        let (data, mut warnings) = self.aggregator.aggregate(ticker).await;
        let scorecard = self.scorecard_engine.score(&data);

        let valuation = match self.valuation_engine.valuate(&data, overrides) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("DCF error for {}: {}", data.ticker, e);
                warnings.push(format!("Valuation calculation failed: {}", e));
                None
            }
        };

        let mut analysis = StockAnalysis::new(&data, warnings);
        analysis.fundamental_scorecard = Some(scorecard);
        analysis.valuation = valuation;
        analysis
    }

    /// P/E-multiple fair value for `ticker`.
    pub async fn pe_fair_value(&self, ticker: &str, target_pe: Option<f64>) -> Result<f64, AnalysisError> {
        let (data, _) = self.aggregator.aggregate(ticker).await;
        self.valuation_engine.pe_multiple_fair_value(&data, target_pe)
    }
}
