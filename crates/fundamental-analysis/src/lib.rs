use analysis_core::{CompanyData, FinancialStatement, MILLION};
use serde::{Deserialize, Serialize};

/// Fixed growth estimate used for PEG until a growth-estimate source exists.
pub const PEG_ASSUMED_GROWTH_PCT: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Favorable,
    Neutral,
    Unfavorable,
    /// Prerequisite data missing; no rating computed.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorecardMetric {
    pub current: Option<f64>,
    pub five_year_avg: Option<f64>,
    pub rating: Rating,
    pub message: String,
}

impl ScorecardMetric {
    fn unavailable(message: &str) -> Self {
        Self {
            current: None,
            five_year_avg: None,
            rating: Rating::Unavailable,
            message: message.to_string(),
        }
    }

    /// Degenerate inputs (losses, negative equity): rated, but no ratio.
    fn degenerate(message: &str) -> Self {
        Self {
            current: None,
            five_year_avg: None,
            rating: Rating::Unfavorable,
            message: message.to_string(),
        }
    }

    fn rated(value: f64, rating: Rating, message: String) -> Self {
        Self {
            current: Some(value),
            five_year_avg: None,
            rating,
            message,
        }
    }

    pub fn is_rated(&self) -> bool {
        self.rating != Rating::Unavailable
    }
}

/// The five-metric fundamentals scorecard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub pe_ratio: ScorecardMetric,
    pub debt_to_equity: ScorecardMetric,
    pub fcf_yield: ScorecardMetric,
    pub peg_ratio: ScorecardMetric,
    pub roe: ScorecardMetric,
    /// e.g. "4/5 metrics healthy"
    pub overall_score: String,
    pub summary: String,
}

impl Scorecard {
    pub fn metrics(&self) -> [&ScorecardMetric; 5] {
        [
            &self.pe_ratio,
            &self.debt_to_equity,
            &self.fcf_yield,
            &self.peg_ratio,
            &self.roe,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScorecardEngine;

impl ScorecardEngine {
    pub fn new() -> Self {
        Self
    }

    /// Rate the company on P/E, debt/equity, FCF yield, PEG and ROE.
    ///
    /// Total: missing inputs produce `Rating::Unavailable` metrics, never an error.
    pub fn score(&self, data: &CompanyData) -> Scorecard {
        let pe_ratio = self.pe_ratio(data);
        let debt_to_equity = self.debt_to_equity(data);
        let fcf_yield = self.fcf_yield(data);
        let peg_ratio = self.peg_ratio(&pe_ratio);
        let roe = self.roe(data);

        let mut scorecard = Scorecard {
            pe_ratio,
            debt_to_equity,
            fcf_yield,
            peg_ratio,
            roe,
            overall_score: String::new(),
            summary: String::new(),
        };
        let (overall_score, summary) = roll_up(&scorecard);
        scorecard.overall_score = overall_score;
        scorecard.summary = summary;
        scorecard
    }

    fn pe_ratio(&self, data: &CompanyData) -> ScorecardMetric {
        let (price, financials) = match (data.current_price(), data.financials.as_present()) {
            (Some(price), Some(financials)) => (price, financials),
            _ => return ScorecardMetric::unavailable("Insufficient data to calculate P/E ratio"),
        };
        let shares = match data.shares_outstanding().filter(|s| *s > 0.0) {
            Some(shares) => shares,
            None => return ScorecardMetric::unavailable("Shares outstanding not available"),
        };
        if financials.net_income <= 0.0 {
            return ScorecardMetric::degenerate("Company has negative or zero earnings");
        }

        let eps = financials.net_income / (shares * MILLION);
        let pe = price / eps;

        let five_year_avg = data
            .historical
            .as_present()
            .and_then(|h| h.pe_ratio_avg_5y)
            .filter(|avg| *avg > 0.0);

        let mut metric = match five_year_avg {
            Some(avg) => {
                let (rating, message) = if pe < avg * 0.9 {
                    (
                        Rating::Favorable,
                        format!("P/E ({:.2}) is below 5-year average ({:.2}) - potentially undervalued", pe, avg),
                    )
                } else if pe > avg * 1.2 {
                    (
                        Rating::Unfavorable,
                        format!("P/E ({:.2}) is above 5-year average ({:.2}) - potentially overvalued", pe, avg),
                    )
                } else {
                    (Rating::Neutral, format!("P/E ({:.2}) is near 5-year average ({:.2})", pe, avg))
                };
                ScorecardMetric::rated(pe, rating, message)
            }
            None => {
                let (rating, message) = if pe < 15.0 {
                    (Rating::Favorable, format!("P/E of {:.2} suggests good value", pe))
                } else if pe > 30.0 {
                    (Rating::Unfavorable, format!("P/E of {:.2} is relatively high", pe))
                } else {
                    (Rating::Neutral, format!("P/E of {:.2} is moderate", pe))
                };
                ScorecardMetric::rated(pe, rating, message)
            }
        };
        metric.five_year_avg = five_year_avg;
        metric
    }

    fn debt_to_equity(&self, data: &CompanyData) -> ScorecardMetric {
        let financials = match data.financials.as_present() {
            Some(f) => f,
            None => return ScorecardMetric::unavailable("No financial data available"),
        };
        let equity = match positive_equity(financials) {
            Some(equity) => equity,
            None => return ScorecardMetric::degenerate("Company has negative or zero equity"),
        };

        let de = financials.total_debt / equity;
        let (rating, message) = if de < 0.5 {
            (Rating::Favorable, format!("Excellent debt levels ({:.2}) - very safe", de))
        } else if de < 1.0 {
            (Rating::Neutral, format!("Moderate debt levels ({:.2}) - acceptable", de))
        } else if de < 2.0 {
            (Rating::Unfavorable, format!("High debt levels ({:.2}) - risky", de))
        } else {
            (Rating::Unfavorable, format!("Very high debt levels ({:.2}) - concerning", de))
        };
        ScorecardMetric::rated(de, rating, message)
    }

    fn fcf_yield(&self, data: &CompanyData) -> ScorecardMetric {
        let financials = match (data.quote.is_present(), data.financials.as_present()) {
            (true, Some(financials)) => financials,
            _ => return ScorecardMetric::unavailable("Insufficient data to calculate FCF Yield"),
        };
        let market_cap = match data.market_cap() {
            Some(cap) => cap,
            None => return ScorecardMetric::unavailable("Market cap not available"),
        };

        let fcf_yield = financials.free_cash_flow / market_cap * 100.0;
        let (rating, message) = if fcf_yield > 8.0 {
            (
                Rating::Favorable,
                format!("Excellent FCF yield ({:.2}%) - strong cash generation", fcf_yield),
            )
        } else if fcf_yield > 4.0 {
            (Rating::Neutral, format!("Good FCF yield ({:.2}%)", fcf_yield))
        } else if fcf_yield > 0.0 {
            (
                Rating::Unfavorable,
                format!("Low FCF yield ({:.2}%) - limited cash generation", fcf_yield),
            )
        } else {
            (
                Rating::Unfavorable,
                format!("Negative FCF yield ({:.2}%) - burning cash", fcf_yield),
            )
        };
        ScorecardMetric::rated(fcf_yield, rating, message)
    }

    fn peg_ratio(&self, pe_ratio: &ScorecardMetric) -> ScorecardMetric {
        let pe = match pe_ratio.current {
            Some(pe) => pe,
            None => return ScorecardMetric::unavailable("P/E ratio not available"),
        };

        let peg = pe / PEG_ASSUMED_GROWTH_PCT;
        let (rating, message) = if peg < 1.0 {
            (Rating::Favorable, format!("PEG of {:.2} suggests undervalued relative to growth", peg))
        } else if peg < 1.5 {
            (Rating::Neutral, format!("PEG of {:.2} is fairly valued", peg))
        } else {
            (Rating::Unfavorable, format!("PEG of {:.2} suggests overvalued relative to growth", peg))
        };
        let message = format!("{} (assuming {:.0}% growth)", message, PEG_ASSUMED_GROWTH_PCT);
        ScorecardMetric::rated(peg, rating, message)
    }

    fn roe(&self, data: &CompanyData) -> ScorecardMetric {
        let financials = match data.financials.as_present() {
            Some(f) => f,
            None => return ScorecardMetric::unavailable("No financial data available"),
        };
        let equity = match positive_equity(financials) {
            Some(equity) => equity,
            None => return ScorecardMetric::degenerate("Company has negative or zero equity"),
        };

        let roe = financials.net_income / equity * 100.0;
        let (rating, message) = if roe > 20.0 {
            (Rating::Favorable, format!("Excellent ROE ({:.2}%) - highly efficient management", roe))
        } else if roe > 15.0 {
            (Rating::Neutral, format!("Good ROE ({:.2}%) - solid management", roe))
        } else if roe > 0.0 {
            (Rating::Unfavorable, format!("Low ROE ({:.2}%) - poor capital efficiency", roe))
        } else {
            (Rating::Unfavorable, format!("Negative ROE ({:.2}%) - losing money", roe))
        };
        ScorecardMetric::rated(roe, rating, message)
    }
}

fn positive_equity(financials: &FinancialStatement) -> Option<f64> {
    Some(financials.shareholders_equity).filter(|e| *e > 0.0)
}

fn roll_up(scorecard: &Scorecard) -> (String, String) {
    let metrics = scorecard.metrics();
    let total = metrics.iter().filter(|m| m.is_rated()).count();
    if total == 0 {
        return (
            format!("0/{} metrics available", metrics.len()),
            "Insufficient data for analysis".to_string(),
        );
    }

    let count = |rating: Rating| metrics.iter().filter(|m| m.rating == rating).count();
    let favorable = count(Rating::Favorable);
    let neutral = count(Rating::Neutral);
    let unfavorable = count(Rating::Unfavorable);

    let score = format!("{}/{} metrics healthy", favorable + neutral, total);

    let favorable_pct = favorable as f64 / total as f64 * 100.0;
    let summary = if unfavorable * 2 > total {
        "Concerning fundamentals - Avoid or investigate further"
    } else if favorable_pct >= 60.0 {
        "Strong fundamentals - Good investment candidate"
    } else if favorable_pct >= 40.0 {
        "Mixed fundamentals - Proceed with caution"
    } else {
        "Weak fundamentals - High risk"
    };

    (score, summary.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{DataField, HistoricalMetrics, Quote};
    use chrono::Utc;

    fn statement(net_income: f64, equity: f64, debt: f64, fcf: f64) -> FinancialStatement {
        FinancialStatement {
            revenue: 10_000_000.0,
            net_income,
            total_assets: 0.0,
            total_liabilities: 0.0,
            total_debt: debt,
            shareholders_equity: equity,
            operating_cash_flow: 0.0,
            capital_expenditure: 0.0,
            free_cash_flow: fcf,
            period: "2024-FY".to_string(),
            fiscal_year: 2024,
            report_date: None,
            filing_date: None,
        }
    }

    fn quote(price: f64, market_cap: Option<f64>) -> Quote {
        Quote {
            ticker: "TEST".to_string(),
            current_price: price,
            high: price,
            low: price,
            open: price,
            previous_close: price,
            change: 0.0,
            change_percent: 0.0,
            volume: None,
            market_cap,
            timestamp: Utc::now(),
        }
    }

    /// One million shares outstanding and a $100M market cap.
    fn company(price: f64, financials: FinancialStatement) -> CompanyData {
        let mut data = CompanyData::new("TEST");
        data.quote = DataField::Present(quote(price, Some(100_000_000.0)));
        data.financials = DataField::Present(financials);
        data.shares_outstanding = DataField::Present(1.0);
        data
    }

    #[test]
    fn test_everything_missing_is_insufficient_data() {
        let scorecard = ScorecardEngine::new().score(&CompanyData::new("TEST"));

        for metric in scorecard.metrics() {
            assert_eq!(metric.rating, Rating::Unavailable);
            assert!(metric.current.is_none());
        }
        assert_eq!(scorecard.overall_score, "0/5 metrics available");
        assert_eq!(scorecard.summary, "Insufficient data for analysis");
    }

    #[test]
    fn test_pe_without_history_uses_benchmarks() {
        let data = company(28.5, statement(1_000_000.0, 10_000_000.0, 0.0, 0.0));
        let metric = ScorecardEngine::new().score(&data).pe_ratio;

        assert_eq!(metric.rating, Rating::Neutral);
        assert!((metric.current.unwrap() - 28.5).abs() < 1e-9);
        assert!(metric.five_year_avg.is_none());
        assert_eq!(metric.message, "P/E of 28.50 is moderate");

        let cheap = company(12.0, statement(1_000_000.0, 10_000_000.0, 0.0, 0.0));
        assert_eq!(ScorecardEngine::new().score(&cheap).pe_ratio.rating, Rating::Favorable);
    }

    #[test]
    fn test_pe_against_five_year_average() {
        let mut data = company(28.5, statement(1_000_000.0, 10_000_000.0, 0.0, 0.0));
        data.historical = DataField::Present(HistoricalMetrics {
            pe_ratio_avg_5y: Some(20.0),
            ..HistoricalMetrics::default()
        });
        let metric = ScorecardEngine::new().score(&data).pe_ratio;

        assert_eq!(metric.rating, Rating::Unfavorable);
        assert_eq!(metric.five_year_avg, Some(20.0));
    }

    #[test]
    fn test_debt_to_equity_bands() {
        let engine = ScorecardEngine::new();

        let low = company(20.0, statement(1_000_000.0, 10_000_000.0, 3_000_000.0, 0.0));
        let metric = engine.score(&low).debt_to_equity;
        assert_eq!(metric.rating, Rating::Favorable);
        assert!((metric.current.unwrap() - 0.3).abs() < 1e-9);

        let high = company(20.0, statement(1_000_000.0, 10_000_000.0, 15_000_000.0, 0.0));
        assert_eq!(engine.score(&high).debt_to_equity.rating, Rating::Unfavorable);

        let negative_equity = company(20.0, statement(1_000_000.0, -5.0, 15_000_000.0, 0.0));
        let scorecard = engine.score(&negative_equity);
        assert_eq!(scorecard.debt_to_equity.rating, Rating::Unfavorable);
        assert!(scorecard.debt_to_equity.current.is_none());
        assert_eq!(scorecard.roe.rating, Rating::Unfavorable);
    }

    #[test]
    fn test_losses_make_pe_and_peg_degenerate() {
        let data = company(20.0, statement(-1_000_000.0, 10_000_000.0, 0.0, 0.0));
        let scorecard = ScorecardEngine::new().score(&data);

        assert_eq!(scorecard.pe_ratio.rating, Rating::Unfavorable);
        assert_eq!(scorecard.pe_ratio.message, "Company has negative or zero earnings");
        assert_eq!(scorecard.peg_ratio.rating, Rating::Unavailable);

        // The loss-making P/E still counts; only PEG drops out of the total
        assert_eq!(scorecard.overall_score, "1/4 metrics healthy");
    }

    #[test]
    fn test_fcf_yield_needs_market_cap() {
        let mut data = company(20.0, statement(1_000_000.0, 10_000_000.0, 0.0, 9_000_000.0));
        let metric = ScorecardEngine::new().score(&data).fcf_yield;
        assert_eq!(metric.rating, Rating::Favorable);
        assert!((metric.current.unwrap() - 9.0).abs() < 1e-9);

        data.quote = DataField::Present(quote(20.0, None));
        let metric = ScorecardEngine::new().score(&data).fcf_yield;
        assert_eq!(metric.rating, Rating::Unavailable);
        assert_eq!(metric.message, "Market cap not available");
    }

    #[test]
    fn test_peg_uses_fixed_growth() {
        let data = company(28.5, statement(1_000_000.0, 10_000_000.0, 0.0, 0.0));
        let metric = ScorecardEngine::new().score(&data).peg_ratio;

        assert!((metric.current.unwrap() - 28.5 / 8.0).abs() < 1e-9);
        assert_eq!(metric.rating, Rating::Unfavorable);
        assert!(metric.message.ends_with("(assuming 8% growth)"));
    }

    #[test]
    fn test_roll_up() {
        // P/E 12 fav, D/E 0.3 fav, FCF 9% fav, PEG 1.5 unfav, ROE 30% fav
        let data = company(36.0, statement(3_000_000.0, 10_000_000.0, 3_000_000.0, 9_000_000.0));
        let scorecard = ScorecardEngine::new().score(&data);

        assert_eq!(scorecard.overall_score, "4/5 metrics healthy");
        assert_eq!(scorecard.summary, "Strong fundamentals - Good investment candidate");

        // Only the two financials-only metrics are computable
        let mut partial = CompanyData::new("TEST");
        partial.financials = DataField::Present(statement(1_000_000.0, 10_000_000.0, 15_000_000.0, 0.0));
        let scorecard = ScorecardEngine::new().score(&partial);
        assert_eq!(scorecard.overall_score, "0/2 metrics healthy");
        assert_eq!(scorecard.summary, "Concerning fundamentals - Avoid or investigate further");
    }
}
