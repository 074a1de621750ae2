use analysis_core::{AnalysisError, CompanyData, FinancialStatement, MILLION};
use serde::{Deserialize, Serialize};

pub const DEFAULT_REVENUE_GROWTH: f64 = 0.08;
pub const DEFAULT_PROFIT_MARGIN: f64 = 0.15;
pub const DEFAULT_FCF_MARGIN: f64 = 0.12;
pub const DEFAULT_DISCOUNT_RATE: f64 = 0.10;
pub const DEFAULT_TERMINAL_GROWTH: f64 = 0.025;
pub const DEFAULT_PROJECTION_YEARS: u32 = 5;
pub const MAX_PROJECTION_YEARS: u32 = 50;
pub const DEFAULT_TARGET_PE: f64 = 15.0;

/// Caller-supplied assumptions. `Some` always wins, zero included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcfOverrides {
    pub revenue_growth: Option<f64>,
    pub profit_margin: Option<f64>,
    pub fcf_margin: Option<f64>,
    pub discount_rate: Option<f64>,
    pub terminal_growth: Option<f64>,
    pub projection_years: Option<u32>,
}

impl DcfOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssumptionSource {
    /// At least one field came from an override.
    UserInput,
    Defaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfAssumptions {
    pub revenue_growth_rate: f64,
    pub profit_margin: f64,
    pub fcf_margin: f64,
    pub discount_rate: f64,
    pub terminal_growth_rate: f64,
    pub projection_years: u32,
    pub source: AssumptionSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfProjection {
    pub year: u32,
    pub revenue: f64,
    pub net_income: f64,
    pub free_cash_flow: f64,
    pub discount_factor: f64,
    pub present_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub fair_value_per_share: f64,
    pub current_price: Option<f64>,
    /// Positive means undervalued. Zero when no price is known.
    pub upside_percent: f64,
    pub model: String,
    pub assumptions: DcfAssumptions,
    pub projections: Vec<DcfProjection>,
    pub terminal_value: f64,
    pub enterprise_value: f64,
    /// In millions.
    pub shares_outstanding: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValuationEngine;

impl ValuationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Discounted cash flow fair value per share.
    ///
    /// Requires a financial statement and positive shares outstanding.
    /// Rejects assumption sets where the terminal value diverges.
    pub fn valuate(
        &self,
        data: &CompanyData,
        overrides: Option<&DcfOverrides>,
    ) -> Result<ValuationResult, AnalysisError> {
        let (financials, shares) = dcf_inputs(data)?;
        let assumptions = build_assumptions(financials, overrides)?;
        validate(&assumptions)?;

        let projections = project(financials.revenue, &assumptions);
        let terminal_value = terminal_value(&projections, &assumptions);

        let pv_cash_flows: f64 = projections.iter().map(|p| p.present_value).sum();
        let pv_terminal = terminal_value / (1.0 + assumptions.discount_rate).powi(assumptions.projection_years as i32);
        // Equity value approximated by enterprise value (no net debt adjustment)
        let enterprise_value = pv_cash_flows + pv_terminal;
        let fair_value_per_share = enterprise_value / (shares * MILLION);

        let current_price = data.current_price();
        let upside_percent = match current_price {
            Some(price) => (fair_value_per_share - price) / price * 100.0,
            None => 0.0,
        };

        tracing::debug!(
            "DCF for {}: fair value {:.2}/share ({:?} assumptions)",
            data.ticker,
            fair_value_per_share,
            assumptions.source
        );

        Ok(ValuationResult {
            fair_value_per_share,
            current_price,
            upside_percent,
            model: "DCF".to_string(),
            assumptions,
            projections,
            terminal_value,
            enterprise_value,
            shares_outstanding: shares,
        })
    }

    /// Fair value as EPS times a target P/E (default 15).
    pub fn pe_multiple_fair_value(&self, data: &CompanyData, target_pe: Option<f64>) -> Result<f64, AnalysisError> {
        let (financials, shares) = match dcf_inputs(data) {
            Ok(inputs) => inputs,
            Err(_) => {
                return Err(AnalysisError::Precondition(
                    "insufficient data for simple valuation".to_string(),
                ))
            }
        };
        let target_pe = target_pe.filter(|pe| *pe != 0.0).unwrap_or(DEFAULT_TARGET_PE);
        if !target_pe.is_finite() {
            return Err(AnalysisError::InvalidAssumptions("target P/E must be finite".to_string()));
        }

        let eps = financials.net_income / (shares * MILLION);
        Ok(eps * target_pe)
    }
}

fn dcf_inputs(data: &CompanyData) -> Result<(&FinancialStatement, f64), AnalysisError> {
    let financials = data.financials.as_present().ok_or_else(|| {
        AnalysisError::Precondition("no financial data available for DCF calculation".to_string())
    })?;
    let shares = data
        .shares_outstanding()
        .filter(|s| *s > 0.0)
        .ok_or_else(|| AnalysisError::Precondition("shares outstanding not available".to_string()))?;
    Ok((financials, shares))
}

/// Per field: override, then historical ratio when it lies in (0, 1), then default.
fn build_assumptions(
    financials: &FinancialStatement,
    overrides: Option<&DcfOverrides>,
) -> Result<DcfAssumptions, AnalysisError> {
    let empty = DcfOverrides::default();
    let o = overrides.unwrap_or(&empty);

    for (name, value) in [
        ("revenue_growth", o.revenue_growth),
        ("profit_margin", o.profit_margin),
        ("fcf_margin", o.fcf_margin),
        ("discount_rate", o.discount_rate),
        ("terminal_growth", o.terminal_growth),
    ] {
        if let Some(v) = value {
            if !v.is_finite() {
                return Err(AnalysisError::InvalidAssumptions(format!("{} must be a finite number", name)));
            }
        }
    }

    let historical_margin = |numerator: f64| {
        Some(numerator / financials.revenue)
            .filter(|_| financials.revenue > 0.0)
            .filter(|m| *m > 0.0 && *m < 1.0)
    };

    Ok(DcfAssumptions {
        revenue_growth_rate: o.revenue_growth.unwrap_or(DEFAULT_REVENUE_GROWTH),
        profit_margin: o
            .profit_margin
            .or_else(|| historical_margin(financials.net_income))
            .unwrap_or(DEFAULT_PROFIT_MARGIN),
        fcf_margin: o
            .fcf_margin
            .or_else(|| historical_margin(financials.free_cash_flow))
            .unwrap_or(DEFAULT_FCF_MARGIN),
        discount_rate: o.discount_rate.unwrap_or(DEFAULT_DISCOUNT_RATE),
        terminal_growth_rate: o.terminal_growth.unwrap_or(DEFAULT_TERMINAL_GROWTH),
        projection_years: o.projection_years.unwrap_or(DEFAULT_PROJECTION_YEARS),
        source: if o.is_empty() {
            AssumptionSource::Defaults
        } else {
            AssumptionSource::UserInput
        },
    })
}

fn validate(a: &DcfAssumptions) -> Result<(), AnalysisError> {
    if a.projection_years == 0 || a.projection_years > MAX_PROJECTION_YEARS {
        return Err(AnalysisError::InvalidAssumptions(format!(
            "projection years must be between 1 and {} (got {})",
            MAX_PROJECTION_YEARS, a.projection_years
        )));
    }
    if a.discount_rate <= -1.0 {
        return Err(AnalysisError::InvalidAssumptions(format!(
            "discount rate ({}) must be greater than -100%",
            a.discount_rate
        )));
    }
    if a.discount_rate <= a.terminal_growth_rate {
        return Err(AnalysisError::InvalidAssumptions(format!(
            "discount rate ({}) must exceed terminal growth rate ({})",
            a.discount_rate, a.terminal_growth_rate
        )));
    }
    Ok(())
}

fn project(base_revenue: f64, a: &DcfAssumptions) -> Vec<DcfProjection> {
    (1..=a.projection_years)
        .map(|year| {
            let revenue = base_revenue * (1.0 + a.revenue_growth_rate).powi(year as i32);
            let free_cash_flow = revenue * a.fcf_margin;
            let discount_factor = (1.0 + a.discount_rate).powi(year as i32);
            DcfProjection {
                year,
                revenue,
                net_income: revenue * a.profit_margin,
                free_cash_flow,
                discount_factor,
                present_value: free_cash_flow / discount_factor,
            }
        })
        .collect()
}

/// Gordon growth on the final projected year's FCF.
fn terminal_value(projections: &[DcfProjection], a: &DcfAssumptions) -> f64 {
    match projections.last() {
        Some(last) => last.free_cash_flow * (1.0 + a.terminal_growth_rate) / (a.discount_rate - a.terminal_growth_rate),
        None => 0.0,
    }
}
