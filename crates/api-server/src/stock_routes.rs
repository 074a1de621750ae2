//! Per-ticker analysis endpoints.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use analysis_orchestrator::StockAnalysis;
use serde::Serialize;
use std::collections::HashMap;
use valuation_engine::{DcfOverrides, DEFAULT_TARGET_PE};

use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Serialize)]
pub struct FairValueResponse {
    pub ticker: String,
    pub target_pe: f64,
    pub fair_value_per_share: f64,
}

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stocks/:ticker/fundamentals", get(get_fundamentals))
        .route("/api/stocks/:ticker/valuation", get(get_valuation))
        .route("/api/stocks/:ticker/metrics", get(get_metrics))
        .route("/api/stocks/:ticker/fair-value", get(get_fair_value))
}

/// Reads DCF overrides from query parameters. Values that do not parse are
/// dropped so the default assumption applies.
fn parse_overrides(params: &HashMap<String, String>) -> Option<DcfOverrides> {
    let float = |key: &str| params.get(key).and_then(|v| v.trim().parse::<f64>().ok());

    let overrides = DcfOverrides {
        revenue_growth: float("revenue_growth"),
        profit_margin: float("profit_margin"),
        fcf_margin: float("fcf_margin"),
        discount_rate: float("discount_rate"),
        terminal_growth: float("terminal_growth"),
        projection_years: params
            .get("projection_years")
            .and_then(|v| v.trim().parse::<u32>().ok()),
    };

    (!overrides.is_empty()).then_some(overrides)
}

async fn get_fundamentals(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<ApiResponse<StockAnalysis>>, AppError> {
    let ticker = ticker.to_uppercase();
    tracing::info!("Fundamentals requested for {}", ticker);

    let analysis = state.orchestrator.fundamentals(&ticker).await;
    Ok(Json(ApiResponse::success(analysis)))
}

async fn get_valuation(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<StockAnalysis>>, AppError> {
    let ticker = ticker.to_uppercase();
    let overrides = parse_overrides(&params);
    tracing::info!("Valuation requested for {} (overrides: {:?})", ticker, overrides);

    let analysis = state.orchestrator.valuation(&ticker, overrides.as_ref()).await?;
    Ok(Json(ApiResponse::success(analysis)))
}

async fn get_metrics(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<StockAnalysis>>, AppError> {
    let ticker = ticker.to_uppercase();
    let overrides = parse_overrides(&params);

    let analysis = state.orchestrator.metrics(&ticker, overrides.as_ref()).await;
    Ok(Json(ApiResponse::success(analysis)))
}

async fn get_fair_value(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<FairValueResponse>>, AppError> {
    let ticker = ticker.to_uppercase();
    let target_pe = params
        .get("target_pe")
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|pe| pe.is_finite() && *pe > 0.0);

    let fair_value = state.orchestrator.pe_fair_value(&ticker, target_pe).await?;
    Ok(Json(ApiResponse::success(FairValueResponse {
        ticker,
        target_pe: target_pe.unwrap_or(DEFAULT_TARGET_PE),
        fair_value_per_share: fair_value,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{get_json, mock_router};
    use axum::http::StatusCode;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_parse_overrides_skips_garbage() {
        assert!(parse_overrides(&params(&[])).is_none());
        assert!(parse_overrides(&params(&[("discount_rate", "ten percent")])).is_none());

        let overrides = parse_overrides(&params(&[
            ("discount_rate", "0.09"),
            ("projection_years", "7"),
            ("fcf_margin", "n/a"),
        ]))
        .unwrap();
        assert_eq!(overrides.discount_rate, Some(0.09));
        assert_eq!(overrides.projection_years, Some(7));
        assert_eq!(overrides.fcf_margin, None);
    }

    #[tokio::test]
    async fn test_fundamentals_uppercases_ticker() {
        let (status, body) = get_json(mock_router(), "/api/stocks/aapl/fundamentals").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["ticker"], "AAPL");
        assert_eq!(body["data"]["current_price"], 175.43);
        assert!(body["data"]["fundamental_scorecard"]["overall_score"].is_string());
        assert_eq!(body["data"]["data_freshness"]["price"], "real-time");
    }

    #[tokio::test]
    async fn test_valuation_with_overrides() {
        let (status, body) = get_json(
            mock_router(),
            "/api/stocks/MSFT/valuation?discount_rate=0.09&projection_years=3",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let valuation = &body["data"]["valuation"];
        assert_eq!(valuation["assumptions"]["source"], "user_input");
        assert_eq!(valuation["projections"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_valuation_rejects_divergent_assumptions() {
        let (status, body) = get_json(mock_router(), "/api/stocks/AAPL/valuation?discount_rate=0.02").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid assumptions"));
    }

    #[tokio::test]
    async fn test_valuation_unknown_ticker_is_bad_request() {
        let (status, body) = get_json(mock_router(), "/api/stocks/ZZZZ/valuation").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Insufficient data"));
    }

    #[tokio::test]
    async fn test_metrics_reports_valuation_failure_as_warning() {
        let (status, body) = get_json(mock_router(), "/api/stocks/ZZZZ/metrics").await;

        assert_eq!(status, StatusCode::OK);
        let warnings = body["data"]["warnings"].as_array().unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.as_str().unwrap().starts_with("Valuation calculation failed")));
    }

    #[tokio::test]
    async fn test_fair_value_defaults_target_pe() {
        let (status, body) = get_json(mock_router(), "/api/stocks/AAPL/fair-value?target_pe=abc").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["target_pe"], 15.0);
        assert!(body["data"]["fair_value_per_share"].as_f64().unwrap() > 0.0);
    }
}
