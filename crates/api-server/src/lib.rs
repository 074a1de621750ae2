//! HTTP transport for the analysis core.
//!
//! Exposed as a library so the router can be exercised in tests; the
//! `api-server` binary only builds a runtime and calls [`run_server`].

use analysis_core::{AnalysisError, FilingsProvider, IdentifierProvider, PriceProvider, TickerCatalogSource};
use analysis_orchestrator::{AnalysisOrchestrator, CompanyAggregator};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use cik_resolver::CikResolver;
use market_data_client::{EdgarClient, FinnhubClient, MockMarketData, OpenFigiClient};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod config;
mod search_routes;
mod stock_routes;

pub use config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub resolver: Arc<CikResolver>,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error: an HTTP status plus the underlying cause.
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<AnalysisError> for AppError {
    fn from(error: AnalysisError) -> Self {
        let status = match &error {
            AnalysisError::Precondition(_) | AnalysisError::InvalidAssumptions(_) => StatusCode::BAD_REQUEST,
            AnalysisError::NotFound { .. } => StatusCode::NOT_FOUND,
            AnalysisError::Provider(_) | AnalysisError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::with_status(status, error.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
        } else {
            tracing::debug!("Request rejected ({}): {}", self.status, self.error);
        }
        let body = ApiResponse::<()>::error(self.error.to_string());
        (self.status, Json(body)).into_response()
    }
}

/// Wires providers, resolver and orchestrator according to `config`.
pub fn build_state(config: &AppConfig) -> AppState {
    let (prices, filings, identifiers, catalog): (
        Arc<dyn PriceProvider>,
        Arc<dyn FilingsProvider>,
        Arc<dyn IdentifierProvider>,
        Arc<dyn TickerCatalogSource>,
    ) = if config.use_mock_data {
        tracing::info!("USE_MOCK_DATA=true, serving canned provider data");
        let mock = Arc::new(MockMarketData::new());
        (mock.clone(), mock.clone(), mock.clone(), mock)
    } else {
        let edgar = Arc::new(EdgarClient::new(&config.providers));
        (
            Arc::new(FinnhubClient::new(&config.providers)),
            edgar.clone(),
            Arc::new(OpenFigiClient::new(&config.providers)),
            edgar,
        )
    };

    let resolver = Arc::new(CikResolver::new(catalog, config.resolver.clone()));
    let aggregator = CompanyAggregator::new(prices, filings, identifiers, resolver.clone());

    AppState {
        orchestrator: Arc::new(AnalysisOrchestrator::new(aggregator)),
        resolver,
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(stock_routes::stock_routes())
        .merge(search_routes::search_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Installs the global subscriber. `RUST_LOG` controls filtering (default
/// `info`); `RUST_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing already initialized: {}", e);
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let state = build_state(&config);
    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🚀 API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    pub(crate) fn mock_router() -> Router {
        let config = AppConfig::from_lookup(|key| (key == "USE_MOCK_DATA").then(|| "true".to_string()))
            .unwrap();
        build_router(build_state(&config))
    }

    pub(crate) async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(mock_router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (AnalysisError::Precondition("no shares".into()), StatusCode::BAD_REQUEST),
            (AnalysisError::InvalidAssumptions("rate".into()), StatusCode::BAD_REQUEST),
            (
                AnalysisError::NotFound {
                    ticker: "ZZZZ".into(),
                    source_name: "EDGAR".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (AnalysisError::Config("missing key".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(AppError::from(error).status, expected);
        }
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let json = serde_json::to_value(ApiResponse::<()>::error("boom")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert!(json.get("data").is_none());
    }
}
