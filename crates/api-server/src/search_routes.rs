use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use cik_resolver::SearchResult;
use serde::Serialize;
use std::collections::HashMap;

use crate::{ApiResponse, AppError, AppState};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;
const MAX_QUERY_LEN: usize = 100;

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub total: usize,
}

pub fn search_routes() -> Router<AppState> {
    Router::new().route("/api/search", get(search_tickers))
}

async fn search_tickers(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<SearchResponse>>, AppError> {
    let query = params.get("q").map(|q| q.trim()).unwrap_or_default();
    if query.is_empty() {
        return Err(AppError::bad_request("query parameter 'q' is required"));
    }
    if query.chars().count() > MAX_QUERY_LEN {
        return Err(AppError::bad_request(format!(
            "query must be at most {} characters",
            MAX_QUERY_LEN
        )));
    }

    let limit = params
        .get("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(DEFAULT_LIMIT)
        .min(MAX_LIMIT);

    let results = state.resolver.search(query, limit).await?;
    tracing::debug!("Search '{}' matched {} tickers", query, results.len());

    Ok(Json(ApiResponse::success(SearchResponse {
        query: query.to_string(),
        total: results.len(),
        results,
    })))
}

#[cfg(test)]
mod tests {
    use crate::tests::{get_json, mock_router};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_search_by_company_name() {
        let (status, body) = get_json(mock_router(), "/api/search?q=apple").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["query"], "apple");
        assert_eq!(body["data"]["results"][0]["ticker"], "AAPL");
        assert_eq!(
            body["data"]["total"].as_u64().unwrap() as usize,
            body["data"]["results"].as_array().unwrap().len()
        );
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let (status, body) = get_json(mock_router(), "/api/search?q=%20%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "query parameter 'q' is required");

        let (status, _) = get_json(mock_router(), "/api/search").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let (status, body) = get_json(mock_router(), "/api/search?q=o&limit=1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["results"].as_array().unwrap().len(), 1);
    }
}
