use analysis_core::{FigiMapping, IdentifierProvider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{build_http_client, read_json, ProviderConfig};

const BASE_URL: &str = "https://api.openfigi.com/v3";
const PROVIDER: &str = "OpenFIGI";

#[derive(Clone)]
pub struct OpenFigiClient {
    client: Client,
}

impl OpenFigiClient {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: build_http_client(config),
        }
    }
}

#[async_trait]
impl IdentifierProvider for OpenFigiClient {
    async fn map_ticker(&self, ticker: &str) -> Result<FigiMapping, ProviderError> {
        let body = [MappingRequest {
            id_type: "TICKER",
            id_value: ticker.to_uppercase(),
        }];
        let response = self
            .client
            .post(format!("{}/mapping", BASE_URL))
            .json(&body)
            .send()
            .await;
        let jobs: Vec<MappingResponse> = read_json(PROVIDER, "mapping", response).await?;
        mapping_from_response(ticker, jobs)
    }
}

fn mapping_from_response(ticker: &str, jobs: Vec<MappingResponse>) -> Result<FigiMapping, ProviderError> {
    let job = match jobs.into_iter().next() {
        Some(job) => job,
        None => return Err(no_mapping(ticker)),
    };

    if let Some(error) = job.error.filter(|e| !e.is_empty()) {
        return Err(ProviderError::new(PROVIDER, error).with_code("API_ERROR"));
    }

    // First entry is usually the primary exchange listing
    job.data
        .into_iter()
        .next()
        .map(|d| FigiMapping {
            figi: d.figi,
            name: d.name.unwrap_or_default(),
        })
        .ok_or_else(|| no_mapping(ticker))
}

fn no_mapping(ticker: &str) -> ProviderError {
    ProviderError::new(PROVIDER, format!("no mapping found for ticker {}", ticker)).with_code("NO_MAPPING")
}

// OpenFIGI API types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MappingRequest {
    id_type: &'static str,
    id_value: String,
}

#[derive(Debug, Deserialize)]
struct MappingResponse {
    #[serde(default)]
    data: Vec<MappingData>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MappingData {
    figi: String,
    name: Option<String>,
}
