use thiserror::Error;

/// Failure of a single external provider call.
///
/// Always recoverable at the aggregation boundary: the caller continues with
/// reduced data and turns this into a warning.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{provider}: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub message: String,
    pub code: Option<String>,
}

impl ProviderError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{source_name}: CIK not found for ticker {ticker}")]
    NotFound { ticker: String, source_name: String },

    #[error("Insufficient data: {0}")]
    Precondition(String),

    #[error("Invalid assumptions: {0}")]
    InvalidAssumptions(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AnalysisError {
    /// True for errors the caller can fix by changing the request.
    pub fn is_caller_correctable(&self) -> bool {
        matches!(
            self,
            AnalysisError::Precondition(_)
                | AnalysisError::InvalidAssumptions(_)
                | AnalysisError::NotFound { .. }
        )
    }
}
