use serde_json::json;
use thiserror::Error;

pub const NO_IMAGE_DATA: &str = "No image data provided";
pub const ANALYSIS_FAILED_DETAILS: &str = "AI analysis failed";

/// Terminal failure of an analyze-video request.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Client-caused; the request is missing required input.
    #[error("{0}")]
    Validation(String),
    /// Any fault while parsing or processing the request.
    #[error("{0}")]
    Internal(String),
    #[error("not_found")]
    NotFound,
    #[error("method_not_allowed")]
    MethodNotAllowed,
    #[error("payload_too_large")]
    PayloadTooLarge,
}

impl AnalysisError {
    pub fn missing_image() -> Self {
        Self::Validation(NO_IMAGE_DATA.to_string())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::PayloadTooLarge => 413,
            Self::Internal(_) => 500,
        }
    }

    /// JSON error envelope written to the client.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Internal(message) => json!({
                "error": message,
                "details": ANALYSIS_FAILED_DETAILS,
            }),
            other => json!({ "error": other.to_string() }),
        }
    }
}

impl From<anyhow::Error> for AnalysisError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
