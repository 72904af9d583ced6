use axum::{http::StatusCode, response::IntoResponse, Json};

use super::export::ExportError;
use super::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ReportsError {
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReportsError {
    /// Stable discriminator sent to clients so "no data" and "render failed" can be
    /// told apart without parsing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidFilter(_) | Self::InvalidRequest(_) => "invalid_request",
            Self::Store(_) => "store",
            Self::Export(_) => "export",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ReportsError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Self::InvalidFilter(_) | Self::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::Store(e) => {
                log::error!("Report query failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Self::Export(e) => {
                log::error!("Report rendering failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to render report".to_string(),
                )
            }
            Self::Internal(e) => {
                log::error!("Report request failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (
            status,
            Json(serde_json::json!({ "error": message, "kind": self.kind() })),
        )
            .into_response()
    }
}
