//! ABOUTME: Control-plane RPC error kinds, matching the worker's error taxonomy

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("worker `{id}` not found")]
    NotFound { id: String },

    #[error("worker `{id}` unreachable: {message}")]
    BadGateway { id: String, message: String },

    #[error("unauthenticated")]
    Unauthenticated,
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = match &self {
            RpcError::NotFound { .. } => StatusCode::NOT_FOUND,
            RpcError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            RpcError::Unauthenticated => StatusCode::UNAUTHORIZED,
        };
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
