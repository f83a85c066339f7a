//! API error type
//!
//! Maps escrow and identity errors to HTTP status codes with a JSON body of
//! the form `{"error": {"code", "message"}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use escrow_engine::EscrowError;
use pactum_core::CoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured JSON error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "ALREADY_SETTLED")
    pub code: String,
    pub message: String,
}

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Escrow operation rejected
    #[error(transparent)]
    Escrow(#[from] EscrowError),

    /// No `x-caller-identity` header on a request that needs one (401)
    #[error("missing caller identity")]
    MissingCaller,

    /// Party or account identifier failed to parse (422)
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Request body could not be parsed (422)
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller may not perform this write (403)
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Ledger issuance is switched off (403)
    #[error("minting is disabled")]
    MintDisabled,
}

impl AppError {
    /// HTTP status and machine-readable code
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Escrow(err) => (escrow_status(err), err.code()),
            Self::MissingCaller => (StatusCode::UNAUTHORIZED, "MISSING_CALLER"),
            Self::InvalidIdentity(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_IDENTITY"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::MintDisabled => (StatusCode::FORBIDDEN, "MINT_DISABLED"),
        }
    }
}

fn escrow_status(err: &EscrowError) -> StatusCode {
    match err {
        EscrowError::AccountNotFound(_) => StatusCode::NOT_FOUND,
        EscrowError::Unauthorized { .. } | EscrowError::NotAParty { .. } => StatusCode::FORBIDDEN,
        EscrowError::AlreadyApproved(_)
        | EscrowError::AlreadySettled(_)
        | EscrowError::BothApproved(_)
        | EscrowError::StateTransition { .. } => StatusCode::CONFLICT,
        EscrowError::InvalidDeposit { .. }
        | EscrowError::ZeroAmount(_)
        | EscrowError::SelfDealing(_)
        | EscrowError::InvalidAmount(_)
        | EscrowError::InsufficientFunds { .. }
        | EscrowError::BalanceOverflow => StatusCode::UNPROCESSABLE_ENTITY,
        EscrowError::Registry(_) => StatusCode::BAD_GATEWAY,
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self::InvalidIdentity(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status == StatusCode::BAD_GATEWAY {
            tracing::warn!(error = %self, "registry request failed");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}
