//! Request extractors

use crate::error::AppError;
use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::Json;
use pactum_core::{PartyId, CALLER_HEADER};

/// Party making the request, as asserted by the upstream authenticator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub PartyId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or(AppError::MissingCaller)?;

        let raw = value
            .to_str()
            .map_err(|_| AppError::InvalidIdentity("caller header is not valid text".into()))?;

        Ok(Caller(PartyId::parse(raw)?))
    }
}

/// Unwrap a JSON body, reporting parse failures as 422
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}
