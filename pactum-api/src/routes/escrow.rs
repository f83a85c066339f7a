//! Escrow lifecycle routes
//!
//! - `POST /v1/escrows`                        create, caller is the sender
//! - `GET  /v1/escrows/:id`                    snapshot
//! - `GET  /v1/escrows/:id/events`             audit trail
//! - `POST /v1/escrows/:id/approve/sender`     sender approval
//! - `POST /v1/escrows/:id/approve/receiver`   receiver approval
//! - `POST /v1/escrows/:id/refund`             sender refund
//! - `POST /v1/escrows/:id/delist`             remove from the registry
//! - `GET  /v1/parties/:party/escrows`         escrows involving a party

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use escrow_engine::{AccountSnapshot, ApprovalOutcome, CreateEscrowRequest, EscrowEvent};
use pactum_core::{AccountId, PartyId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extract::{json_body, Caller};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/escrows", post(create_escrow))
        .route("/v1/escrows/:id", get(get_escrow))
        .route("/v1/escrows/:id/events", get(list_events))
        .route("/v1/escrows/:id/approve/sender", post(approve_as_sender))
        .route("/v1/escrows/:id/approve/receiver", post(approve_as_receiver))
        .route("/v1/escrows/:id/refund", post(refund))
        .route("/v1/escrows/:id/delist", post(delist))
        .route("/v1/parties/:party/escrows", get(list_for_party))
}

/// Body of `POST /v1/escrows`
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEscrowBody {
    pub receiver: PartyId,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub description: String,
    pub amount: Decimal,
    /// Value attached to the call; must equal `amount`
    pub deposit: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DelistResponse {
    pub id: AccountId,
    pub delisted: bool,
}

pub(crate) fn parse_account_id(raw: &str) -> Result<AccountId, AppError> {
    raw.parse()
        .map_err(|_| AppError::InvalidIdentity(format!("not an escrow id: {}", raw)))
}

async fn create_escrow(
    State(state): State<AppState>,
    Caller(sender): Caller,
    body: Result<Json<CreateEscrowBody>, JsonRejection>,
) -> Result<(StatusCode, Json<AccountSnapshot>), AppError> {
    let body = json_body(body)?;

    let snapshot = state
        .manager
        .create_escrow(CreateEscrowRequest {
            sender,
            receiver: body.receiver,
            alias: body.alias,
            description: body.description,
            amount: body.amount,
            deposit: body.deposit,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn get_escrow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AccountSnapshot>, AppError> {
    let id = parse_account_id(&id)?;
    Ok(Json(state.manager.get_account(id).await?))
}

async fn list_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EscrowEvent>>, AppError> {
    let id = parse_account_id(&id)?;
    Ok(Json(state.manager.events_for(id).await?))
}

async fn approve_as_sender(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<Json<ApprovalOutcome>, AppError> {
    let id = parse_account_id(&id)?;
    Ok(Json(state.manager.approve_as_sender(id, &caller).await?))
}

async fn approve_as_receiver(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<Json<ApprovalOutcome>, AppError> {
    let id = parse_account_id(&id)?;
    Ok(Json(state.manager.approve_as_receiver(id, &caller).await?))
}

async fn refund(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<Json<AccountSnapshot>, AppError> {
    let id = parse_account_id(&id)?;
    Ok(Json(state.manager.refund(id, &caller).await?))
}

async fn delist(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<Json<DelistResponse>, AppError> {
    let id = parse_account_id(&id)?;
    state.manager.delist(id, &caller).await?;
    Ok(Json(DelistResponse { id, delisted: true }))
}

async fn list_for_party(
    State(state): State<AppState>,
    Path(party): Path<String>,
) -> Result<Json<Vec<AccountSnapshot>>, AppError> {
    let party = PartyId::parse(&party)?;
    Ok(Json(state.manager.accounts_for(&party).await))
}
