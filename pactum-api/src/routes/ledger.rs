//! Ledger routes
//!
//! - `GET  /v1/balances/:party`   balance of a party
//! - `GET  /v1/ledger`            supply and custody totals
//! - `POST /v1/ledger/mint`       issue value (only with `ledger.allow_mint`)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use escrow_engine::LedgerTotals;
use pactum_core::PartyId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extract::json_body;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/balances/:party", get(get_balance))
        .route("/v1/ledger", get(get_totals))
        .route("/v1/ledger/mint", post(mint))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub party: PartyId,
    pub balance: Decimal,
}

/// Body of `POST /v1/ledger/mint`
#[derive(Debug, Serialize, Deserialize)]
pub struct MintBody {
    pub party: PartyId,
    pub amount: Decimal,
}

async fn get_balance(
    State(state): State<AppState>,
    Path(party): Path<String>,
) -> Result<Json<BalanceResponse>, AppError> {
    let party = PartyId::parse(&party)?;
    let balance = state.manager.balance_of(&party).await;
    Ok(Json(BalanceResponse { party, balance }))
}

async fn get_totals(State(state): State<AppState>) -> Json<LedgerTotals> {
    Json(state.manager.ledger_totals().await)
}

async fn mint(
    State(state): State<AppState>,
    body: Result<Json<MintBody>, JsonRejection>,
) -> Result<Json<BalanceResponse>, AppError> {
    if !state.settings.ledger.allow_mint {
        return Err(AppError::MintDisabled);
    }

    let body = json_body(body)?;
    let balance = state.manager.mint(&body.party, body.amount).await?;

    Ok(Json(BalanceResponse {
        party: body.party,
        balance,
    }))
}
