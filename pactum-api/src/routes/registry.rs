//! Registry routes, using the camelCase wire format of registry clients
//!
//! - `POST /register-contract`      index an escrow, returns `{link}`
//! - `GET  /contract/:address`      look up one entry
//! - `GET  /contracts/:account`     entries where the account is a party
//! - `POST /remove-contract`        drop an entry
//!
//! Writes require the caller to be a party to the entry. For escrows held by
//! this node the parties come from the escrow itself, not from the request.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use escrow_engine::registry::{
    ContractList, RegisterContractResponse, RegistryEntry, RemoveContractRequest,
};
use escrow_engine::EscrowError;
use pactum_core::{AccountId, PartyId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::extract::{json_body, Caller};
use crate::routes::escrow::parse_account_id;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register-contract", post(register_contract))
        .route("/contract/:address", get(get_contract))
        .route("/contracts/:account", get(list_contracts))
        .route("/remove-contract", post(remove_contract))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveContractResponse {
    pub removed: bool,
}

/// Reject writes to `id` by anyone but a party to it
async fn authorize(state: &AppState, id: AccountId, caller: &PartyId) -> Result<(), AppError> {
    match state.manager.get_account(id).await {
        Ok(account) => {
            if account.involves(caller) {
                Ok(())
            } else {
                Err(EscrowError::NotAParty {
                    caller: caller.clone(),
                    account: id,
                }
                .into())
            }
        }
        Err(EscrowError::AccountNotFound(_)) => match state.registry.lookup(id).await {
            Some(existing) if !existing.involves(caller) => Err(EscrowError::NotAParty {
                caller: caller.clone(),
                account: id,
            }
            .into()),
            _ => Ok(()),
        },
        Err(e) => Err(e.into()),
    }
}

async fn register_contract(
    State(state): State<AppState>,
    Caller(caller): Caller,
    body: Result<Json<RegistryEntry>, JsonRejection>,
) -> Result<Json<RegisterContractResponse>, AppError> {
    let entry = json_body(body)?;
    let id = entry.contract_address;

    if !entry.involves(&caller) {
        return Err(EscrowError::NotAParty {
            caller,
            account: id,
        }
        .into());
    }
    authorize(&state, id, &caller).await?;

    if let Ok(account) = state.manager.get_account(id).await {
        if account.settled {
            return Err(EscrowError::AlreadySettled(id).into());
        }
        if account.sender != entry.sender_address || account.receiver != entry.receiver_address {
            return Err(AppError::Forbidden(format!(
                "parties do not match escrow {}",
                id
            )));
        }
    }

    let link = state.contract_link(&entry.contract_address.to_string());

    info!("Registered contract {}", entry.contract_address);
    state.registry.insert(entry).await;

    Ok(Json(RegisterContractResponse { link }))
}

async fn get_contract(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<RegistryEntry>, AppError> {
    let id = parse_account_id(&address)?;

    state
        .registry
        .lookup(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("contract {}", id)))
}

async fn list_contracts(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> Result<Json<ContractList>, AppError> {
    let party = PartyId::parse(&account)?;
    let contracts = state.registry.list_for(&party).await;
    Ok(Json(ContractList { contracts }))
}

async fn remove_contract(
    State(state): State<AppState>,
    Caller(caller): Caller,
    body: Result<Json<RemoveContractRequest>, JsonRejection>,
) -> Result<Json<RemoveContractResponse>, AppError> {
    let request = json_body(body)?;
    authorize(&state, request.contract_address, &caller).await?;

    let removed = state.registry.remove(request.contract_address).await;

    info!(removed, "Removed contract {}", request.contract_address);

    Ok(Json(RemoveContractResponse { removed }))
}
