//! Registry sync - discovery index for escrow metadata
//!
//! The registry maps an account id to its alias, description and parties so
//! participants can find their escrows. It is advisory only: the manager
//! never reads it for authorization and never lets a registry failure change
//! a custody outcome.
//!
//! Wire types use the registry's camelCase JSON (`contractAddress`,
//! `aliasName`, ...), shared by [`HttpRegistry`] and the API's registry routes.

use crate::models::AccountSnapshot;
use async_trait::async_trait;
use pactum_core::{AccountId, PartyId, CALLER_HEADER};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Registry sync errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Request could not be sent or the response could not be read
    #[error("Registry request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Registry answered with a non-success status
    #[error("Registry returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Result type alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// One indexed escrow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub contract_address: AccountId,
    pub alias_name: String,
    pub description: String,
    pub sender_address: PartyId,
    pub receiver_address: PartyId,
}

impl RegistryEntry {
    pub fn from_snapshot(snapshot: &AccountSnapshot) -> Self {
        Self {
            contract_address: snapshot.id,
            alias_name: snapshot.alias.clone(),
            description: snapshot.description.clone(),
            sender_address: snapshot.sender.clone(),
            receiver_address: snapshot.receiver.clone(),
        }
    }

    pub fn involves(&self, party: &PartyId) -> bool {
        &self.sender_address == party || &self.receiver_address == party
    }
}

/// Body of `POST /remove-contract`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveContractRequest {
    pub contract_address: AccountId,
}

/// Response of `POST /register-contract`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterContractResponse {
    pub link: String,
}

/// Response of `GET /contracts/:account`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractList {
    pub contracts: Vec<RegistryEntry>,
}

/// Outbound sync used by the escrow manager
#[async_trait]
pub trait RegistrySync: Send + Sync {
    /// Index a newly created escrow on behalf of its sender
    async fn register(&self, entry: RegistryEntry) -> RegistryResult<()>;

    /// Drop an escrow from the index on behalf of `actor`, one of its parties.
    /// Removing an unknown id is not an error.
    async fn deregister(&self, id: AccountId, actor: &PartyId) -> RegistryResult<()>;
}

/// In-process registry
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    entries: RwLock<HashMap<AccountId, RegistryEntry>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry
    pub async fn insert(&self, entry: RegistryEntry) {
        self.entries
            .write()
            .await
            .insert(entry.contract_address, entry);
    }

    pub async fn lookup(&self, id: AccountId) -> Option<RegistryEntry> {
        self.entries.read().await.get(&id).cloned()
    }

    /// Entries where `party` is sender or receiver, oldest id first
    pub async fn list_for(&self, party: &PartyId) -> Vec<RegistryEntry> {
        let mut entries: Vec<RegistryEntry> = self
            .entries
            .read()
            .await
            .values()
            .filter(|entry| entry.involves(party))
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.contract_address);
        entries
    }

    /// Remove an entry, reporting whether it existed
    pub async fn remove(&self, id: AccountId) -> bool {
        self.entries.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl RegistrySync for InMemoryRegistry {
    async fn register(&self, entry: RegistryEntry) -> RegistryResult<()> {
        debug!(id = %entry.contract_address, "indexing escrow");
        self.insert(entry).await;
        Ok(())
    }

    async fn deregister(&self, id: AccountId, actor: &PartyId) -> RegistryResult<()> {
        let existed = self.remove(id).await;
        debug!(%id, %actor, existed, "de-indexing escrow");
        Ok(())
    }
}

/// Client for a registry service reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRegistry {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> RegistryResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        info!("Using remote registry at {}", base_url);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        caller: &PartyId,
        body: &T,
    ) -> RegistryResult<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header(CALLER_HEADER, caller.as_str())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    /// Register and return the shareable link reported by the registry
    pub async fn register_with_link(&self, entry: &RegistryEntry) -> RegistryResult<String> {
        let response = self
            .post("/register-contract", &entry.sender_address, entry)
            .await?;
        let body: RegisterContractResponse = response.json().await?;
        Ok(body.link)
    }

    /// Fetch one entry; `None` when the registry does not know the id
    pub async fn lookup(&self, id: AccountId) -> RegistryResult<Option<RegistryEntry>> {
        let response = self
            .client
            .get(format!("{}/contract/{}", self.base_url, id))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Some(response.json().await?))
    }
}

#[async_trait]
impl RegistrySync for HttpRegistry {
    async fn register(&self, entry: RegistryEntry) -> RegistryResult<()> {
        self.post("/register-contract", &entry.sender_address, &entry)
            .await?;
        Ok(())
    }

    async fn deregister(&self, id: AccountId, actor: &PartyId) -> RegistryResult<()> {
        self.post(
            "/remove-contract",
            actor,
            &RemoveContractRequest {
                contract_address: id,
            },
        )
        .await?;
        Ok(())
    }
}
