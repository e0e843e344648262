//! Chain Wallet Engine - the collaborator that talks to the chain
//!
//! Connectivity, UTXO indexing and signing live behind [`ChainEngine`]. The
//! reconciler only sees the raw records defined here.
//!
//! # Architecture
//!
//! ```text
//! WalletDescriptorSet ──build_wallet──→ WalletHandle<E>
//!                                           │
//! NetworkEndpoint ──connect──→ E::Connection│
//!                                   │       │
//!                                   └─sync──┴─→ balance / list_transactions / list_utxos
//! ```
//!
//! With the `electrum` feature, [`BdkEngine`] implements the trait on top of
//! an in-memory BDK wallet and an Electrum client.

#[cfg(feature = "electrum")]
mod bdk;

#[cfg(feature = "electrum")]
pub use bdk::{install_crypto_provider, BdkEngine, BdkWalletCell, ElectrumConnection};

use crate::descriptor::{self, Seed, WalletDescriptorSet};
use crate::error::{ErrorKind, Result};
use crate::types::{AddressType, Network};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Wallet construction failed: {0}")]
    Build(String),

    #[error("Sync failed: {0}")]
    Sync(String),

    #[error("Wallet query failed: {0}")]
    Query(String),

    #[error("Engine task failed: {0}")]
    Task(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Connection(_) => ErrorKind::Connectivity,
            _ => ErrorKind::Engine,
        }
    }
}

/// Indexing server for one network. Picking mainnet vs testnet is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEndpoint {
    pub network: Network,
    pub url: String,
}

impl NetworkEndpoint {
    pub fn new(network: Network, url: impl Into<String>) -> Self { Self { network, url: url.into() } }
}

/// Per-call connection parameters handed to the engine.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub network: Network,
    pub url: String,
    pub timeout_secs: u8,
    pub retry: u8,
    pub stop_gap: usize,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationTime {
    pub height: u32,
    pub timestamp: u64,
}

/// Transaction as the engine reports it, relative to the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub txid: String,
    pub received: u64,
    pub sent: u64,
    pub fee: Option<u64>,
    pub confirmation: Option<ConfirmationTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUtxo {
    pub txid: String,
    pub vout: u32,
    pub amount_sat: u64,
    pub address: Option<String>,
    pub is_change: bool,
}

#[async_trait]
pub trait ChainEngine: Send + Sync {
    type Connection: Send + Sync;
    type Wallet: Send + Sync;

    async fn connect(&self, params: &ConnectParams) -> std::result::Result<Self::Connection, EngineError>;

    /// In-memory wallet for a descriptor pair.
    fn build_wallet(&self, descriptors: &WalletDescriptorSet) -> std::result::Result<Self::Wallet, EngineError>;

    /// Empty wallet used when no secret is available.
    fn placeholder_wallet(&self, network: Network) -> Self::Wallet;

    /// Returns the engine's health signal: `false` means the scan did not complete.
    async fn sync(&self, wallet: &Self::Wallet, connection: &Self::Connection) -> std::result::Result<bool, EngineError>;

    async fn balance(&self, wallet: &Self::Wallet) -> std::result::Result<u64, EngineError>;

    async fn list_transactions(&self, wallet: &Self::Wallet) -> std::result::Result<Vec<RawTransaction>, EngineError>;

    async fn list_utxos(&self, wallet: &Self::Wallet) -> std::result::Result<Vec<RawUtxo>, EngineError>;
}

/// Engine wallet plus the metadata the reconciler needs.
pub struct WalletHandle<E: ChainEngine> {
    wallet: E::Wallet,
    network: Network,
    address_type: Option<AddressType>,
    watch_only: bool,
    placeholder: bool,
}

impl<E: ChainEngine> WalletHandle<E> {
    /// Seed-backed wallet: derive descriptors, then build.
    pub fn from_secret(engine: &E, seed: &Seed, address_type: AddressType, network: Network) -> Result<Self> {
        let descriptors = descriptor::derive(seed, address_type, network)?;
        Ok(Self::from_descriptors(engine, &descriptors)?)
    }

    /// Wallet without a secret. Derivation is skipped and the engine hands
    /// back an empty placeholder.
    pub fn watch_only(engine: &E, network: Network) -> Self {
        tracing::info!(network = %network, "no secret available, using placeholder wallet");
        Self { wallet: engine.placeholder_wallet(network), network, address_type: None, watch_only: true, placeholder: true }
    }

    pub fn from_descriptors(engine: &E, descriptors: &WalletDescriptorSet) -> std::result::Result<Self, EngineError> {
        Ok(Self {
            wallet: engine.build_wallet(descriptors)?,
            network: descriptors.network(),
            address_type: Some(descriptors.address_type()),
            watch_only: descriptors.is_watch_only(),
            placeholder: false,
        })
    }

    pub fn wallet(&self) -> &E::Wallet { &self.wallet }
    pub fn network(&self) -> Network { self.network }
    pub fn address_type(&self) -> Option<AddressType> { self.address_type }
    pub fn is_watch_only(&self) -> bool { self.watch_only }
    pub fn is_placeholder(&self) -> bool { self.placeholder }
}
