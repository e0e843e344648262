//! Wallet Sync Reconciler
//!
//! One sync attempt walks:
//!
//! ```text
//! Connecting ──→ Connected ──→ Syncing ──→ Reconciling ──→ Done
//!     │
//!     └──→ Failed (ConnectionError, surfaced to caller, no retry here)
//! ```
//!
//! The cached state is only replaced when the freshly computed balance differs
//! from the cached one. Transactions and UTXOs are then refetched and swapped
//! in whole. An equal balance returns the cache untouched, even if the
//! transaction set moved (self-transfers, offsetting unconfirmed spends).
//! `SyncConfig::force_full_refresh` opts out of that.
//!
//! The reconciler never mutates the caller's cache: it returns a new
//! [`WalletSyncState`], so an abandoned or failed attempt leaves nothing
//! half-written.

mod locks;

pub use locks::WalletLocks;

use crate::config::SyncConfig;
use crate::engine::{ChainEngine, ConnectParams, EngineError, NetworkEndpoint, RawTransaction, RawUtxo, WalletHandle};
use crate::error::ErrorKind;
use crate::types::Network;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction { Inbound, Outbound }

/// Canonical transaction record kept in the wallet cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub txid: String,
    pub confirmed: bool,
    pub block_height: Option<u32>,
    pub timestamp: Option<u64>,
    pub fee: Option<u64>,
    pub value: u64,
    pub direction: Direction,
    pub network: Network,
}

impl TransactionRecord {
    /// Inbound iff the engine saw a nonzero received amount.
    pub fn from_raw(raw: &RawTransaction, network: Network) -> Self {
        let inbound = raw.received != 0;
        Self {
            txid: raw.txid.clone(),
            confirmed: raw.confirmation.is_some(),
            block_height: raw.confirmation.map(|c| c.height),
            timestamp: raw.confirmation.map(|c| c.timestamp),
            fee: raw.fee,
            value: if inbound { raw.received } else { raw.sent },
            direction: if inbound { Direction::Inbound } else { Direction::Outbound },
            network,
        }
    }
}

/// Most recent first: unconfirmed, then by height, then by timestamp.
fn by_recency(a: &TransactionRecord, b: &TransactionRecord) -> Ordering {
    a.confirmed
        .cmp(&b.confirmed)
        .then_with(|| b.block_height.cmp(&a.block_height))
        .then_with(|| b.timestamp.cmp(&a.timestamp))
        .then_with(|| a.txid.cmp(&b.txid))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub amount_sat: u64,
    pub address: Option<String>,
    pub is_change: bool,
}

impl Utxo {
    pub fn outpoint(&self) -> String { format!("{}:{}", self.txid, self.vout) }
}

impl From<&RawUtxo> for Utxo {
    fn from(raw: &RawUtxo) -> Self {
        Self { txid: raw.txid.clone(), vout: raw.vout, amount_sat: raw.amount_sat, address: raw.address.clone(), is_change: raw.is_change }
    }
}

/// Cached view of one wallet. Persisting it is the caller's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSyncState {
    pub balance: u64,
    pub transactions: Vec<TransactionRecord>,
    pub utxos: Vec<Utxo>,
    pub last_sync_updated: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WalletSyncState {
    pub fn utxo_total(&self) -> u64 { self.utxos.iter().map(|u| u.amount_sat).sum() }

    fn unchanged(&self) -> Self {
        Self { last_sync_updated: false, ..self.clone() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase { Connecting, Connected, Syncing, Reconciling, Done, Failed }

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Connecting => "connecting",
            SyncPhase::Connected => "connected",
            SyncPhase::Syncing => "syncing",
            SyncPhase::Reconciling => "reconciling",
            SyncPhase::Done => "done",
            SyncPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Balance changed; transactions and UTXOs were replaced.
    Updated,
    /// Balance matched the cache; nothing was refetched.
    Unchanged,
    /// Engine reported an incomplete scan; the cache was kept.
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub state: WalletSyncState,
    pub status: SyncStatus,
    pub warning: Option<String>,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Could not connect to {endpoint}: {source}")]
    Connection { endpoint: String, source: EngineError },

    #[error("Endpoint {endpoint} serves {endpoint_network}, wallet is on {wallet_network}")]
    NetworkMismatch { endpoint: String, endpoint_network: Network, wallet_network: Network },

    #[error("Engine failure while {phase}: {source}")]
    Engine { phase: SyncPhase, source: EngineError },
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Connection { .. } => ErrorKind::Connectivity,
            SyncError::NetworkMismatch { .. } => ErrorKind::Compatibility,
            SyncError::Engine { .. } => ErrorKind::Engine,
        }
    }
}

/// Drives connect → sync → diff → update for one wallet at a time.
///
/// Stateless across calls; serializing syncs of the same wallet is up to the
/// caller (see [`WalletLocks`]).
pub struct Reconciler<E: ChainEngine> {
    engine: Arc<E>,
    config: SyncConfig,
}

impl<E: ChainEngine> Reconciler<E> {
    pub fn new(engine: Arc<E>, config: SyncConfig) -> Self { Self { engine, config } }

    pub fn engine(&self) -> &E { &self.engine }

    pub async fn sync(
        &self,
        wallet: &WalletHandle<E>,
        endpoint: &NetworkEndpoint,
        cached: &WalletSyncState,
    ) -> Result<SyncReport, SyncError> {
        if endpoint.network != wallet.network() {
            return Err(SyncError::NetworkMismatch {
                endpoint: endpoint.url.clone(),
                endpoint_network: endpoint.network,
                wallet_network: wallet.network(),
            });
        }

        debug!(phase = %SyncPhase::Connecting, endpoint = %endpoint.url, "sync");
        let params = ConnectParams {
            network: endpoint.network,
            url: endpoint.url.clone(),
            timeout_secs: self.config.timeout_secs,
            retry: self.config.retry,
            stop_gap: self.config.stop_gap,
            batch_size: self.config.batch_size,
        };
        let connection = match self.engine.connect(&params).await {
            Ok(c) => c,
            Err(source) => {
                warn!(phase = %SyncPhase::Failed, endpoint = %endpoint.url, error = %source, "failed to connect");
                return Err(SyncError::Connection { endpoint: endpoint.url.clone(), source });
            }
        };
        debug!(phase = %SyncPhase::Connected, endpoint = %endpoint.url, "sync");

        debug!(phase = %SyncPhase::Syncing, "sync");
        let healthy = self
            .engine
            .sync(wallet.wallet(), &connection)
            .await
            .map_err(|source| SyncError::Engine { phase: SyncPhase::Syncing, source })?;
        if !healthy {
            let warning = format!("Could not sync wallet with {}", endpoint.url);
            warn!(endpoint = %endpoint.url, "engine reported an incomplete sync, keeping cached state");
            return Ok(SyncReport { state: cached.unchanged(), status: SyncStatus::Unhealthy, warning: Some(warning) });
        }

        debug!(phase = %SyncPhase::Reconciling, "sync");
        let engine_err = |source| SyncError::Engine { phase: SyncPhase::Reconciling, source };
        let balance = self.engine.balance(wallet.wallet()).await.map_err(engine_err)?;

        if balance == cached.balance && !self.config.force_full_refresh {
            debug!(phase = %SyncPhase::Done, balance, "balance unchanged");
            return Ok(SyncReport { state: cached.unchanged(), status: SyncStatus::Unchanged, warning: None });
        }

        let raw_txs = self.engine.list_transactions(wallet.wallet()).await.map_err(engine_err)?;
        let raw_utxos = self.engine.list_utxos(wallet.wallet()).await.map_err(engine_err)?;
        let fresh = reconcile(balance, &raw_txs, &raw_utxos, wallet.network());

        let changed = fresh.balance != cached.balance
            || fresh.transactions != cached.transactions
            || fresh.utxos != cached.utxos;
        let state = if changed {
            WalletSyncState { last_sync_updated: true, updated_at: Some(Utc::now()), ..fresh }
        } else {
            cached.unchanged()
        };
        let status = if changed { SyncStatus::Updated } else { SyncStatus::Unchanged };

        info!(
            phase = %SyncPhase::Done,
            previous = cached.balance,
            balance,
            transactions = state.transactions.len(),
            utxos = state.utxos.len(),
            updated = changed,
            "wallet reconciled"
        );
        Ok(SyncReport { state, status, warning: None })
    }
}

/// Build the replacement cache from raw engine output.
pub fn reconcile(balance: u64, raw_txs: &[RawTransaction], raw_utxos: &[RawUtxo], network: Network) -> WalletSyncState {
    let mut transactions: Vec<TransactionRecord> =
        raw_txs.iter().map(|tx| TransactionRecord::from_raw(tx, network)).collect();
    transactions.sort_by(by_recency);

    let utxos: BTreeMap<(String, u32), Utxo> =
        raw_utxos.iter().map(|u| ((u.txid.clone(), u.vout), Utxo::from(u))).collect();

    WalletSyncState {
        balance,
        transactions,
        utxos: utxos.into_values().collect(),
        last_sync_updated: false,
        updated_at: None,
    }
}
