//! BDK - Chain engine over bdk_wallet 2.x (in-memory) and bdk_electrum.
//!
//! BDK and the Electrum client are blocking; every call runs on
//! `spawn_blocking` so the reconciler stays async.

use super::{ChainEngine, ConfirmationTime, ConnectParams, EngineError, RawTransaction, RawUtxo};
use crate::descriptor::WalletDescriptorSet;
use crate::types::Network;
use async_trait::async_trait;
use bdk_electrum::{
    electrum_client::{Client, ConfigBuilder},
    BdkElectrumClient,
};
use bdk_wallet::{bitcoin::Address, chain::ChainPosition, KeychainKind, Wallet};
use std::sync::{Arc, Mutex, Once};

static CRYPTO_INIT: Once = Once::new();

/// rustls needs a process-wide provider before the first TLS handshake.
pub fn install_crypto_provider() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Connected Electrum client plus the scan settings it was opened with.
pub struct ElectrumConnection {
    client: Arc<BdkElectrumClient<Client>>,
    url: String,
    stop_gap: usize,
    batch_size: usize,
}

impl ElectrumConnection {
    pub fn url(&self) -> &str { &self.url }
}

/// In-memory BDK wallet. `None` is the placeholder for secret-less wallets.
pub struct BdkWalletCell {
    inner: Option<Arc<Mutex<Wallet>>>,
    network: bdk_wallet::bitcoin::Network,
}

impl BdkWalletCell {
    fn locked(&self) -> Option<Result<std::sync::MutexGuard<'_, Wallet>, EngineError>> {
        self.inner.as_ref().map(|w| w.lock().map_err(|_| EngineError::Query("lock".into())))
    }

    /// Next unused receive address, if this is a real wallet.
    pub fn receive_address(&self) -> Result<Option<String>, EngineError> {
        match self.inner.as_ref() {
            None => Ok(None),
            Some(w) => {
                let mut wallet = w.lock().map_err(|_| EngineError::Query("lock".into()))?;
                Ok(Some(wallet.next_unused_address(KeychainKind::External).address.to_string()))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BdkEngine;

impl BdkEngine {
    pub fn new() -> Self {
        install_crypto_provider();
        Self
    }
}

#[async_trait]
impl ChainEngine for BdkEngine {
    type Connection = ElectrumConnection;
    type Wallet = BdkWalletCell;

    async fn connect(&self, params: &ConnectParams) -> Result<ElectrumConnection, EngineError> {
        let params = params.clone();
        tokio::task::spawn_blocking(move || -> Result<ElectrumConnection, EngineError> {
            let config = ConfigBuilder::new()
                .timeout(Some(params.timeout_secs))
                .retry(params.retry)
                .build();
            let client = Client::from_config(&params.url, config)
                .map_err(|e| EngineError::Connection(format!("Electrum {}: {}", params.url, e)))?;
            Ok(ElectrumConnection {
                client: Arc::new(BdkElectrumClient::new(client)),
                url: params.url,
                stop_gap: params.stop_gap,
                batch_size: params.batch_size,
            })
        })
        .await
        .map_err(|e| EngineError::Task(e.to_string()))?
    }

    fn build_wallet(&self, descriptors: &WalletDescriptorSet) -> Result<BdkWalletCell, EngineError> {
        let network = descriptors.network().to_bitcoin();
        let wallet = Wallet::create(descriptors.external().to_string(), descriptors.internal().to_string())
            .network(network)
            .create_wallet_no_persist()
            .map_err(|e| EngineError::Build(e.to_string()))?;
        Ok(BdkWalletCell { inner: Some(Arc::new(Mutex::new(wallet))), network })
    }

    fn placeholder_wallet(&self, network: Network) -> BdkWalletCell {
        BdkWalletCell { inner: None, network: network.to_bitcoin() }
    }

    async fn sync(&self, wallet: &BdkWalletCell, connection: &ElectrumConnection) -> Result<bool, EngineError> {
        let Some(inner) = wallet.inner.clone() else { return Ok(true) };
        let client = connection.client.clone();
        let (stop_gap, batch_size) = (connection.stop_gap, connection.batch_size);

        tokio::task::spawn_blocking(move || -> Result<bool, EngineError> {
            let mut wallet = inner.lock().map_err(|_| EngineError::Sync("lock".into()))?;
            let request = wallet.start_full_scan();
            let update = match client.full_scan(request, stop_gap, batch_size, false) {
                Ok(update) => update,
                Err(e) => {
                    tracing::warn!(error = %e, "electrum full scan failed");
                    return Ok(false);
                }
            };
            wallet.apply_update(update).map_err(|e| EngineError::Sync(format!("Apply: {}", e)))?;
            Ok(true)
        })
        .await
        .map_err(|e| EngineError::Task(e.to_string()))?
    }

    async fn balance(&self, wallet: &BdkWalletCell) -> Result<u64, EngineError> {
        match wallet.locked() {
            None => Ok(0),
            Some(w) => Ok(w?.balance().total().to_sat()),
        }
    }

    async fn list_transactions(&self, wallet: &BdkWalletCell) -> Result<Vec<RawTransaction>, EngineError> {
        let Some(w) = wallet.locked() else { return Ok(vec![]) };
        let w = w?;
        Ok(w.transactions().map(|tx| {
            let confirmation = match tx.chain_position {
                ChainPosition::Confirmed { anchor, .. } => Some(ConfirmationTime {
                    height: anchor.block_id.height,
                    timestamp: anchor.confirmation_time,
                }),
                ChainPosition::Unconfirmed { .. } => None,
            };
            let (sent, received) = w.sent_and_received(&tx.tx_node.tx);
            RawTransaction {
                txid: tx.tx_node.txid.to_string(),
                received: received.to_sat(),
                sent: sent.to_sat(),
                fee: w.calculate_fee(&tx.tx_node.tx).ok().map(|f| f.to_sat()),
                confirmation,
            }
        }).collect())
    }

    async fn list_utxos(&self, wallet: &BdkWalletCell) -> Result<Vec<RawUtxo>, EngineError> {
        let Some(w) = wallet.locked() else { return Ok(vec![]) };
        let w = w?;
        Ok(w.list_unspent().map(|utxo| {
            let address = Address::from_script(&utxo.txout.script_pubkey, wallet.network)
                .ok()
                .map(|a| a.to_string());
            RawUtxo {
                txid: utxo.outpoint.txid.to_string(),
                vout: utxo.outpoint.vout,
                amount_sat: utxo.txout.value.to_sat(),
                address,
                is_change: utxo.keychain == KeychainKind::Internal,
            }
        }).collect())
    }
}
