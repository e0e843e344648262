//! Core configuration - passed into each call, never read from globals.

use crate::engine::NetworkEndpoint;
use crate::types::Network;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletMode {
    /// Only one wallet is shown; routing also enforces wallet-type rules.
    Single,
    #[default]
    Multi,
}

impl WalletMode {
    pub fn as_str(&self) -> &'static str {
        match self { WalletMode::Single => "single", WalletMode::Multi => "multi" }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "single" => Some(WalletMode::Single),
            "multi" | "multiple" => Some(WalletMode::Multi),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectrumEndpoints {
    pub bitcoin: String,
    pub testnet: String,
}

impl Default for ElectrumEndpoints {
    fn default() -> Self {
        Self {
            bitcoin: "ssl://electrum.blockstream.info:50002".into(),
            testnet: "ssl://electrum.blockstream.info:60002".into(),
        }
    }
}

/// Per-call engine settings. Retries happen inside the engine only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub timeout_secs: u8,
    pub retry: u8,
    pub stop_gap: usize,
    pub batch_size: usize,
    /// Refetch transactions and UTXOs even when the balance is unchanged.
    pub force_full_refresh: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { timeout_secs: 5, retry: 5, stop_gap: 5, batch_size: 10, force_full_refresh: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub electrum: ElectrumEndpoints,
    pub sync: SyncConfig,
    pub wallet_mode: WalletMode,
    pub language: String,
    pub fiat_currency: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            electrum: ElectrumEndpoints::default(),
            sync: SyncConfig::default(),
            wallet_mode: WalletMode::default(),
            language: "en".into(),
            fiat_currency: "USD".into(),
        }
    }
}

impl CoreConfig {
    pub fn new() -> Self { Self::default() }
    pub fn with_electrum(mut self, network: Network, url: impl Into<String>) -> Self {
        match network {
            Network::Bitcoin => self.electrum.bitcoin = url.into(),
            Network::Testnet => self.electrum.testnet = url.into(),
        }
        self
    }
    pub fn with_sync(mut self, sync: SyncConfig) -> Self { self.sync = sync; self }
    pub fn with_wallet_mode(mut self, mode: WalletMode) -> Self { self.wallet_mode = mode; self }
    pub fn single_wallet(self) -> Self { self.with_wallet_mode(WalletMode::Single) }
    pub fn force_full_refresh(mut self) -> Self { self.sync.force_full_refresh = true; self }

    pub fn is_single_wallet(&self) -> bool { self.wallet_mode == WalletMode::Single }

    /// Endpoint for a wallet's network.
    pub fn endpoint(&self, network: Network) -> NetworkEndpoint {
        let url = match network {
            Network::Bitcoin => &self.electrum.bitcoin,
            Network::Testnet => &self.electrum.testnet,
        };
        NetworkEndpoint::new(network, url.clone())
    }

    /// Overlay environment variables on the defaults.
    ///
    /// - `BEEWALLET_ELECTRUM_BITCOIN` / `BEEWALLET_ELECTRUM_TESTNET`: server URLs
    /// - `BEEWALLET_WALLET_MODE`: `single` or `multi`
    /// - `BEEWALLET_FORCE_FULL_REFRESH`: `1` to refetch on every sync
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("BEEWALLET_ELECTRUM_BITCOIN") {
            config.electrum.bitcoin = url;
        }
        if let Ok(url) = env::var("BEEWALLET_ELECTRUM_TESTNET") {
            config.electrum.testnet = url;
        }
        if let Ok(mode) = env::var("BEEWALLET_WALLET_MODE") {
            match WalletMode::from_str(&mode) {
                Some(m) => config.wallet_mode = m,
                None => tracing::warn!(mode = %mode, "unknown wallet mode, keeping {}", config.wallet_mode.as_str()),
            }
        }
        if env::var("BEEWALLET_FORCE_FULL_REFRESH").map(|v| v == "1").unwrap_or(false) {
            config.sync.force_full_refresh = true;
        }
        config
    }

    /// `<config dir>/beewallet/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("beewallet").join("config.json"))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.sync.timeout_secs, 5);
        assert_eq!(config.sync.retry, 5);
        assert_eq!(config.sync.stop_gap, 5);
        assert!(!config.sync.force_full_refresh);
        assert_eq!(config.wallet_mode, WalletMode::Multi);
    }

    #[test]
    fn test_endpoint_selection() {
        let config = CoreConfig::new().with_electrum(Network::Testnet, "tcp://localhost:50001");
        assert_eq!(config.endpoint(Network::Testnet).url, "tcp://localhost:50001");
        assert_eq!(config.endpoint(Network::Bitcoin).url, ElectrumEndpoints::default().bitcoin);
        assert_eq!(config.endpoint(Network::Bitcoin).network, Network::Bitcoin);
    }

    #[test]
    fn test_save_load_partial() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("config.json");
        let config = CoreConfig::new().single_wallet().force_full_refresh();
        config.save(&path).expect("save");
        assert_eq!(CoreConfig::load(&path).expect("load"), config);

        std::fs::write(&path, r#"{"wallet_mode": "single", "sync": {"stop_gap": 20}}"#).unwrap();
        let partial = CoreConfig::load(&path).expect("load partial");
        assert!(partial.is_single_wallet());
        assert_eq!(partial.sync.stop_gap, 20);
        assert_eq!(partial.sync.retry, 5);
    }
}
