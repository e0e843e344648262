//! Closed domain enums shared by every component.
//!
//! `Network` × `AddressType` is the one space both the SLIP-132 version table
//! (`xkey`) and the derivation path table (`descriptor`) are keyed on.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network { #[default] Bitcoin, Testnet }

impl Network {
    pub const ALL: [Network; 2] = [Network::Bitcoin, Network::Testnet];

    pub fn as_str(&self) -> &'static str {
        match self { Network::Bitcoin => "bitcoin", Network::Testnet => "testnet" }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bitcoin" | "mainnet" | "main" => Some(Network::Bitcoin),
            "testnet" | "test" => Some(Network::Testnet),
            _ => None,
        }
    }

    /// BIP44 coin type: 0 for mainnet, 1 for every test network
    pub fn coin_type(&self) -> u32 {
        match self { Network::Bitcoin => 0, Network::Testnet => 1 }
    }

    pub fn to_bitcoin(&self) -> bitcoin::Network {
        match self { Network::Bitcoin => bitcoin::Network::Bitcoin, Network::Testnet => bitcoin::Network::Testnet }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Single-sig script family a wallet derives addresses for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressType {
    /// P2PKH, `1...`
    Legacy,
    /// P2WPKH nested in P2SH, `3...`
    WrappedSegwit,
    /// P2WPKH, `bc1q...`
    #[default]
    NativeSegwit,
}

impl AddressType {
    pub const ALL: [AddressType; 3] = [AddressType::Legacy, AddressType::WrappedSegwit, AddressType::NativeSegwit];

    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::Legacy => "legacy",
            AddressType::WrappedSegwit => "wrapped-segwit",
            AddressType::NativeSegwit => "native-segwit",
        }
    }

    /// Accepts the kebab-case names plus the short aliases wallets export
    /// (`p2pkh`, `p2sh`, `bech32`, `wpkh`, ...).
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "legacy" | "p2pkh" | "pkh" => Some(AddressType::Legacy),
            "wrapped-segwit" | "segwit" | "p2sh" | "shp2wpkh" | "p2sh-p2wpkh" => Some(AddressType::WrappedSegwit),
            "native-segwit" | "bech32" | "wpkh" | "p2wpkh" => Some(AddressType::NativeSegwit),
            _ => None,
        }
    }

    /// BIP43 purpose field of the account path.
    pub fn purpose(&self) -> u32 {
        match self { AddressType::Legacy => 44, AddressType::WrappedSegwit => 49, AddressType::NativeSegwit => 84 }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AddressType::Legacy => "Legacy (P2PKH)",
            AddressType::WrappedSegwit => "Segwit (P2SH)",
            AddressType::NativeSegwit => "Native Segwit (Bech32)",
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases() {
        assert_eq!(AddressType::from_str("bech32"), Some(AddressType::NativeSegwit));
        assert_eq!(AddressType::from_str("P2SH"), Some(AddressType::WrappedSegwit));
        assert_eq!(AddressType::from_str("p2pkh"), Some(AddressType::Legacy));
        assert_eq!(AddressType::from_str("taproot"), None);
        assert_eq!(Network::from_str("mainnet"), Some(Network::Bitcoin));
        assert_eq!(Network::from_str("signet"), None);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&AddressType::WrappedSegwit).unwrap(), "\"wrapped-segwit\"");
        assert_eq!(serde_json::to_string(&Network::Testnet).unwrap(), "\"testnet\"");
    }
}
