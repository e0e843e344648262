//! Extended-Key Codec - BIP32 / SLIP-132 serialization
//!
//! Parses, validates and relabels extended keys. Relabeling swaps the 4-byte
//! version prefix and recomputes the Base58Check checksum; key material is
//! never touched.
//!
//! # Version table (SLIP-132)
//!
//! | Prefix | Version | Kind | Network | Address type |
//! |--------|---------|------|---------|--------------|
//! | xpub / xprv | 0488b21e / 0488ade4 | pub / prv | bitcoin | legacy |
//! | ypub / yprv | 049d7cb2 / 049d7878 | pub / prv | bitcoin | wrapped-segwit |
//! | zpub / zprv | 04b24746 / 04b2430c | pub / prv | bitcoin | native-segwit |
//! | tpub / tprv | 043587cf / 04358394 | pub / prv | testnet | legacy |
//! | upub / uprv | 044a5262 / 044a4e28 | pub / prv | testnet | wrapped-segwit |
//! | vpub / vprv | 045f1cf6 / 045f18bc | pub / prv | testnet | native-segwit |
//!
//! Multisig variants (Ypub/Zpub/Upub/Vpub) pass the textual pattern but are
//! rejected as unknown prefixes.

use crate::types::{AddressType, Network};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Characters in a serialized extended key.
pub const ENCODED_LEN: usize = 111;
/// Serialized key bytes, without checksum.
pub const DATA_LEN: usize = 78;
const CHECKSUM_LEN: usize = 4;
const VERSION_LEN: usize = 4;
const PAYLOAD_LEN: usize = DATA_LEN - VERSION_LEN;

static KEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[XxyYzZtuUvV](pub|prv)[1-9A-HJ-NP-Za-km-z]{79,108}$").expect("static key pattern")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Malformed extended key: expected {} characters, got {0}", ENCODED_LEN)]
    MalformedLength(usize),

    #[error("Malformed extended key: does not match the extended key pattern")]
    PatternMismatch,

    #[error("Unsupported extended key prefix: {0}")]
    UnknownPrefix(String),

    #[error("Invalid Base58 encoding: {0}")]
    Base58(String),

    #[error("Malformed extended key payload: expected {} bytes, got {0}", DATA_LEN + CHECKSUM_LEN)]
    MalformedPayload(usize),

    #[error("Extended key checksum mismatch")]
    BadChecksum,

    #[error("Version bytes {found} do not match prefix {prefix}")]
    VersionMismatch { prefix: String, found: String },

    #[error("Unsupported target version: {0}")]
    UnsupportedVersion(String),

    #[error("Cannot relabel a {from} key as {to}")]
    KindMismatch { from: KeyKind, to: KeyKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind { Public, Private }

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self { KeyKind::Public => "public", KeyKind::Private => "private" }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// One row of the SLIP-132 table.
#[derive(Debug, PartialEq, Eq)]
pub struct KeyVersion {
    pub prefix: &'static str,
    pub bytes: [u8; 4],
    pub kind: KeyKind,
    pub network: Network,
    pub address_type: AddressType,
}

macro_rules! version {
    ($prefix:literal, $bytes:expr, $kind:ident, $net:ident, $ty:ident) => {
        KeyVersion { prefix: $prefix, bytes: $bytes, kind: KeyKind::$kind, network: Network::$net, address_type: AddressType::$ty }
    };
}

pub static VERSIONS: [KeyVersion; 12] = [
    version!("xpub", [0x04, 0x88, 0xb2, 0x1e], Public, Bitcoin, Legacy),
    version!("ypub", [0x04, 0x9d, 0x7c, 0xb2], Public, Bitcoin, WrappedSegwit),
    version!("zpub", [0x04, 0xb2, 0x47, 0x46], Public, Bitcoin, NativeSegwit),
    version!("tpub", [0x04, 0x35, 0x87, 0xcf], Public, Testnet, Legacy),
    version!("upub", [0x04, 0x4a, 0x52, 0x62], Public, Testnet, WrappedSegwit),
    version!("vpub", [0x04, 0x5f, 0x1c, 0xf6], Public, Testnet, NativeSegwit),
    version!("xprv", [0x04, 0x88, 0xad, 0xe4], Private, Bitcoin, Legacy),
    version!("yprv", [0x04, 0x9d, 0x78, 0x78], Private, Bitcoin, WrappedSegwit),
    version!("zprv", [0x04, 0xb2, 0x43, 0x0c], Private, Bitcoin, NativeSegwit),
    version!("tprv", [0x04, 0x35, 0x83, 0x94], Private, Testnet, Legacy),
    version!("uprv", [0x04, 0x4a, 0x4e, 0x28], Private, Testnet, WrappedSegwit),
    version!("vprv", [0x04, 0x5f, 0x18, 0xbc], Private, Testnet, NativeSegwit),
];

pub fn version_for_prefix(prefix: &str) -> Option<&'static KeyVersion> {
    VERSIONS.iter().find(|v| v.prefix == prefix)
}

pub fn version_for(kind: KeyKind, network: Network, address_type: AddressType) -> &'static KeyVersion {
    VERSIONS
        .iter()
        .find(|v| v.kind == kind && v.network == network && v.address_type == address_type)
        .expect("version table covers every kind x network x address type")
}

/// Plain BIP32 prefix (`xpub`/`xprv`/`tpub`/`tprv`) understood by descriptor parsers.
pub fn standard_prefix(kind: KeyKind, network: Network) -> &'static str {
    version_for(kind, network, AddressType::Legacy).prefix
}

/// What a key's version bytes say about the wallet it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub network: Network,
    pub address_type: AddressType,
}

/// A decoded extended key. Immutable; relabeling produces a new value.
#[derive(Clone, PartialEq, Eq)]
pub struct ExtendedKey {
    version: &'static KeyVersion,
    payload: [u8; PAYLOAD_LEN],
}

impl ExtendedKey {
    pub fn prefix(&self) -> &'static str { self.version.prefix }
    pub fn version_bytes(&self) -> [u8; 4] { self.version.bytes }
    pub fn kind(&self) -> KeyKind { self.version.kind }
    pub fn network(&self) -> Network { self.version.network }
    pub fn address_type(&self) -> AddressType { self.version.address_type }

    /// Depth, parent fingerprint, child number, chain code and key data.
    pub fn payload(&self) -> &[u8] { &self.payload }

    pub fn depth(&self) -> u8 { self.payload[0] }

    pub fn info(&self) -> KeyInfo { classify(self) }

    /// Same key material under another prefix of the same kind.
    pub fn with_prefix(&self, target_prefix: &str) -> Result<ExtendedKey, KeyError> {
        let target = version_for_prefix(target_prefix)
            .ok_or_else(|| KeyError::UnsupportedVersion(target_prefix.to_string()))?;
        if target.kind != self.kind() {
            return Err(KeyError::KindMismatch { from: self.kind(), to: target.kind });
        }
        Ok(ExtendedKey { version: target, payload: self.payload })
    }

    /// Relabel into plain BIP32 form for this key's network.
    pub fn to_standard(&self) -> ExtendedKey {
        let version = version_for(self.kind(), self.network(), AddressType::Legacy);
        ExtendedKey { version, payload: self.payload }
    }

    fn serialize(&self) -> [u8; DATA_LEN] {
        let mut data = [0u8; DATA_LEN];
        data[..VERSION_LEN].copy_from_slice(&self.version.bytes);
        data[VERSION_LEN..].copy_from_slice(&self.payload);
        data
    }
}

impl fmt::Display for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.serialize();
        let mut full = Vec::with_capacity(DATA_LEN + CHECKSUM_LEN);
        full.extend_from_slice(&data);
        full.extend_from_slice(&checksum(&data));
        f.write_str(&bitcoin::base58::encode(&full))
    }
}

// Private key material stays out of logs.
impl fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedKey")
            .field("prefix", &self.prefix())
            .field("kind", &self.kind())
            .field("network", &self.network())
            .field("address_type", &self.address_type())
            .field("depth", &self.depth())
            .finish_non_exhaustive()
    }
}

impl FromStr for ExtendedKey {
    type Err = KeyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { decode(s) }
}

fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let hash = Sha256::digest(Sha256::digest(data));
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&hash[..CHECKSUM_LEN]);
    out
}

/// Cheap textual check: length and pattern only.
pub fn is_extended_key(s: &str) -> bool {
    let s = s.trim();
    s.chars().count() == ENCODED_LEN && KEY_PATTERN.is_match(s)
}

pub fn decode(s: &str) -> Result<ExtendedKey, KeyError> {
    let s = s.trim();
    let len = s.chars().count();
    if len != ENCODED_LEN {
        return Err(KeyError::MalformedLength(len));
    }
    if !KEY_PATTERN.is_match(s) {
        return Err(KeyError::PatternMismatch);
    }
    let prefix = &s[..4];
    let version = version_for_prefix(prefix).ok_or_else(|| KeyError::UnknownPrefix(prefix.to_string()))?;

    let raw = bitcoin::base58::decode(s).map_err(|e| KeyError::Base58(e.to_string()))?;
    if raw.len() != DATA_LEN + CHECKSUM_LEN {
        return Err(KeyError::MalformedPayload(raw.len()));
    }
    let (data, check) = raw.split_at(DATA_LEN);
    if checksum(data) != check {
        return Err(KeyError::BadChecksum);
    }
    if data[..VERSION_LEN] != version.bytes {
        return Err(KeyError::VersionMismatch { prefix: prefix.to_string(), found: hex::encode(&data[..VERSION_LEN]) });
    }

    let mut payload = [0u8; PAYLOAD_LEN];
    payload.copy_from_slice(&data[VERSION_LEN..]);
    Ok(ExtendedKey { version, payload })
}

pub fn reencode(key: &ExtendedKey, target_prefix: &str) -> Result<String, KeyError> {
    Ok(key.with_prefix(target_prefix)?.to_string())
}

pub fn classify(key: &ExtendedKey) -> KeyInfo {
    KeyInfo { network: key.network(), address_type: key.address_type() }
}

/// Decode then relabel in one step.
pub fn convert(s: &str, target_prefix: &str) -> Result<String, KeyError> {
    reencode(&decode(s)?, target_prefix)
}
