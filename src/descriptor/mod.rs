//! Descriptor Derivation Policy
//!
//! Maps (address type, network) to a BIP44/49/84 account path and builds the
//! receive/change descriptor pair the chain engine consumes.
//!
//! ```text
//! Mnemonic (BIP39) ─→ Seed ─→ master Xpriv ─→ m/{purpose}'/{coin}'/0'
//!                                                   │
//!                                    ┌──────────────┴──────────────┐
//!                                 external  .../0/*           internal  .../1/*
//! ```
//!
//! | Address type | Mainnet | Testnet | Script |
//! |--------------|---------|---------|--------|
//! | legacy | 44'/0'/0' | 44'/1'/0' | `pkh(..)` |
//! | wrapped-segwit | 49'/0'/0' | 49'/1'/0' | `sh(wpkh(..))` |
//! | native-segwit | 84'/0'/0' | 84'/1'/0' | `wpkh(..)` |
//!
//! The purpose numbers here and the SLIP-132 prefixes in `xkey` describe the
//! same address-type space; both come from [`AddressType`].

mod material;

pub use material::BackupMaterial;

use crate::error::ErrorKind;
use crate::types::{AddressType, Network};
use crate::xkey::{self, ExtendedKey, KeyError, KeyKind};
use bip39::Mnemonic;
use bitcoin::bip32::{DerivationPath, Xpriv, Xpub};
use bitcoin::secp256k1::{All, Secp256k1};
use miniscript::descriptor::{Descriptor, DescriptorPublicKey, DescriptorType};
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Invalid word count: {0}")]
    InvalidWordCount(usize),

    #[error("Invalid extended key: {0}")]
    Key(#[from] KeyError),

    #[error("Derivation failed: {0}")]
    Derivation(String),
}

impl DescriptorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DescriptorError::Derivation(_) => ErrorKind::Engine,
            _ => ErrorKind::Format,
        }
    }
}

/// 64-byte BIP39 seed. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; 64]);

impl Seed {
    pub fn from_bytes(bytes: [u8; 64]) -> Self { Self(bytes) }

    pub fn from_mnemonic(words: &str, passphrase: Option<&str>) -> Result<Self, DescriptorError> {
        let mnemonic = Mnemonic::parse_normalized(words)
            .map_err(|e| DescriptorError::InvalidMnemonic(e.to_string()))?;
        Ok(Self(mnemonic.to_seed(passphrase.unwrap_or(""))))
    }

    pub fn as_bytes(&self) -> &[u8; 64] { &self.0 }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("Seed(..)") }
}

/// Fresh BIP39 mnemonic (12 or 24 words).
pub fn generate_mnemonic(words: usize) -> Result<String, DescriptorError> {
    let entropy_len = match words {
        12 => 16,
        24 => 32,
        _ => return Err(DescriptorError::InvalidWordCount(words)),
    };
    let mut entropy = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut entropy[..entropy_len]);
    let mnemonic = Mnemonic::from_entropy(&entropy[..entropy_len])
        .map_err(|e| DescriptorError::Derivation(e.to_string()));
    entropy.zeroize();
    Ok(mnemonic?.to_string())
}

/// Account-level path without the leading `m/`, e.g. `84'/0'/0'`.
pub fn account_path(address_type: AddressType, network: Network) -> String {
    format!("{}'/{}'/0'", address_type.purpose(), network.coin_type())
}

fn script_wrap(address_type: AddressType, key_expr: &str) -> String {
    match address_type {
        AddressType::Legacy => format!("pkh({})", key_expr),
        AddressType::WrappedSegwit => format!("sh(wpkh({}))", key_expr),
        AddressType::NativeSegwit => format!("wpkh({})", key_expr),
    }
}

fn descriptor_type(address_type: AddressType) -> DescriptorType {
    match address_type {
        AddressType::Legacy => DescriptorType::Pkh,
        AddressType::WrappedSegwit => DescriptorType::ShWpkh,
        AddressType::NativeSegwit => DescriptorType::Wpkh,
    }
}

/// Parses a rendered descriptor back through miniscript. The key map is
/// dropped immediately; only the original text is kept.
fn checked(secp: &Secp256k1<All>, address_type: AddressType, descriptor: String) -> Result<String, DescriptorError> {
    let (parsed, _keys) = Descriptor::<DescriptorPublicKey>::parse_descriptor(secp, &descriptor)
        .map_err(|e| DescriptorError::Derivation(format!("invalid {} descriptor: {}", address_type, e)))?;
    if parsed.desc_type() != descriptor_type(address_type) {
        return Err(DescriptorError::Derivation(format!(
            "expected {:?} descriptor, got {:?}",
            descriptor_type(address_type),
            parsed.desc_type()
        )));
    }
    Ok(descriptor)
}

/// Receive (`/0/*`) and change (`/1/*`) descriptors for one account key.
fn chain_pair(
    secp: &Secp256k1<All>,
    address_type: AddressType,
    origin: &str,
    key: &str,
) -> Result<(String, String), DescriptorError> {
    let render = |chain: u32| checked(secp, address_type, script_wrap(address_type, &format!("{}{}/{}/*", origin, key, chain)));
    Ok((render(0)?, render(1)?))
}

/// Receive/change descriptor pair for one wallet.
///
/// `external`/`internal` carry private keys for seed-derived wallets and are
/// wiped on drop; `public_*` are always safe to export.
#[derive(Clone)]
pub struct WalletDescriptorSet {
    external: String,
    internal: String,
    public_external: String,
    public_internal: String,
    network: Network,
    address_type: AddressType,
    account_path: Option<String>,
    fingerprint: Option<String>,
    account_xpub: String,
    watch_only: bool,
}

impl WalletDescriptorSet {
    pub fn external(&self) -> &str { &self.external }
    pub fn internal(&self) -> &str { &self.internal }
    pub fn public_external(&self) -> &str { &self.public_external }
    pub fn public_internal(&self) -> &str { &self.public_internal }
    pub fn network(&self) -> Network { self.network }
    pub fn address_type(&self) -> AddressType { self.address_type }
    pub fn account_path(&self) -> Option<&str> { self.account_path.as_deref() }
    pub fn fingerprint(&self) -> Option<&str> { self.fingerprint.as_deref() }
    pub fn is_watch_only(&self) -> bool { self.watch_only }

    /// Account xpub in plain BIP32 form (`xpub`/`tpub`).
    pub fn account_xpub(&self) -> &str { &self.account_xpub }

    /// Account xpub relabeled with the SLIP-132 prefix for this wallet's type.
    pub fn slip132_xpub(&self) -> Result<String, KeyError> {
        let target = xkey::version_for(KeyKind::Public, self.network, self.address_type);
        xkey::convert(&self.account_xpub, target.prefix)
    }

    /// Descriptors for an imported account-level key (any SLIP-132 prefix).
    ///
    /// Public keys give a watch-only set. Origin info is unknown, so the
    /// descriptors carry no `[fingerprint/path]` prefix.
    pub fn from_extended_key(key: &ExtendedKey) -> Result<Self, DescriptorError> {
        let secp = Secp256k1::new();
        let standard = key.to_standard().to_string();
        let account_xpub = match key.kind() {
            KeyKind::Public => standard.clone(),
            KeyKind::Private => {
                let xprv = Xpriv::from_str(&standard).map_err(|e| DescriptorError::Derivation(e.to_string()))?;
                Xpub::from_priv(&secp, &xprv).to_string()
            }
        };
        let address_type = key.address_type();
        let (external, internal) = chain_pair(&secp, address_type, "", &standard)?;
        let (public_external, public_internal) = chain_pair(&secp, address_type, "", &account_xpub)?;

        Ok(Self {
            external,
            internal,
            public_external,
            public_internal,
            network: key.network(),
            address_type,
            account_path: None,
            fingerprint: None,
            account_xpub,
            watch_only: key.kind() == KeyKind::Public,
        })
    }
}

impl Drop for WalletDescriptorSet {
    fn drop(&mut self) {
        self.external.zeroize();
        self.internal.zeroize();
    }
}

impl fmt::Debug for WalletDescriptorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletDescriptorSet")
            .field("external", &self.public_external)
            .field("internal", &self.public_internal)
            .field("network", &self.network)
            .field("address_type", &self.address_type)
            .field("account_path", &self.account_path)
            .field("fingerprint", &self.fingerprint)
            .field("watch_only", &self.watch_only)
            .finish()
    }
}

/// Derive the descriptor pair for a seed-backed wallet.
pub fn derive(seed: &Seed, address_type: AddressType, network: Network) -> Result<WalletDescriptorSet, DescriptorError> {
    let secp = Secp256k1::new();
    let master = Xpriv::new_master(network.to_bitcoin(), seed.as_bytes())
        .map_err(|e| DescriptorError::Derivation(e.to_string()))?;
    let fingerprint = master.fingerprint(&secp).to_string();

    let path_str = account_path(address_type, network);
    let path = DerivationPath::from_str(&format!("m/{}", path_str))
        .map_err(|e| DescriptorError::Derivation(e.to_string()))?;
    let account = master
        .derive_priv(&secp, &path)
        .map_err(|e| DescriptorError::Derivation(e.to_string()))?;
    let account_xpub = Xpub::from_priv(&secp, &account).to_string();
    let account_xprv = account.to_string();

    let origin = format!("[{}/{}]", fingerprint, path_str);
    let (external, internal) = chain_pair(&secp, address_type, &origin, &account_xprv)?;
    let (public_external, public_internal) = chain_pair(&secp, address_type, &origin, &account_xpub)?;

    tracing::debug!(path = %path_str, %fingerprint, address_type = %address_type, network = %network, "derived account descriptors");

    Ok(WalletDescriptorSet {
        external,
        internal,
        public_external,
        public_internal,
        network,
        address_type,
        account_path: Some(path_str),
        fingerprint: Some(fingerprint),
        account_xpub,
        watch_only: false,
    })
}
