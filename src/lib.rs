//! Beewallet: the data layer of a Bitcoin wallet.
//!
//! # Architecture
//!
//! ```text
//! secret / xpub ──→ descriptor ──→ engine::WalletHandle ──→ sync::Reconciler ──→ WalletSyncState
//!                      │                                         │
//!                      └── xkey (SLIP-132 codec)                 └── ChainEngine (BDK + Electrum)
//!
//! raw string ──→ invoice::classify / decode ──→ router::route ──→ RoutingDecision
//! ```
//!
//! | Module | Role |
//! |--------|------|
//! | [`xkey`] | Decode, validate and re-prefix extended keys (xpub/ypub/zpub/...) |
//! | [`descriptor`] | Mnemonic/seed to BIP44/49/84 descriptor pairs |
//! | [`engine`] | Chain wallet engine trait and the BDK implementation |
//! | [`sync`] | Balance-gated reconciliation of the cached wallet state |
//! | [`invoice`] | BIP21 and BOLT11 classification and decoding |
//! | [`router`] | Network and wallet-type compatibility, amount extraction |
//!
//! # Features
//!
//! - `electrum` (default) - `BdkEngine` over bdk_wallet 2.x and bdk_electrum
//!
//! # Usage
//!
//! ```ignore
//! use beewallet::{descriptor, invoice, router, AddressType, Network};
//!
//! let seed = descriptor::Seed::from_mnemonic("abandon abandon ...", None)?;
//! let set = descriptor::derive(&seed, AddressType::NativeSegwit, Network::Bitcoin)?;
//! println!("{}", set.slip132_xpub()?);
//!
//! let decoded = invoice::parse("bitcoin:bc1q...?amount=0.001")?;
//! let wallet = router::WalletSummary::new("main", Network::Bitcoin, AddressType::NativeSegwit);
//! let decision = router::route(&wallet, decoded, false).into_result()?;
//! ```

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod invoice;
pub mod logging;
pub mod router;
pub mod sync;
pub mod types;
pub mod units;
pub mod xkey;

pub use config::{CoreConfig, ElectrumEndpoints, SyncConfig, WalletMode};
pub use descriptor::{BackupMaterial, DescriptorError, Seed, WalletDescriptorSet};
pub use engine::{ChainEngine, EngineError, NetworkEndpoint, WalletHandle};
pub use error::{Error, ErrorKind, Result};
pub use invoice::{DecodedInvoice, InvoiceError, InvoiceType};
pub use router::{RejectReason, RoutingDecision, WalletSummary};
pub use sync::{Reconciler, SyncError, SyncReport, SyncStatus, WalletLocks, WalletSyncState};
pub use types::{AddressType, Network};
pub use xkey::{ExtendedKey, KeyError, KeyKind};

#[cfg(feature = "electrum")]
pub use engine::BdkEngine;
