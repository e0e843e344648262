//! Routes a decoded invoice to a wallet, or says why it can't.
//!
//! Pure and synchronous. Reachability is the caller's concern and must be
//! checked before routing flows that need it (Lightning payment).

use crate::invoice::DecodedInvoice;
use crate::types::{AddressType, Network};
use crate::units::msat_to_sats;
use bitcoin::address::NetworkUnchecked;
use bitcoin::Address;
use serde::Serialize;
use std::fmt;

/// What the router needs to know about a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletSummary {
    pub id: String,
    pub network: Network,
    pub address_type: AddressType,
    pub watch_only: bool,
}

impl WalletSummary {
    pub fn new(id: impl Into<String>, network: Network, address_type: AddressType) -> Self {
        Self { id: id.into(), network, address_type, watch_only: false }
    }

    pub fn with_watch_only(mut self, watch_only: bool) -> Self { self.watch_only = watch_only; self }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    NetworkMismatch { wallet: Network, invoice: Network },
    /// Destination is on neither supported network (e.g. regtest).
    UnknownNetwork { destination: String },
    WalletIncompatible { detail: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NetworkMismatch { wallet, invoice } => {
                write!(f, "invoice is for {} but wallet is on {}", invoice, wallet)
            }
            RejectReason::UnknownNetwork { destination } => {
                write!(f, "{} is not a bitcoin or testnet destination", destination)
            }
            RejectReason::WalletIncompatible { detail } => write!(f, "wallet incompatible: {}", detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RoutingDecision {
    Reject { reason: RejectReason },
    /// Caller must prompt for an amount before continuing.
    ProceedNoAmount { wallet_ref: String, invoice: DecodedInvoice },
    ProceedWithAmount { wallet_ref: String, invoice: DecodedInvoice, amount_sats: u64 },
}

impl RoutingDecision {
    pub fn is_reject(&self) -> bool { matches!(self, RoutingDecision::Reject { .. }) }

    pub fn amount_sats(&self) -> Option<u64> {
        match self {
            RoutingDecision::ProceedWithAmount { amount_sats, .. } => Some(*amount_sats),
            _ => None,
        }
    }

    /// Turn a rejection into an `Error` of kind `Compatibility`.
    pub fn into_result(self) -> crate::Result<Self> {
        match self {
            RoutingDecision::Reject { reason } => Err(crate::Error::Rejected(reason)),
            other => Ok(other),
        }
    }
}

fn reject(reason: RejectReason) -> RoutingDecision {
    tracing::debug!(%reason, "invoice rejected");
    RoutingDecision::Reject { reason }
}

fn incompatible(detail: &str) -> RoutingDecision {
    reject(RejectReason::WalletIncompatible { detail: detail.to_string() })
}

/// Network a destination address belongs to. Signet shares testnet's encoding.
fn address_network(address: &Address<NetworkUnchecked>) -> Option<Network> {
    Network::ALL.into_iter().find(|n| address.is_valid_for_network(n.to_bitcoin()))
}

/// Wallet-type rule for single-wallet mode. A legacy wallet only pays
/// pre-segwit scripts; a native-segwit wallet refuses bare P2PKH.
fn script_incompatibility(wallet_type: AddressType, address: &Address<NetworkUnchecked>) -> Option<&'static str> {
    let destination = address.assume_checked_ref().address_type();
    let legacy_only = matches!(destination, Some(bitcoin::AddressType::P2pkh));
    let pre_segwit = legacy_only || matches!(destination, Some(bitcoin::AddressType::P2sh));
    match wallet_type {
        AddressType::Legacy if !pre_segwit => Some("legacy wallet cannot pay a segwit destination"),
        AddressType::NativeSegwit if legacy_only => Some("native segwit wallet cannot pay a legacy P2PKH destination"),
        _ => None,
    }
}

pub fn route(wallet: &WalletSummary, invoice: DecodedInvoice, single_wallet_mode: bool) -> RoutingDecision {
    let amount_sats = match &invoice {
        DecodedInvoice::OnChain { address, amount_sats, .. } => {
            let parsed = match address.parse::<Address<NetworkUnchecked>>() {
                Ok(parsed) => parsed,
                Err(_) => return reject(RejectReason::UnknownNetwork { destination: address.clone() }),
            };
            let Some(network) = address_network(&parsed) else {
                return reject(RejectReason::UnknownNetwork { destination: address.clone() });
            };
            if network != wallet.network {
                return reject(RejectReason::NetworkMismatch { wallet: wallet.network, invoice: network });
            }
            if single_wallet_mode {
                if wallet.watch_only {
                    return incompatible("watch-only wallet cannot sign payments");
                }
                if let Some(detail) = script_incompatibility(wallet.address_type, &parsed) {
                    return incompatible(detail);
                }
            }
            *amount_sats
        }
        DecodedInvoice::Lightning { amount_msat, network, .. } => {
            if *network != wallet.network {
                return reject(RejectReason::NetworkMismatch { wallet: wallet.network, invoice: *network });
            }
            if single_wallet_mode && wallet.watch_only {
                return incompatible("watch-only wallet cannot sign payments");
            }
            amount_msat.map(msat_to_sats)
        }
    };

    let wallet_ref = wallet.id.clone();
    match amount_sats.filter(|&sats| sats > 0) {
        Some(amount_sats) => RoutingDecision::ProceedWithAmount { wallet_ref, invoice, amount_sats },
        None => RoutingDecision::ProceedNoAmount { wallet_ref, invoice },
    }
}
