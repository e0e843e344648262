//! BDK engine tests - no Electrum server needed
//!
//! These tests verify:
//! 1. Seed-derived descriptors build a BDK wallet with the expected addresses
//! 2. Watch-only (zpub) imports derive the same addresses as the seed wallet
//! 3. Fresh and placeholder wallets report zero balance and empty lists
//! 4. An unreachable endpoint surfaces as a connectivity error naming it

#![cfg(feature = "electrum")]

use beewallet::descriptor::{self, Seed, WalletDescriptorSet};
use beewallet::engine::BdkWalletCell;
use beewallet::{
    AddressType, BdkEngine, ChainEngine, ErrorKind, Network, NetworkEndpoint, Reconciler, SyncConfig, SyncError,
    WalletHandle, WalletSyncState,
};
use std::sync::Arc;

// Test mnemonic - "abandon" x11 + "about" - well-known test vector
const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

// First BIP84 receive addresses (m/84'/0'/0'/0/0 and m/84'/1'/0'/0/0)
const EXPECTED_MAINNET_ADDR_0: &str = "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu";
const EXPECTED_TESTNET_ADDR_0: &str = "tb1q6rz28mcfaxtmd6v789l9rrlrusdprr9pqcpvkl";

fn seed() -> Seed {
    Seed::from_mnemonic(TEST_MNEMONIC, None).expect("valid mnemonic")
}

fn first_address(handle: &WalletHandle<BdkEngine>) -> String {
    handle.wallet().receive_address().expect("query").expect("real wallet")
}

/// Test: BIP84 mainnet derivation matches the reference address
#[test]
fn mainnet_address_matches_bip84() {
    let engine = BdkEngine::new();
    let handle = WalletHandle::from_secret(&engine, &seed(), AddressType::NativeSegwit, Network::Bitcoin)
        .expect("wallet");
    assert_eq!(first_address(&handle), EXPECTED_MAINNET_ADDR_0, "derivation drift detected");
}

/// Test: testnet uses coin type 1'
#[test]
fn testnet_address_uses_coin_type_one() {
    let engine = BdkEngine::new();
    let handle = WalletHandle::from_secret(&engine, &seed(), AddressType::NativeSegwit, Network::Testnet)
        .expect("wallet");
    assert_eq!(first_address(&handle), EXPECTED_TESTNET_ADDR_0);
}

/// Test: legacy and wrapped segwit wallets produce their script types
#[test]
fn address_types_produce_matching_scripts() {
    let engine = BdkEngine::new();
    let legacy = WalletHandle::from_secret(&engine, &seed(), AddressType::Legacy, Network::Bitcoin).unwrap();
    assert!(first_address(&legacy).starts_with('1'));

    let wrapped = WalletHandle::from_secret(&engine, &seed(), AddressType::WrappedSegwit, Network::Bitcoin).unwrap();
    assert!(first_address(&wrapped).starts_with('3'));
}

/// Test: a zpub import watches the same addresses as the seed wallet
#[test]
fn watch_only_import_matches_seed_wallet() {
    let engine = BdkEngine::new();
    let seeded = descriptor::derive(&seed(), AddressType::NativeSegwit, Network::Bitcoin).unwrap();
    let key = beewallet::xkey::decode(&seeded.slip132_xpub().unwrap()).unwrap();
    let set = WalletDescriptorSet::from_extended_key(&key).unwrap();

    let handle = WalletHandle::from_descriptors(&engine, &set).expect("watch-only wallet");
    assert!(handle.is_watch_only());
    assert_eq!(first_address(&handle), EXPECTED_MAINNET_ADDR_0);
}

/// Test: fresh wallet has nothing to report
#[tokio::test]
async fn fresh_wallet_is_empty() {
    let engine = BdkEngine::new();
    let handle = WalletHandle::from_secret(&engine, &seed(), AddressType::NativeSegwit, Network::Testnet).unwrap();
    assert_eq!(engine.balance(handle.wallet()).await.unwrap(), 0);
    assert!(engine.list_transactions(handle.wallet()).await.unwrap().is_empty());
    assert!(engine.list_utxos(handle.wallet()).await.unwrap().is_empty());
}

/// Test: secret-less wallets get an empty placeholder
#[tokio::test]
async fn placeholder_wallet_is_empty() {
    let engine = BdkEngine::new();
    let handle: WalletHandle<BdkEngine> = WalletHandle::watch_only(&engine, Network::Bitcoin);
    let cell: &BdkWalletCell = handle.wallet();
    assert_eq!(cell.receive_address().unwrap(), None);
    assert_eq!(engine.balance(cell).await.unwrap(), 0);
    assert!(engine.list_utxos(cell).await.unwrap().is_empty());
}

/// Test: refused connection is a connectivity error carrying the endpoint
#[tokio::test]
async fn unreachable_endpoint_is_connectivity_error() {
    let engine = Arc::new(BdkEngine::new());
    let handle = WalletHandle::from_secret(engine.as_ref(), &seed(), AddressType::NativeSegwit, Network::Testnet)
        .unwrap();
    let config = SyncConfig { timeout_secs: 1, retry: 0, ..SyncConfig::default() };
    let reconciler = Reconciler::new(engine, config);
    let endpoint = NetworkEndpoint::new(Network::Testnet, "tcp://127.0.0.1:1");

    let cached = WalletSyncState { balance: 5_000, ..WalletSyncState::default() };
    let err = reconciler.sync(&handle, &endpoint, &cached).await.unwrap_err();
    assert!(matches!(err, SyncError::Connection { .. }));
    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert!(err.to_string().contains("tcp://127.0.0.1:1"));
}
