//! Beewallet CLI - JSON in the terminal
//!
//!   beewallet key decode <key>                 → prefix, kind, network, script type
//!   beewallet key convert <key> <prefix>       → re-encoded key (zpub → xpub, ...)
//!   beewallet mnemonic [--words 12|24]         → fresh BIP39 mnemonic
//!   beewallet derive --mnemonic <words>        → descriptors and account xpub
//!   beewallet receive <address> [--amount N]   → BIP21 URI
//!   beewallet invoice <raw> --network <net>    → classification and routing decision
//!   beewallet sync --mnemonic <words>          → reconciled wallet state (electrum)
//!
//! Common options:
//!   --network <bitcoin|testnet>   --type <legacy|segwit|bech32>
//!   --config <path>               --json / --pretty

use anyhow::{anyhow, bail, Context};
use beewallet::logging::init_logging;
use beewallet::{descriptor, invoice, router, units, xkey};
use beewallet::{AddressType, CoreConfig, Network};
use serde_json::{json, Value};
use std::env;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::debug;

#[tokio::main]
async fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);

    if opts.help {
        print_usage();
        return;
    }

    if opts.version {
        println!("beewallet {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = match opts.command.as_deref() {
        Some("key") => cmd_key(&opts),
        Some("mnemonic") => cmd_mnemonic(&opts),
        Some("derive") => cmd_derive(&opts),
        Some("receive") => cmd_receive(&opts),
        Some("invoice") => cmd_invoice(&opts),
        Some("sync") => cmd_sync(&opts).await,
        Some(cmd) => Err(anyhow!("Unknown command: {}", cmd)),
        None => {
            print_usage();
            return;
        }
    };

    let pretty = opts.pretty || (!opts.json && std::io::stdout().is_terminal());
    let render = |value: &Value| {
        let out = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
        out.unwrap_or_else(|_| value.to_string())
    };

    match result {
        Ok(output) => println!("{}", render(&output)),
        Err(e) => {
            let kind = e
                .downcast_ref::<beewallet::Error>()
                .map(|err| err.kind().as_str())
                .unwrap_or("usage");
            eprintln!("{}", render(&json!({"error": format!("{:#}", e), "kind": kind})));
            std::process::exit(1);
        }
    }
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    positional: Vec<String>,
    mnemonic: Option<String>,
    passphrase: Option<String>,
    network: Option<String>,
    address_type: Option<String>,
    electrum_url: Option<String>,
    config: Option<String>,
    state: Option<String>,
    words: Option<usize>,
    amount: Option<u64>,
    label: Option<String>,
    message: Option<String>,
    single: bool,
    watch_only: bool,
    json: bool,
    pretty: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        let mut opts = ParsedArgs::default();
        let mut positional = Vec::new();
        let mut i = 0;

        while i < args.len() {
            let arg = &args[i];
            let value = args.get(i + 1).cloned();
            let mut takes_value = true;
            match arg.as_str() {
                "--mnemonic" | "-m" => opts.mnemonic = value,
                "--passphrase" => opts.passphrase = value,
                "--network" | "-n" => opts.network = value,
                "--type" | "-t" => opts.address_type = value,
                "--electrum" | "-e" => opts.electrum_url = value,
                "--config" | "-c" => opts.config = value,
                "--state" | "-s" => opts.state = value,
                "--words" | "-w" => opts.words = value.and_then(|v| v.parse().ok()),
                "--amount" => opts.amount = value.and_then(|v| v.parse().ok()),
                "--label" => opts.label = value,
                "--message" => opts.message = value,
                _ => {
                    takes_value = false;
                    match arg.as_str() {
                        "--help" | "-h" => opts.help = true,
                        "--version" | "-V" => opts.version = true,
                        "--json" => opts.json = true,
                        "--pretty" => opts.pretty = true,
                        "--single" => opts.single = true,
                        "--watch-only" => opts.watch_only = true,
                        _ if !arg.starts_with('-') => positional.push(arg.clone()),
                        _ => {} // Ignore unknown flags
                    }
                }
            }
            i += if takes_value { 2 } else { 1 };
        }

        if !positional.is_empty() {
            opts.command = Some(positional.remove(0));
        }
        opts.positional = positional;

        // Environment is lower priority than flags
        if opts.mnemonic.is_none() {
            opts.mnemonic = env::var("BEEWALLET_MNEMONIC").ok().filter(|s| !s.is_empty());
        }
        if opts.network.is_none() {
            opts.network = env::var("BEEWALLET_NETWORK").ok().filter(|s| !s.is_empty());
        }

        opts
    }

    fn arg(&self, index: usize, name: &str) -> anyhow::Result<&str> {
        self.positional.get(index).map(String::as_str).ok_or_else(|| anyhow!("Missing <{}>", name))
    }

    fn network(&self) -> anyhow::Result<Network> {
        match self.network.as_deref() {
            None => Ok(Network::default()),
            Some(n) => Network::from_str(n).ok_or_else(|| anyhow!("Unknown network: {}", n)),
        }
    }

    fn address_type(&self) -> anyhow::Result<AddressType> {
        match self.address_type.as_deref() {
            None => Ok(AddressType::default()),
            Some(t) => AddressType::from_str(t).ok_or_else(|| anyhow!("Unknown address type: {}", t)),
        }
    }

    fn seed(&self) -> anyhow::Result<descriptor::Seed> {
        let words = self.mnemonic.as_deref().context("--mnemonic or BEEWALLET_MNEMONIC required")?;
        Ok(descriptor::Seed::from_mnemonic(words, self.passphrase.as_deref()).map_err(beewallet::Error::from)?)
    }

    fn core_config(&self) -> anyhow::Result<CoreConfig> {
        let path = self.config.as_ref().map(PathBuf::from).or_else(CoreConfig::default_path);
        let mut config = match path {
            Some(p) if p.exists() => {
                debug!(path = %p.display(), "loading config");
                CoreConfig::load(&p).with_context(|| format!("reading {}", p.display()))?
            }
            _ => CoreConfig::from_env(),
        };
        if let Some(url) = &self.electrum_url {
            config = config.with_electrum(self.network()?, url.clone());
        }
        if self.single {
            config = config.single_wallet();
        }
        Ok(config)
    }
}

fn print_usage() {
    println!(
        r#"beewallet - Bitcoin wallet data layer

USAGE:
    beewallet <command> [options]

COMMANDS:
    key decode <key>              Inspect an extended public/private key
    key convert <key> <prefix>    Re-encode a key under another SLIP-132 prefix
    mnemonic                      Generate a BIP39 mnemonic
    derive                        Derive descriptors from a mnemonic
    receive <address>             Build a BIP21 payment request
    invoice <raw>                 Classify, decode and route a payment request
    sync                          Sync a wallet against Electrum and print its state

OPTIONS:
    -m, --mnemonic <words>    BIP39 mnemonic (or BEEWALLET_MNEMONIC)
        --passphrase <pass>   BIP39 passphrase
    -n, --network <net>       bitcoin | testnet (default: bitcoin)
    -t, --type <type>         legacy | segwit | bech32 (default: bech32)
    -e, --electrum <url>      Electrum server for the selected network
    -c, --config <path>       Config file (default: <config dir>/beewallet/config.json)
    -s, --state <path>        Wallet state file read and rewritten by sync
    -w, --words <n>           Mnemonic length, 12 or 24
        --amount <sats>       Receive amount
        --label <text>        Receive label
        --message <text>      Receive message
        --single              Single-wallet mode (enforce wallet-type rules)
        --watch-only          Route as a watch-only wallet
        --json | --pretty     Output format (default: pretty on a terminal)
    -h, --help                Show this help
    -V, --version             Show version

ENVIRONMENT:
    RUST_LOG, BEEWALLET_LOG_JSON, BEEWALLET_MNEMONIC, BEEWALLET_NETWORK,
    BEEWALLET_ELECTRUM_BITCOIN, BEEWALLET_ELECTRUM_TESTNET,
    BEEWALLET_WALLET_MODE, BEEWALLET_FORCE_FULL_REFRESH
"#
    );
}

fn key_json(key: &xkey::ExtendedKey) -> Value {
    json!({
        "key": key.to_string(),
        "prefix": key.prefix(),
        "kind": key.kind().as_str(),
        "network": key.network(),
        "address_type": key.address_type(),
        "depth": key.depth(),
        "standard": key.to_standard().to_string(),
    })
}

fn cmd_key(opts: &ParsedArgs) -> anyhow::Result<Value> {
    match opts.arg(0, "decode|convert")? {
        "decode" => {
            let key = xkey::decode(opts.arg(1, "key")?).map_err(beewallet::Error::from)?;
            Ok(key_json(&key))
        }
        "convert" => {
            let key = xkey::decode(opts.arg(1, "key")?).map_err(beewallet::Error::from)?;
            let converted = key.with_prefix(opts.arg(2, "prefix")?).map_err(beewallet::Error::from)?;
            Ok(json!({"from": key.prefix(), "to": converted.prefix(), "key": converted.to_string()}))
        }
        other => bail!("Unknown key subcommand: {}", other),
    }
}

fn cmd_mnemonic(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let words = opts.words.unwrap_or(12);
    let mnemonic = descriptor::generate_mnemonic(words).map_err(beewallet::Error::from)?;
    Ok(json!({"mnemonic": mnemonic, "words": words}))
}

fn cmd_derive(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let set = descriptor::derive(&opts.seed()?, opts.address_type()?, opts.network()?)
        .map_err(beewallet::Error::from)?;
    Ok(json!({
        "network": set.network(),
        "address_type": set.address_type(),
        "account_path": set.account_path(),
        "fingerprint": set.fingerprint(),
        "xpub": set.account_xpub(),
        "slip132_xpub": set.slip132_xpub().map_err(beewallet::Error::from)?,
        "external": set.public_external(),
        "internal": set.public_internal(),
    }))
}

fn cmd_receive(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let address = opts.arg(0, "address")?;
    let uri = invoice::bip21_uri(address, opts.amount, opts.label.as_deref(), opts.message.as_deref());
    Ok(json!({
        "address": address,
        "uri": uri,
        "amount_sat": opts.amount,
        "amount_btc": opts.amount.map(units::sats_to_btc_string),
    }))
}

fn cmd_invoice(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let raw = opts.arg(0, "invoice")?;
    let config = opts.core_config()?;
    let invoice_type = invoice::classify(raw).map_err(beewallet::Error::from)?;
    let decoded = invoice::decode(raw, &invoice_type).map_err(beewallet::Error::from)?;

    let wallet = router::WalletSummary::new("cli", opts.network()?, opts.address_type()?)
        .with_watch_only(opts.watch_only);
    let decision = router::route(&wallet, decoded, config.is_single_wallet());
    Ok(json!({"type": invoice_type, "decision": decision}))
}

#[cfg(feature = "electrum")]
async fn cmd_sync(opts: &ParsedArgs) -> anyhow::Result<Value> {
    use beewallet::{BdkEngine, Reconciler, WalletHandle, WalletSyncState};
    use std::sync::Arc;

    let config = opts.core_config()?;
    let network = opts.network()?;
    let engine = Arc::new(BdkEngine::new());
    let handle = WalletHandle::from_secret(engine.as_ref(), &opts.seed()?, opts.address_type()?, network)?;

    let state_path = opts.state.as_ref().map(PathBuf::from);
    let cached = match &state_path {
        Some(p) if p.exists() => serde_json::from_str::<WalletSyncState>(&std::fs::read_to_string(p)?)
            .with_context(|| format!("parsing {}", p.display()))?,
        _ => WalletSyncState::default(),
    };

    let reconciler = Reconciler::new(engine, config.sync.clone());
    let report = reconciler
        .sync(&handle, &config.endpoint(network), &cached)
        .await
        .map_err(beewallet::Error::from)?;

    if let Some(p) = &state_path {
        std::fs::write(p, serde_json::to_string_pretty(&report.state)?)?;
    }
    Ok(serde_json::to_value(&report)?)
}

#[cfg(not(feature = "electrum"))]
async fn cmd_sync(_opts: &ParsedArgs) -> anyhow::Result<Value> {
    bail!("sync requires the `electrum` feature")
}
