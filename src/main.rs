//! wallet-cli: offline tools around the wallet core.
//!
//! ```text
//! merge         raw feed dump (JSON)       → canonical timeline (JSON)
//! translate     message body + firmware    → device payload (JSON)
//! capabilities  firmware version           → supported payload features
//! check-config  TOML file                  → validation report
//! ```

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

use wallet_core::activity::{CanonicalActivity, FeedKey, RawActivity, Replacement, Timeline};
use wallet_core::blockchain::address::Address;
use wallet_core::blockchain::client::RpcResult;
use wallet_core::blockchain::types::Network;
use wallet_core::config::{load_config, WalletCoreConfig};
use wallet_core::ledger::capabilities::{required_version, CAPABILITIES};
use wallet_core::ledger::{
    supports, DeviceModel, DeviceVersion, JettonRegistry, OpcodeParser, PayloadTranslator, TokenResolver,
    TranslationContext,
};
use wallet_core::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "wallet-cli")]
#[command(about = "Offline tools for the wallet signing and activity core", long_about = None)]
struct Cli {
    /// Config file; defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge raw per-feed activity into one timeline
    Merge {
        /// JSON file with `feeds` (slug + items) and optional `local` placeholders
        input: PathBuf,
    },
    /// Translate a hex message body into the payload a device would show
    Translate {
        /// Hex-encoded message body
        body: String,
        /// Device firmware version, e.g. 2.2.0
        #[arg(long)]
        firmware: DeviceVersion,
        /// Device model (nanoS, nanoSPlus, nanoX, stax, flex)
        #[arg(long, default_value = "nanoX")]
        model: String,
        /// Message destination (the sender's jetton wallet for jetton transfers)
        #[arg(long)]
        destination: Address,
        /// Jetton master, when known
        #[arg(long)]
        token: Option<Address>,
        #[arg(long)]
        blind_signing: bool,
        #[arg(long)]
        testnet: bool,
    },
    /// List payload features a firmware version supports
    Capabilities {
        firmware: DeviceVersion,
    },
    /// Validate the config file
    CheckConfig,
}

#[derive(Deserialize)]
struct MergeInput {
    feeds: Vec<FeedDump>,
    #[serde(default)]
    local: Vec<RawActivity>,
}

#[derive(Deserialize)]
struct FeedDump {
    /// Token slug; absent for the native feed.
    #[serde(default)]
    slug: Option<String>,
    items: Vec<Value>,
}

#[derive(Serialize)]
struct MergeOutput {
    activities: Vec<CanonicalActivity>,
    replaced: Vec<Replacement>,
    dropped: usize,
}

/// No network access: every token wallet is unknown.
struct OfflineResolver;

#[async_trait]
impl TokenResolver for OfflineResolver {
    async fn resolve_token_address(&self, _: Network, _: &Address) -> RpcResult<Option<Address>> {
        Ok(None)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => WalletCoreConfig::default(),
    };
    init_logging(&config.observability);

    match cli.command {
        Commands::Merge { input } => {
            let content = std::fs::read_to_string(&input)?;
            let input: MergeInput = serde_json::from_str(&content)?;

            let mut timeline = Timeline::new();
            for activity in input.local {
                timeline.add_local(activity);
            }
            let mut replaced = Vec::new();
            let mut dropped = 0;
            for feed in input.feeds {
                let key = FeedKey::for_slug(feed.slug.as_deref());
                let report = timeline.apply_batch(&key, feed.items);
                dropped += report.dropped;
                replaced.extend(report.replaced);
            }
            print_json(&MergeOutput {
                activities: timeline.entries(),
                replaced,
                dropped,
            })?;
        }
        Commands::Translate {
            body,
            firmware,
            model,
            destination,
            token,
            blind_signing,
            testnet,
        } => {
            let body = hex::decode(body.trim_start_matches("0x"))?;
            let model: DeviceModel = serde_json::from_value(Value::String(model))?;
            let translator = PayloadTranslator::new(
                Arc::new(OpcodeParser),
                Arc::new(JettonRegistry::new(Arc::new(OfflineResolver))),
            );
            let ctx = TranslationContext {
                network: if testnet { Network::Testnet } else { Network::Mainnet },
                destination: &destination,
                version: firmware,
                model,
                blind_signing,
                token_hint: token.as_ref(),
            };
            match translator.translate(Some(&body), &ctx).await {
                Ok(payload) => print_json(&payload)?,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Capabilities { firmware } => {
            let features: Vec<Value> = CAPABILITIES
                .iter()
                .map(|(feature, _)| {
                    json!({
                        "feature": feature.as_str(),
                        "requires": required_version(*feature).to_string(),
                        "supported": supports(firmware, *feature),
                    })
                })
                .collect();
            print_json(&json!({ "firmware": firmware.to_string(), "features": features }))?;
        }
        Commands::CheckConfig => {
            // Loading already validated it.
            let path = cli
                .config
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<defaults>".to_string());
            println!("Config OK: {}", path);
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
