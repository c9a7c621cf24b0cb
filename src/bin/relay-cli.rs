use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use solana_sdk::signature::Signer;

use shield_relay::chain::wallet::{FEE_PAYER_KEY_ENV_VAR, SHIELD_MAKER_KEY_ENV_VAR};
use shield_relay::chain::{
    keypair_from_env, Pubkey, RpcClient, ShieldAccounts, SignerSet, Submitter, TransactionSpec,
    TxBuilder,
};
use shield_relay::config::{load_config, RelayConfig};
use shield_relay::observability::logging;
use shield_relay::relay::{EventCodec, RawLogBatch, ShieldProcessor};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Operator tooling for the shield relay", long_about = None)]
struct Cli {
    /// Relay config; devnet defaults when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, sign and submit a shield transaction.
    ///
    /// Keys are read from RELAY_FEE_PAYER_KEY and RELAY_SHIELD_MAKER_KEY
    /// (the maker defaults to the fee payer).
    Shield {
        #[arg(long)]
        maker_token_account: Pubkey,
        #[arg(long)]
        vault_token_account: Pubkey,
        /// Amount in token base units.
        #[arg(long)]
        amount: u64,
        /// Incognito payment address to receive the minted tokens.
        #[arg(long)]
        destination: String,
    },
    /// Decode shield logs given as arguments or one per line on stdin.
    Decode { lines: Vec<String> },
    /// Print the cluster's current slot.
    Slot,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    logging::init("warn", false);

    match cli.command {
        Commands::Shield {
            maker_token_account,
            vault_token_account,
            amount,
            destination,
        } => {
            let payer = keypair_from_env(FEE_PAYER_KEY_ENV_VAR)?;
            let maker = match std::env::var(SHIELD_MAKER_KEY_ENV_VAR) {
                Ok(_) => Some(keypair_from_env(SHIELD_MAKER_KEY_ENV_VAR)?),
                Err(_) => None,
            };
            let maker_key = maker.as_ref().map_or_else(|| payer.pubkey(), |m| m.pubkey());

            let spec = TransactionSpec::shield(
                payer.pubkey(),
                ShieldAccounts {
                    maker: maker_key,
                    maker_token_account,
                    vault_token_account,
                    incognito_proxy: config.bridge.trusted_proxy.parse()?,
                },
                amount,
                destination,
            );
            let tx = TxBuilder::new(config.bridge.program_id.parse()?).build(&spec)?;

            let mut signers = SignerSet::new().with(Arc::new(payer));
            if let Some(maker) = maker {
                signers = signers.with(Arc::new(maker));
            }
            let submitter = Submitter::new(Arc::new(RpcClient::new(&config.chain)?));
            let signature = submitter.submit(tx, &signers).await?;
            println!("{}", signature);
        }
        Commands::Decode { lines } => {
            let lines = if lines.is_empty() {
                std::io::stdin().lock().lines().collect::<Result<Vec<_>, _>>()?
            } else {
                lines
            };

            let event = if lines.len() == 1 {
                EventCodec::new(config.bridge.trusted_proxy.clone()).decode_line(&lines[0])?
            } else {
                let batch = RawLogBatch {
                    transaction_id: "stdin".to_string(),
                    lines,
                    ..RawLogBatch::default()
                };
                ShieldProcessor::new(config.bridge.trusted_proxy.clone()).process(&batch)?
            };
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        Commands::Slot => {
            let client = RpcClient::new(&config.chain)?;
            println!("{}", client.get_slot().await?);
        }
    }

    Ok(())
}
