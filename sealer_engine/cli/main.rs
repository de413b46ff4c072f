//! `sealer` command line.
//!
//! Runs a single sealer against the in-memory secret store and the simulated ElGamal
//! backend. Interaction requests are printed to stdout instead of being relayed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use num_bigint::BigUint;
use tracing::info;

use sealer_engine::interaction::{InteractionRequest, InteractionTransport};
use sealer_engine::logging::init_logging;
use sealer_engine::primitive::ElGamalPrimitive;
use sealer_engine::primitive::simulated::{GroupSpec, SimulatedElGamal};
use sealer_engine::secrets::memory::MemorySecretStore;
use sealer_engine::types::{EncryptionBatch, Entropy};
use sealer_engine::{Sealer, SealerConfig, SealerError, SealerResult, SecureScalarSampler};

#[derive(Parser)]
#[command(name = "sealer", version = "0.1", about = "Threshold ElGamal sealer CLI")]
struct Cli {
    /// JSON config file. Without it, defaults overlaid with SEALER_* variables.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write daily-rolling logs to this directory
    #[arg(long)]
    log_dir: Option<String>,

    #[arg(long, help = "Write file logs as JSON instead of logfmt")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a public key share for a secret and emit it
    Keygen {
        #[arg(short, long)]
        label: String,

        #[arg(short, long, help = "Hex-encoded secret entropy")]
        entropy: String,
    },

    /// Partially decrypt a JSON batch of ciphertexts and emit the result
    Decrypt {
        #[arg(short, long)]
        label: String,

        #[arg(short, long, help = "Hex-encoded secret entropy")]
        entropy: String,

        #[arg(long, help = "File holding a JSON array of {a, b} ciphertexts")]
        encryptions: PathBuf,
    },

    /// Encrypt small integers under the public key derived from the entropy
    Encrypt {
        #[arg(short, long, help = "Hex-encoded secret entropy")]
        entropy: String,

        #[arg(short, long, required = true)]
        message: Vec<u64>, // e.g., --message 3 --message 7
    },

    /// Print one secure scalar in [0, modulus)
    Sample {
        #[arg(short, long)]
        modulus: String,

        #[arg(long, help = "Read the modulus as hex")]
        hex: bool,
    },
}

/// Prints each interaction request as one line of JSON.
struct StdoutTransport;

#[async_trait]
impl InteractionTransport for StdoutTransport {
    async fn start_interaction(&self, request: InteractionRequest) -> SealerResult<()> {
        let line = serde_json::to_string(&request)
            .map_err(|e| SealerError::TransportFailure(e.to_string()))?;
        println!("{line}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // keep the guard alive so the file writer flushes on exit
    let _guard = init_logging(cli.log_dir.as_deref(), cli.json_logs);

    let config = match &cli.config {
        Some(path) => SealerConfig::from_json_file(path)?,
        None => SealerConfig::from_env()?,
    };

    match cli.command {
        Commands::Keygen { label, entropy } => {
            let sealer = sealer_for(&label, &entropy, config)?;
            let share = sealer.keygen_and_emit().await?;
            info!(sealer = %share.sealer, "public key share emitted");
        }

        Commands::Decrypt {
            label,
            entropy,
            encryptions,
        } => {
            let raw = std::fs::read_to_string(&encryptions)
                .with_context(|| format!("reading {}", encryptions.display()))?;
            let batch: EncryptionBatch =
                serde_json::from_str(&raw).context("parsing encryption batch")?;
            if batch.is_empty() {
                bail!("encryption batch is empty");
            }

            let sealer = sealer_for(&label, &entropy, config)?;
            let share = sealer.decrypt_and_emit(&batch).await?;
            info!(sealer = %share.sealer, count = batch.len(), "partial decryption emitted");
        }

        Commands::Encrypt { entropy, message } => {
            let primitive = SimulatedElGamal::new(GroupSpec::oakley_768());
            primitive.initialize().await?;
            let keys = primitive
                .setup_from_entropy(&Entropy::new(decode_entropy(&entropy)?))
                .await?;

            let mut sampler = SecureScalarSampler::os(&config);
            let mut batch = Vec::with_capacity(message.len());
            for m in message {
                let k = sampler.sample(&primitive.group().q)?;
                batch.push(SimulatedElGamal::encrypt(
                    &keys.params,
                    &keys.public_key,
                    m,
                    &k.to_biguint(),
                )?);
            }
            println!("{}", serde_json::to_string_pretty(&EncryptionBatch(batch))?);
        }

        Commands::Sample { modulus, hex } => {
            let radix = if hex { 16 } else { 10 };
            let modulus = BigUint::parse_bytes(modulus.trim_start_matches("0x").as_bytes(), radix)
                .with_context(|| format!("modulus '{modulus}' is not a base-{radix} integer"))?;
            let mut sampler = SecureScalarSampler::os(&config);
            let scalar = sampler.sample(&modulus)?;
            println!("{}", scalar.to_decimal().as_str());
        }
    }

    Ok(())
}

/// One sealer whose only secret is `label`, already active.
fn sealer_for(label: &str, entropy: &str, config: SealerConfig) -> Result<Sealer> {
    let store = Arc::new(MemorySecretStore::new());
    let secret = store.add_secret(label, &decode_entropy(entropy)?)?;
    store.activate(&secret.id)?;

    let primitive = Arc::new(SimulatedElGamal::new(GroupSpec::oakley_768()));
    Ok(Sealer::new(store, primitive, Arc::new(StdoutTransport), config))
}

fn decode_entropy(raw: &str) -> Result<Vec<u8>> {
    let bytes = hex::decode(raw.trim()).context("entropy must be hex")?;
    if bytes.is_empty() {
        bail!("entropy must not be empty");
    }
    Ok(bytes)
}

// cargo run -p sealer-cli -- keygen --label alice --entropy 00112233
// cargo run -p sealer-cli -- encrypt --entropy 00112233 --message 3 > batch.json
// cargo run -p sealer-cli -- decrypt --label alice --entropy 00112233 --encryptions batch.json
// cargo run -p sealer-cli -- sample --modulus 3fb --hex
