//! Key Generation CLI for the Shade JoinSplit circuit
//!
//! Runs trusted setup and writes the proving and verifying keys.
//!
//! Usage:
//!   cargo run --package shade-prover --bin keygen -- --pk-out ./params/sprout-groth16.pk --vk-out ./params/sprout-groth16.vk
//!
//! Keys must be regenerated whenever the circuit changes. Default paths come
//! from the `[params]` section of the Shade config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use shade_config::{ProverMode, ShadeConfig};
use shade_prover::{Groth16Backend, JoinSplit, MockBackend, NUM_PUBLIC_INPUTS};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.iter().position(|a| a == "--config") {
        Some(pos) => {
            let path = args.get(pos + 1).context("--config needs a path")?;
            ShadeConfig::load_from(Path::new(path))
        }
        None => ShadeConfig::load(),
    }
    .context("Failed to load config")?;

    // Parse command line arguments
    let mut pk_path: PathBuf = config.params.proving_key_path();
    let mut vk_path: PathBuf = config.params.verifying_key_path();
    let mut mode = config.params.prover_mode;
    let mut force = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--pk-out" => {
                i += 1;
                if i < args.len() {
                    pk_path = PathBuf::from(&args[i]);
                }
            }
            "--vk-out" => {
                i += 1;
                if i < args.len() {
                    vk_path = PathBuf::from(&args[i]);
                }
            }
            // Consumed above.
            "--config" => i += 1,
            "--mock" => mode = ProverMode::Mock,
            "--groth16" => mode = ProverMode::Groth16,
            "--force" | "-f" => {
                force = true;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    // Check if keys already exist
    if !force && pk_path.exists() && vk_path.exists() {
        println!("Keys already exist at:");
        println!("  Proving key:   {}", pk_path.display());
        println!("  Verifying key: {}", vk_path.display());
        println!("\nUse --force to regenerate keys.");
        return Ok(());
    }

    println!("Shade JoinSplit Key Generation");
    println!("==============================");
    println!();
    println!("  Backend:       {:?}", mode);
    println!("  Public inputs: {} (anchor, h_sig, nf[2], cm[2], mac[2],", NUM_PUBLIC_INPUTS);
    println!("                    value_in, value_out)");
    println!();

    println!("Performing circuit-specific setup...");
    if mode == ProverMode::Groth16 {
        println!("This may take a few minutes...");
    }
    let start = std::time::Instant::now();
    let params = match mode {
        ProverMode::Mock => JoinSplit::generate::<MockBackend>(),
        ProverMode::Groth16 => JoinSplit::generate::<Groth16Backend>(),
    }
    .context("Failed to perform circuit setup")?;
    println!("Setup complete in {:?}", start.elapsed());
    println!();

    println!("Saving proving key to {}...", pk_path.display());
    params
        .save_proving_key(&pk_path)
        .context("Failed to write proving key")?;
    let pk_len = file_len(&pk_path)?;
    println!(
        "  Size: {} bytes ({:.2} MB)",
        pk_len,
        pk_len as f64 / 1024.0 / 1024.0
    );

    println!("Saving verifying key to {}...", vk_path.display());
    params
        .save_verifying_key(&vk_path)
        .context("Failed to write verifying key")?;
    let vk_bytes = std::fs::read(&vk_path).context("Failed to read back verifying key")?;
    println!("  Size: {} bytes", vk_bytes.len());

    let vk_hash = blake3::hash(&vk_bytes);
    println!();
    println!("Verification key hash (blake3):");
    println!("  {}", hex::encode(vk_hash.as_bytes()));

    println!();
    println!("Key generation complete!");
    println!();
    println!("To use these keys, set environment variables:");
    println!("  export SHADE_PROVING_KEY={}", pk_path.display());
    println!("  export SHADE_VERIFYING_KEY={}", vk_path.display());
    println!(
        "  export SHADE_PROVER_MODE={}",
        match mode {
            ProverMode::Mock => "mock",
            ProverMode::Groth16 => "groth16",
        }
    );

    Ok(())
}

fn file_len(path: &Path) -> Result<u64> {
    Ok(std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len())
}

fn print_help() {
    println!("Shade JoinSplit Key Generation Tool");
    println!();
    println!("USAGE:");
    println!("    keygen [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --config <PATH>    Read settings from this file instead of the search path");
    println!("    --pk-out <PATH>    Path for proving key output (default: from config)");
    println!("    --vk-out <PATH>    Path for verifying key output (default: from config)");
    println!("    --groth16          Generate Groth16 keys");
    println!("    --mock             Generate mock backend keys");
    println!("    --force, -f        Overwrite existing keys");
    println!("    --help, -h         Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("    keygen --groth16 --pk-out ./params/sprout-groth16.pk --vk-out ./params/sprout-groth16.vk");
    println!("    keygen -f  # Force regeneration of keys");
}
