//! JoinSplit creation benchmark.
//!
//! Loads the configured keys, then builds, proves and verifies a handful of
//! all-dummy JoinSplits against the empty anchor.
//!
//! Usage:
//!   cargo run --release --package shade-prover --bin create-joinsplit -- [COUNT]

use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use log::info;
use rand::rngs::OsRng;
use shade_config::ShadeConfig;
use shade_privacy::Anchor;
use shade_prover::{JSDescription, JSInput, JSOutput, JoinSplit};

const DEFAULT_RUNS: usize = 5;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let runs = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<usize>()
            .with_context(|| format!("Invalid run count: {}", arg))?,
        None => DEFAULT_RUNS,
    };

    let config = ShadeConfig::global();
    let mut params = JoinSplit::from_config(&config.params).with_context(|| {
        format!(
            "Failed to open keys in {} (run keygen first)",
            config.params.dir
        )
    })?;
    params
        .load_proving_key()
        .context("Failed to load proving key")?;
    info!("Using {} backend", params.backend_name());

    let mut rng = OsRng;
    let pubkey_hash = [0u8; 32];
    let anchor = Anchor::empty();
    let mut prove_total = Duration::ZERO;
    let mut verify_total = Duration::ZERO;

    for run in 0..runs {
        let inputs = [JSInput::dummy(&mut rng)?, JSInput::dummy(&mut rng)?];
        let outputs = [JSOutput::dummy(&mut rng), JSOutput::dummy(&mut rng)];

        let start = Instant::now();
        let (description, _) = JSDescription::new(
            &params,
            &pubkey_hash,
            &anchor,
            &inputs,
            &outputs,
            0,
            0,
            &mut rng,
        )
        .context("Failed to create joinsplit")?;
        let proved = start.elapsed();

        let start = Instant::now();
        let valid = description
            .verify(&params, &pubkey_hash)
            .context("Verifier failed")?;
        let verified = start.elapsed();

        if !valid {
            bail!("run {}: joinsplit failed verification", run);
        }
        info!("run {}: prove {:?}, verify {:?}", run, proved, verified);
        prove_total += proved;
        verify_total += verified;
    }

    if runs > 0 {
        info!(
            "{} runs: mean prove {:?}, mean verify {:?}",
            runs,
            prove_total / runs as u32,
            verify_total / runs as u32
        );
    }
    Ok(())
}
