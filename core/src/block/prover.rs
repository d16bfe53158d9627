//! Async Prover Service
//!
//! Proving is CPU-bound for seconds at a time, so it runs on a dedicated
//! thread fed by a channel. Async callers await a reply instead of blocking
//! the runtime.

use anyhow::{Context, Result};
use log::{debug, info};
use tokio::sync::{mpsc, oneshot};

use shade_prover::{JSDescription, JoinSplit, PreparedJoinSplit, PreparedWitness, Proof};

/// Request to prove one prepared witness
pub struct ProveRequest {
    pub witness: PreparedWitness,
    pub reply: oneshot::Sender<shade_prover::Result<Proof>>,
}

/// Async prover service for background proving
#[derive(Clone)]
pub struct ProverService {
    request_tx: mpsc::Sender<ProveRequest>,
}

impl ProverService {
    /// Start the prover service. `params` needs a loaded proving key.
    pub fn start(params: JoinSplit) -> Self {
        let (request_tx, mut request_rx) = mpsc::channel::<ProveRequest>(32);

        // Spawn proving thread (separate from tokio runtime for CPU-intensive work)
        std::thread::spawn(move || {
            info!("Prover service started ({} backend)", params.backend_name());
            while let Some(request) = request_rx.blocking_recv() {
                let result = params.prove(&request.witness);
                let _ = request.reply.send(result);
            }
            debug!("Prover service stopped");
        });

        Self { request_tx }
    }

    /// Submit a witness for proving
    pub async fn prove(&self, witness: PreparedWitness) -> Result<Proof> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.request_tx
            .send(ProveRequest {
                witness,
                reply: reply_tx,
            })
            .await
            .context("prover service unavailable")?;

        Ok(reply_rx.await.context("prover crashed")??)
    }

    /// Prove a prepared JoinSplit and assemble its description.
    pub async fn prove_joinsplit(&self, prepared: PreparedJoinSplit) -> Result<JSDescription> {
        let proof = self.prove(prepared.witness.clone()).await?;
        Ok(prepared.into_description(proof))
    }
}
