//! Demo en memoria del pipeline: envío con intento síncrono que agota su
//! budget y recuperación posterior por el sweep.
use alt_core::provider::{ScriptStep, ScriptedProvider};
use alt_core::{InMemoryArtifactStore, InMemoryContentStore, Pipeline, PipelineConfig, ProviderErrorKind, Submission};
use altflow::errors::CoreError;
use std::sync::Arc;
use std::time::Duration;

fn demo_png() -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(b"\x00\x00\x00\x0dIHDR-demo");
    bytes
}

async fn run_demo() -> Result<(), CoreError> {
    let provider = ScriptedProvider::new().script("vendor/slow-model",
                                                  [ScriptStep::succeed_after(Duration::from_secs(2), "never used"),
                                                   ScriptStep::fail(ProviderErrorKind::Transient, "HTTP 502")])
                                          .script("vendor/fast-model", [ScriptStep::succeed("A lighthouse on a rocky coast at dusk.")]);
    let config = PipelineConfig::new(vec!["vendor/slow-model".into(), "vendor/fast-model".into()])
        .with_per_call_timeout(Duration::from_secs(1))
        .with_budgets(Duration::from_secs(1), Duration::from_secs(10))
        .with_stuck_threshold(Duration::from_secs(30));
    let pipeline = Pipeline::new(Arc::new(InMemoryArtifactStore::new()),
                                 Arc::new(InMemoryContentStore::new()),
                                 Arc::new(provider),
                                 config,
                                 alt_providers::DEFAULT_PROMPT)?;

    let receipt = pipeline.submit(Submission::new(demo_png()).with_filename("lighthouse.png")).await?;
    println!("submit: artifact={} status={} note={:?}",
             receipt.artifact_id(),
             receipt.status.status,
             receipt.status.last_error);

    let duplicate = pipeline.submit(Submission::new(demo_png())).await?;
    println!("duplicate submit: same artifact={} sync_attempt={:?}",
             duplicate.artifact_id() == receipt.artifact_id(),
             duplicate.sync_attempt);

    let report = pipeline.sweep().await?;
    println!("sweep: {report:?}");

    let status = pipeline.get_status(receipt.artifact_id())?;
    let json = serde_json::to_string_pretty(&status).map_err(|e| CoreError::Internal(e.to_string()))?;
    println!("status:\n{json}");
    Ok(())
}

#[tokio::main]
async fn main() {
    altflow::logging::init_logging(false);
    if let Err(e) = run_demo().await {
        eprintln!("demo error: {e}");
        std::process::exit(1);
    }
}
