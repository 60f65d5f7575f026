//! Binario de operación: sweep (una pasada o periódico), submit y status.
//!
//! Códigos de salida: 0 ok, 2 uso, 3 configuración, 4 no encontrado,
//! 5 error de backend.
mod args;

use alt_core::PipelineError;
use altflow::wiring::{build_pg_pipeline, PgPipeline};
use altflow::{AppConfig, CoreError};
use args::{Command, USAGE};
use log::info;
use std::time::Duration;

fn exit_code(err: &CoreError) -> i32 {
    match err {
        CoreError::Config(_) => 3,
        CoreError::Pipeline(PipelineError::NotFound(_)) => 4,
        CoreError::Pipeline(PipelineError::Validation(_)) => 2,
        _ => 5,
    }
}

async fn sweep(pipeline: &PgPipeline, dry_run: bool, every: Option<u64>) -> Result<(), CoreError> {
    if dry_run {
        let candidates = pipeline.recovery_sweep().candidates()?;
        println!("dry-run: {} candidato(s)", candidates.len());
        for a in candidates {
            println!("  {} status={} created_at={} fingerprint={}", a.id, a.status, a.created_at, a.content_fingerprint);
        }
        return Ok(());
    }
    match every {
        None => {
            let report = pipeline.sweep().await?;
            println!("{}", serde_json::json!({
                "examined": report.examined,
                "completed": report.completed,
                "released": report.released,
                "failed": report.failed,
                "skipped": report.skipped,
                "discarded": report.discarded,
                "errors": report.errors,
            }));
            Ok(())
        }
        Some(secs) => {
            let (tx, rx) = tokio::sync::watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("sweep: ctrl-c recibido, deteniendo");
                    let _ = tx.send(true);
                }
            });
            let passes = pipeline.recovery_sweep().run_every(Duration::from_secs(secs), rx).await;
            println!("sweep detenido tras {passes} pasada(s)");
            Ok(())
        }
    }
}

async fn run(cli: args::Cli) -> Result<(), CoreError> {
    let mut cfg = AppConfig::from_env()?;
    if let Command::Sweep { batch_size: Some(n), .. } = &cli.command {
        cfg.pipeline = cfg.pipeline.clone().with_sweep_batch(*n, cfg.pipeline.sweep_concurrency);
    }
    let pipeline = build_pg_pipeline(&cfg)?;
    match cli.command {
        Command::Sweep { dry_run, every, .. } => sweep(&pipeline, dry_run, every).await,
        Command::Submit { file } => {
            let bytes = std::fs::read(&file)?;
            let mut submission = alt_core::Submission::new(bytes);
            if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
                submission = submission.with_filename(name);
            }
            let receipt = pipeline.submit(submission).await?;
            let json = serde_json::to_string_pretty(&receipt.status).map_err(|e| CoreError::Internal(e.to_string()))?;
            println!("{json}");
            Ok(())
        }
        Command::Status { id } => {
            let status = pipeline.get_status(id)?;
            let json = serde_json::to_string_pretty(&status).map_err(|e| CoreError::Internal(e.to_string()))?;
            println!("{json}");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = match args::parse(&argv) {
        Ok(cli) => cli,
        Err(msg) => {
            eprintln!("{msg}\n{USAGE}");
            std::process::exit(2);
        }
    };
    altflow::logging::init_logging(cli.verbose);
    if let Err(e) = run(cli).await {
        eprintln!("[alt-cli] error: {e}");
        std::process::exit(exit_code(&e));
    }
}
