//! Sweep de recuperación.
//!
//! Cada pasada selecciona artifacts `Pending` o `Claimed` con claim
//! abandonado (más viejos primero, hasta `sweep_batch_size`) y ejecuta un
//! intento por cada uno con el budget del sweep. Es idempotente: si otro
//! worker gana el claim, el candidato se cuenta como `skipped`.
use alt_domain::{Artifact, ArtifactStatus};
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use super::executor::{AttemptExecutor, AttemptReport, AttemptTrigger};
use crate::content::ContentStore;
use crate::errors::PipelineError;
use crate::repo::{ArtifactStore, ClaimMode};

/// Conteo de una pasada.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub completed: usize,
    pub released: usize,
    pub failed: usize,
    pub skipped: usize,
    pub discarded: usize,
    pub errors: usize,
}

impl SweepReport {
    fn record(&mut self, report: &AttemptReport) {
        match report {
            AttemptReport::Completed { .. } => self.completed += 1,
            AttemptReport::Released { .. } => self.released += 1,
            AttemptReport::Failed { .. } | AttemptReport::AttemptsExhausted => self.failed += 1,
            AttemptReport::Skipped | AttemptReport::NotFound => self.skipped += 1,
            AttemptReport::Discarded { .. } => self.discarded += 1,
        }
    }
}

pub struct RecoverySweep<S: ArtifactStore, C: ContentStore> {
    executor: Arc<AttemptExecutor<S, C>>,
    store: Arc<S>,
}

impl<S, C> RecoverySweep<S, C>
    where S: ArtifactStore + 'static,
          C: ContentStore + 'static
{
    pub fn new(executor: Arc<AttemptExecutor<S, C>>, store: Arc<S>) -> Self {
        Self { executor, store }
    }

    fn stale_before(&self) -> Result<DateTime<Utc>, PipelineError> {
        let threshold = chrono::Duration::from_std(self.executor.config().stuck_threshold)
            .map_err(|e| PipelineError::Config(format!("stuck_threshold fuera de rango: {e}")))?;
        Ok(Utc::now() - threshold)
    }

    /// Candidatos de la próxima pasada, sin tomar claims (modo dry-run).
    pub fn candidates(&self) -> Result<Vec<Artifact>, PipelineError> {
        let stale_before = self.stale_before()?;
        Ok(self.store.sweep_candidates(stale_before, self.executor.config().sweep_batch_size)?)
    }

    pub async fn run_once(&self) -> Result<SweepReport, PipelineError> {
        let stale_before = self.stale_before()?;
        let config = self.executor.config();
        let candidates = self.store.sweep_candidates(stale_before, config.sweep_batch_size)?;
        let budget = config.sweep_budget;
        let mut report = SweepReport { examined: candidates.len(), ..SweepReport::default() };
        if candidates.is_empty() {
            debug!("sweep:idle");
            return Ok(report);
        }

        let permits = Arc::new(Semaphore::new(config.sweep_concurrency));
        let mut tasks = JoinSet::new();
        for artifact in candidates {
            let mode = match artifact.status {
                ArtifactStatus::Claimed => ClaimMode::Stale { stale_before },
                _ => ClaimMode::Fresh,
            };
            let permit = Arc::clone(&permits).acquire_owned()
                                             .await
                                             .map_err(|e| PipelineError::Config(format!("semaphore cerrado: {e}")))?;
            let executor = Arc::clone(&self.executor);
            tasks.spawn(async move {
                let _permit = permit;
                (artifact.id, executor.run_attempt(artifact.id, mode, budget, AttemptTrigger::Sweep).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(attempt))) => report.record(&attempt),
                Ok((id, Err(e))) => {
                    error!("sweep:attempt_error artifact_id={id} error={e}");
                    report.errors += 1;
                }
                Err(e) => {
                    error!("sweep:task_failed error={e}");
                    report.errors += 1;
                }
            }
        }
        info!("sweep:pass examined={} completed={} released={} failed={} skipped={} discarded={} errors={}",
              report.examined,
              report.completed,
              report.released,
              report.failed,
              report.skipped,
              report.discarded,
              report.errors);
        Ok(report)
    }

    /// Pasadas periódicas hasta que `shutdown` cambie a `true`. Devuelve el
    /// número de pasadas ejecutadas. Un error en una pasada se registra y el
    /// loop continúa.
    pub async fn run_every(&self, period: Duration, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut passes = 0u64;
        loop {
            if *shutdown.borrow() {
                break;
            }
            if let Err(e) = self.run_once().await {
                error!("sweep:pass_error error={e}");
            }
            passes += 1;
            tokio::select! {
                _ = tokio::time::sleep(period) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("sweep:stopped passes={passes}");
        passes
    }
}
