//! Fachada del pipeline: envío con intento síncrono y consulta de estado.
use alt_domain::ArtifactStatus;
use log::info;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::executor::{AttemptExecutor, AttemptReport, AttemptTrigger};
use super::sweep::{RecoverySweep, SweepReport};
use crate::config::PipelineConfig;
use crate::content::{ContentStore, PreviewRenderer};
use crate::errors::PipelineError;
use crate::ingest::{IngestGate, IngestOutcome, Submission};
use crate::provider::{FallbackCaller, ModelProvider};
use crate::repo::{ArtifactStore, ClaimMode};

/// Vista de estado expuesta a quien consulta un artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub artifact_id: Uuid,
    pub status: ArtifactStatus,
    pub output: Option<String>,
    pub model_used: Option<String>,
    pub error: Option<String>,
    pub attempt_count: u32,
    pub last_error: Option<String>,
}

/// Respuesta de `submit`: la ingesta más, si hubo, el intento síncrono.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub ingest: IngestOutcome,
    pub sync_attempt: Option<AttemptReport>,
    pub status: StatusView,
}

impl SubmissionReceipt {
    pub fn artifact_id(&self) -> Uuid { self.status.artifact_id }
}

pub struct Pipeline<S: ArtifactStore, C: ContentStore> {
    store: Arc<S>,
    gate: IngestGate<S, C>,
    executor: Arc<AttemptExecutor<S, C>>,
    sweep: RecoverySweep<S, C>,
}

impl<S, C> Pipeline<S, C>
    where S: ArtifactStore + 'static,
          C: ContentStore + 'static
{
    pub fn new(store: Arc<S>,
               content: Arc<C>,
               provider: Arc<dyn ModelProvider>,
               config: PipelineConfig,
               prompt: impl Into<Arc<str>>)
               -> Result<Self, PipelineError> {
        config.validate()?;
        let config = Arc::new(config);
        let caller = FallbackCaller::new(provider, config.per_call_timeout, config.min_call_budget);
        let gate = IngestGate::new(Arc::clone(&store), Arc::clone(&content), config.max_content_bytes);
        let executor = Arc::new(AttemptExecutor::new(Arc::clone(&store), content, caller, config, prompt.into()));
        let sweep = RecoverySweep::new(Arc::clone(&executor), Arc::clone(&store));
        Ok(Self { store, gate, executor, sweep })
    }

    pub fn with_preview_renderer(mut self, renderer: Arc<dyn PreviewRenderer>) -> Self {
        self.gate = self.gate.with_preview_renderer(renderer);
        self
    }

    /// Ingresa el contenido y, si este envío creó el artifact, ejecuta el
    /// intento síncrono con el budget corto. Los envíos que se adjuntan a un
    /// artifact existente sólo observan su estado.
    pub async fn submit(&self, submission: Submission) -> Result<SubmissionReceipt, PipelineError> {
        let ingest = self.gate.ingest(&submission)?;
        let artifact_id = ingest.artifact().id;
        let sync_attempt = match &ingest {
            IngestOutcome::Created(_) => {
                let budget = self.executor.config().sync_budget;
                Some(self.executor.run_attempt(artifact_id, ClaimMode::Fresh, budget, AttemptTrigger::Sync).await?)
            }
            _ => None,
        };
        let status = self.get_status(artifact_id)?;
        info!("submit:done artifact_id={artifact_id} status={} sync={}",
              status.status,
              sync_attempt.as_ref().map_or("none", |r| r.label()));
        Ok(SubmissionReceipt { ingest, sync_attempt, status })
    }

    pub fn get_status(&self, artifact_id: Uuid) -> Result<StatusView, PipelineError> {
        let artifact = self.store.get(artifact_id)?.ok_or(PipelineError::NotFound(artifact_id))?;
        let result = self.store.get_result(artifact_id)?;
        let (output, model_used, attempt_count, last_error) = match result {
            Some(r) => (r.output, r.model_used, r.attempt_count, r.last_error),
            None => (None, None, 0, None),
        };
        Ok(StatusView { artifact_id,
                        status: artifact.status,
                        output,
                        model_used,
                        error: artifact.error,
                        attempt_count,
                        last_error })
    }

    pub async fn sweep(&self) -> Result<SweepReport, PipelineError> { self.sweep.run_once().await }

    pub fn recovery_sweep(&self) -> &RecoverySweep<S, C> { &self.sweep }

    pub fn executor(&self) -> &Arc<AttemptExecutor<S, C>> { &self.executor }

    pub fn store(&self) -> &Arc<S> { &self.store }
}
