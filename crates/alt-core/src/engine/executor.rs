//! Executor de intentos: claim -> llamada con fallback -> resolución.
//!
//! El executor es la única pieza que muta el estado de un artifact después de
//! la ingesta. Toda mutación pasa por el store como escritura condicional:
//! `try_claim` al inicio y `resolve` (atada a la revisión del claim) al final.
//! Si entre ambas otro worker re-tomó el artifact, la resolución se descarta.
use alt_domain::Artifact;
use chrono::Utc;
use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::constants::{ATTEMPTS_EXHAUSTED, CONTENT_NOT_FOUND, SYNC_DEFERRED_NOTE};
use crate::content::{ContentError, ContentStore};
use crate::errors::PipelineError;
use crate::provider::{CallOutcome, FallbackCaller, ProviderContent};
use crate::repo::{ArtifactStore, ClaimMode, ClaimOutcome, ClaimRequest, ClaimToken, CompletedOutput, Resolution};

/// Quién dispara el intento; sólo cambia la nota registrada al agotar budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptTrigger {
    Sync,
    Sweep,
}

impl fmt::Display for AttemptTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttemptTrigger::Sync => "sync",
            AttemptTrigger::Sweep => "sweep",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptReport {
    /// El claim no se obtuvo (otro worker lo tiene o ya es terminal). No es falla.
    Skipped,
    NotFound,
    Completed { model: String, attempt: u32 },
    /// Budget agotado o fallas reintentables: vuelve a Pending.
    Released { attempt: u32 },
    Failed { attempt: u32, error: String },
    /// El claim encontró el contador en el tope; el artifact pasó a Failed.
    AttemptsExhausted,
    /// La resolución llegó tarde: el claim ya no era de este intento.
    Discarded { attempt: u32 },
}

impl AttemptReport {
    pub fn label(&self) -> &'static str {
        match self {
            AttemptReport::Skipped => "skipped",
            AttemptReport::NotFound => "not_found",
            AttemptReport::Completed { .. } => "completed",
            AttemptReport::Released { .. } => "released",
            AttemptReport::Failed { .. } => "failed",
            AttemptReport::AttemptsExhausted => "attempts_exhausted",
            AttemptReport::Discarded { .. } => "discarded",
        }
    }
}

pub struct AttemptExecutor<S: ArtifactStore, C: ContentStore> {
    store: Arc<S>,
    content: Arc<C>,
    caller: FallbackCaller,
    config: Arc<PipelineConfig>,
    prompt: Arc<str>,
}

impl<S: ArtifactStore, C: ContentStore> AttemptExecutor<S, C> {
    pub fn new(store: Arc<S>, content: Arc<C>, caller: FallbackCaller, config: Arc<PipelineConfig>, prompt: Arc<str>) -> Self {
        Self { store, content, caller, config, prompt }
    }

    pub fn config(&self) -> &PipelineConfig { &self.config }

    /// Ejecuta un intento completo sobre `artifact_id` dentro de `budget`.
    ///
    /// Los errores del proveedor nunca salen como `Err`: quedan en el
    /// artifact. `Err` sólo refleja fallas del store.
    pub async fn run_attempt(&self,
                             artifact_id: Uuid,
                             mode: ClaimMode,
                             budget: Duration,
                             trigger: AttemptTrigger)
                             -> Result<AttemptReport, PipelineError> {
        let started = Instant::now();
        let Some(artifact) = self.store.get(artifact_id)? else {
            return Ok(AttemptReport::NotFound);
        };

        let request = ClaimRequest { mode, now: Utc::now(), max_attempts: self.config.max_attempts };
        let token = match self.store.try_claim(artifact_id, &request)? {
            ClaimOutcome::Claimed(token) => token,
            ClaimOutcome::Busy => {
                debug!("attempt:skip artifact_id={artifact_id} trigger={trigger} reason=not_claimable");
                return Ok(AttemptReport::Skipped);
            }
            ClaimOutcome::NotFound => return Ok(AttemptReport::NotFound),
            ClaimOutcome::AttemptsExhausted => {
                warn!("attempt:cap_reached artifact_id={artifact_id} trigger={trigger} max={}", self.config.max_attempts);
                return Ok(AttemptReport::AttemptsExhausted);
            }
        };
        info!("attempt:claimed artifact_id={artifact_id} revision={} attempt={} trigger={trigger}",
              token.revision,
              token.attempt);

        let resolution = match self.load_content(&artifact) {
            Ok(content) => {
                let remaining = budget.saturating_sub(started.elapsed());
                let outcome = self.caller
                                  .call(&self.config.model_order, &self.prompt, &content, remaining)
                                  .await;
                self.resolution_for(outcome, &token, trigger)
            }
            Err(ContentError::NotFound(fp)) => {
                warn!("attempt:content_missing artifact_id={artifact_id} fingerprint={fp}");
                Resolution::Failed { error: CONTENT_NOT_FOUND.to_string() }
            }
            Err(e @ ContentError::Io(_)) => {
                warn!("attempt:content_io artifact_id={artifact_id} error={e}");
                self.retry_or_fail(&token, e.to_string())
            }
        };

        let report = report_for(&resolution, &token);
        let label = resolution.label();
        if self.store.resolve(&token, resolution, Utc::now())? {
            info!("attempt:resolved artifact_id={artifact_id} attempt={} outcome={label} elapsed_ms={}",
                  token.attempt,
                  started.elapsed().as_millis());
            Ok(report)
        } else {
            warn!("attempt:discarded artifact_id={artifact_id} revision={} outcome={label} reason=claim_superseded",
                  token.revision);
            Ok(AttemptReport::Discarded { attempt: token.attempt })
        }
    }

    fn load_content(&self, artifact: &Artifact) -> Result<ProviderContent, ContentError> {
        let bytes = self.content.get(&artifact.content_fingerprint)?;
        Ok(ProviderContent { mime_type: artifact.detected_kind.mime_type().to_string(), bytes })
    }

    fn resolution_for(&self, outcome: CallOutcome, token: &ClaimToken, trigger: AttemptTrigger) -> Resolution {
        if outcome.is_terminal_failure() {
            let error = outcome.error_summary().unwrap_or_else(|| "provider failure".to_string());
            return Resolution::Failed { error };
        }
        match outcome {
            CallOutcome::Success { model, response } => {
                Resolution::Completed(CompletedOutput { output: response.text,
                                                        model_used: model,
                                                        raw_response: response.raw,
                                                        prompt: Some(self.prompt.to_string()),
                                                        usage: response.usage,
                                                        provider_response_id: response.response_id,
                                                        finish_reason: response.finish_reason })
            }
            CallOutcome::Exhausted { .. } if trigger == AttemptTrigger::Sync && token.attempt < self.config.max_attempts => {
                Resolution::Released { note: Some(SYNC_DEFERRED_NOTE.to_string()) }
            }
            other => {
                let note = other.error_summary().unwrap_or_else(|| "budget exhausted".to_string());
                self.retry_or_fail(token, note)
            }
        }
    }

    /// Pending si quedan intentos; Failed "attempts exhausted" si no.
    fn retry_or_fail(&self, token: &ClaimToken, note: String) -> Resolution {
        if token.attempt < self.config.max_attempts {
            Resolution::Released { note: Some(note) }
        } else {
            Resolution::Failed { error: format!("{ATTEMPTS_EXHAUSTED} (last error: {note})") }
        }
    }
}

fn report_for(resolution: &Resolution, token: &ClaimToken) -> AttemptReport {
    match resolution {
        Resolution::Completed(done) => AttemptReport::Completed { model: done.model_used.clone(), attempt: token.attempt },
        Resolution::Released { .. } => AttemptReport::Released { attempt: token.attempt },
        Resolution::Failed { error } => AttemptReport::Failed { attempt: token.attempt, error: error.clone() },
    }
}
