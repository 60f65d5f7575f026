//! Store en memoria respaldado por `DashMap`.
//!
//! La atomicidad del claim/resolve viene del guard de escritura de la shard
//! (`get_mut`): el predicado y la mutación ocurren bajo el mismo guard. Nunca
//! se toma un guard de `artifacts` y luego uno de `by_fingerprint`; el orden
//! inverso sólo ocurre en `insert`.
use alt_domain::{Artifact, ArtifactStatus, Fingerprint, NewArtifact, ResultAttempt};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::debug;
use uuid::Uuid;

use super::types::*;
use crate::constants::ATTEMPTS_EXHAUSTED;

#[derive(Debug, Clone)]
struct Row {
    artifact: Artifact,
    result: ResultAttempt,
}

#[derive(Default)]
pub struct InMemoryArtifactStore {
    rows: DashMap<Uuid, Row>,
    by_fingerprint: DashMap<Fingerprint, Uuid>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn insert(&self, new: NewArtifact, now: DateTime<Utc>) -> Result<InsertOutcome, StoreError> {
        match self.by_fingerprint.entry(new.content_fingerprint.clone()) {
            Entry::Occupied(existing) => {
                let id = *existing.get();
                drop(existing);
                let artifact = self.get(id)?.ok_or(StoreError::NotFound)?;
                Ok(InsertOutcome::Existing(artifact))
            }
            Entry::Vacant(slot) => {
                let artifact = Artifact::new_pending(new, now);
                let row = Row { result: ResultAttempt::empty(artifact.id), artifact: artifact.clone() };
                self.rows.insert(artifact.id, row);
                slot.insert(artifact.id);
                debug!("insert:created artifact_id={} fingerprint={}", artifact.id, artifact.content_fingerprint);
                Ok(InsertOutcome::Created(artifact))
            }
        }
    }

    fn get(&self, id: Uuid) -> Result<Option<Artifact>, StoreError> {
        Ok(self.rows.get(&id).map(|r| r.artifact.clone()))
    }

    fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Option<Artifact>, StoreError> {
        let id = self.by_fingerprint.get(fingerprint).map(|r| *r.value());
        match id {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }

    fn get_result(&self, id: Uuid) -> Result<Option<ResultAttempt>, StoreError> {
        Ok(self.rows.get(&id).map(|r| r.result.clone()))
    }

    fn try_claim(&self, id: Uuid, request: &ClaimRequest) -> Result<ClaimOutcome, StoreError> {
        let Some(mut row) = self.rows.get_mut(&id) else {
            return Ok(ClaimOutcome::NotFound);
        };
        let eligible = match request.mode {
            ClaimMode::Fresh => row.artifact.status == ArtifactStatus::Pending,
            ClaimMode::Stale { stale_before } => row.artifact.is_stale_claim(stale_before),
        };
        if !eligible {
            return Ok(ClaimOutcome::Busy);
        }
        if row.result.attempt_count >= request.max_attempts {
            if row.artifact.status == ArtifactStatus::Pending {
                // Fail exige pasar por Claimed.
                row.artifact.claim(request.now)?;
            }
            row.artifact.fail(ATTEMPTS_EXHAUSTED)?;
            row.result.last_error = Some(ATTEMPTS_EXHAUSTED.to_string());
            return Ok(ClaimOutcome::AttemptsExhausted);
        }
        let revision = row.artifact.claim(request.now)?;
        let attempt = row.result.begin_attempt(request.now);
        Ok(ClaimOutcome::Claimed(ClaimToken { artifact_id: id, revision, attempt }))
    }

    fn resolve(&self, token: &ClaimToken, resolution: Resolution, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let Some(mut row) = self.rows.get_mut(&token.artifact_id) else {
            return Err(StoreError::NotFound);
        };
        if !row.artifact.holds_claim(token.revision) {
            return Ok(false);
        }
        let row = &mut *row;
        match resolution {
            Resolution::Completed(done) => {
                row.artifact.complete()?;
                row.result.output = Some(done.output);
                row.result.model_used = Some(done.model_used);
                row.result.raw_response = done.raw_response;
                row.result.prompt = done.prompt;
                row.result.usage = done.usage;
                row.result.provider_response_id = done.provider_response_id;
                row.result.finish_reason = done.finish_reason;
                row.result.completed_at = Some(now);
                row.result.last_error = None;
            }
            Resolution::Released { note } => {
                row.artifact.release()?;
                row.result.last_error = note;
            }
            Resolution::Failed { error } => {
                row.artifact.fail(error.clone())?;
                row.result.completed_at = Some(now);
                row.result.last_error = Some(error);
            }
        }
        Ok(true)
    }

    fn sweep_candidates(&self, stale_before: DateTime<Utc>, limit: usize) -> Result<Vec<Artifact>, StoreError> {
        let mut out: Vec<Artifact> = self.rows
                                         .iter()
                                         .filter(|r| {
                                             r.artifact.status == ArtifactStatus::Pending
                                             || r.artifact.is_stale_claim(stale_before)
                                         })
                                         .map(|r| r.artifact.clone())
                                         .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        out.truncate(limit);
        Ok(out)
    }
}
