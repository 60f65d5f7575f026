//! Artifact: unidad de trabajo enviada por el usuario.
//!
//! Campos inmutables tras la creación: `id`, `content_fingerprint`, `size`,
//! `detected_kind`. El resto (`status`, `claimed_at`, `claim_revision`,
//! `error`) sólo cambia mediante las transiciones de esta estructura, que el
//! store aplica dentro de su escritura condicional.
//!
//! Invariante: `claimed_at.is_some()` si y sólo si `status == Claimed`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ArtifactStatus, DetectedKind, DomainError, Fingerprint};

/// Datos de entrada para crear un artifact (el store asigna el resto).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArtifact {
    pub content_fingerprint: Fingerprint,
    pub size: u64,
    pub detected_kind: DetectedKind,
    pub original_filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Uuid,
    pub content_fingerprint: Fingerprint,
    pub size: u64,
    pub detected_kind: DetectedKind,
    pub original_filename: Option<String>,
    pub status: ArtifactStatus,
    pub claimed_at: Option<DateTime<Utc>>,
    /// Token lógico del claim vigente; crece en cada claim exitoso.
    pub claim_revision: u64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new_pending(new: NewArtifact, now: DateTime<Utc>) -> Self {
        Self { id: Uuid::new_v4(),
               content_fingerprint: new.content_fingerprint,
               size: new.size,
               detected_kind: new.detected_kind,
               original_filename: new.original_filename,
               status: ArtifactStatus::Pending,
               claimed_at: None,
               claim_revision: 0,
               error: None,
               created_at: now }
    }

    /// Toma el artifact (Pending -> Claimed, o Claimed -> Claimed en re-claim).
    /// Devuelve la nueva revisión, que actúa como token del intento.
    pub fn claim(&mut self, now: DateTime<Utc>) -> Result<u64, DomainError> {
        self.status.ensure_transition(ArtifactStatus::Claimed)?;
        self.status = ArtifactStatus::Claimed;
        self.claimed_at = Some(now);
        self.claim_revision += 1;
        Ok(self.claim_revision)
    }

    /// Claimed -> Pending: libera el claim para un intento posterior.
    pub fn release(&mut self) -> Result<(), DomainError> {
        self.status.ensure_transition(ArtifactStatus::Pending)?;
        self.status = ArtifactStatus::Pending;
        self.claimed_at = None;
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), DomainError> {
        self.status.ensure_transition(ArtifactStatus::Completed)?;
        self.status = ArtifactStatus::Completed;
        self.claimed_at = None;
        self.error = None;
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), DomainError> {
        self.status.ensure_transition(ArtifactStatus::Failed)?;
        self.status = ArtifactStatus::Failed;
        self.claimed_at = None;
        self.error = Some(error.into());
        Ok(())
    }

    /// true si el claim vigente es anterior a `stale_before`.
    pub fn is_stale_claim(&self, stale_before: DateTime<Utc>) -> bool {
        self.status == ArtifactStatus::Claimed && self.claimed_at.is_some_and(|at| at < stale_before)
    }

    pub fn holds_claim(&self, revision: u64) -> bool {
        self.status == ArtifactStatus::Claimed && self.claim_revision == revision
    }

    pub fn check_invariants(&self) -> Result<(), DomainError> {
        if self.claimed_at.is_some() != (self.status == ArtifactStatus::Claimed) {
            return Err(DomainError::Validation(format!("claimed_at inconsistente con status={}", self.status)));
        }
        if self.error.is_some() && self.status != ArtifactStatus::Failed {
            return Err(DomainError::Validation(format!("error presente con status={}", self.status)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> Artifact {
        Artifact::new_pending(NewArtifact { content_fingerprint: Fingerprint::of_bytes(b"img"),
                                            size: 3,
                                            detected_kind: DetectedKind::Png,
                                            original_filename: Some("a.png".into()) },
                              Utc::now())
    }

    #[test]
    fn claim_bumps_revision_and_stamps_time() {
        let mut a = sample();
        let now = Utc::now();
        assert_eq!(a.claim(now).unwrap(), 1);
        assert_eq!(a.claimed_at, Some(now));
        assert!(a.holds_claim(1));
        a.check_invariants().unwrap();
    }

    #[test]
    fn release_clears_claimed_at() {
        let mut a = sample();
        a.claim(Utc::now()).unwrap();
        a.release().unwrap();
        assert_eq!(a.status, ArtifactStatus::Pending);
        assert!(a.claimed_at.is_none());
        a.check_invariants().unwrap();
    }

    #[test]
    fn completed_cannot_be_claimed_again() {
        let mut a = sample();
        a.claim(Utc::now()).unwrap();
        a.complete().unwrap();
        assert!(a.claim(Utc::now()).is_err());
        assert_eq!(a.claim_revision, 1);
    }

    #[test]
    fn stale_detection_uses_claimed_at() {
        let mut a = sample();
        let then = Utc::now() - Duration::minutes(30);
        a.claim(then).unwrap();
        assert!(a.is_stale_claim(Utc::now() - Duration::minutes(10)));
        assert!(!a.is_stale_claim(then));
    }
}
