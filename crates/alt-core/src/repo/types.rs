use alt_domain::{Artifact, DomainError, Fingerprint, NewArtifact, ResultAttempt, Usage};
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("store backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Resultado de `ArtifactStore::insert`.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    /// Fila nueva (Pending) con su `ResultAttempt` vacío.
    Created(Artifact),
    /// Ya existía un artifact con el mismo fingerprint (inserción perdedora
    /// o duplicado): se devuelve la fila ganadora.
    Existing(Artifact),
}

/// Predicado del claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimMode {
    /// `status = Pending`.
    Fresh,
    /// `status = Claimed AND claimed_at < stale_before`.
    Stale { stale_before: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy)]
pub struct ClaimRequest {
    pub mode: ClaimMode,
    pub now: DateTime<Utc>,
    pub max_attempts: u32,
}

/// Token del intento: identifica el claim que debe seguir vigente al resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimToken {
    pub artifact_id: Uuid,
    pub revision: u64,
    /// Valor de `attempt_count` tras este claim.
    pub attempt: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed(ClaimToken),
    /// El predicado no se cumplió: otro worker lo tiene o ya es terminal.
    Busy,
    /// El predicado se cumplió pero no quedan intentos; el artifact pasó a Failed.
    AttemptsExhausted,
    NotFound,
}

/// Salida exitosa a persistir.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedOutput {
    pub output: String,
    pub model_used: String,
    pub raw_response: Option<Value>,
    pub prompt: Option<String>,
    pub usage: Option<Usage>,
    pub provider_response_id: Option<String>,
    pub finish_reason: Option<String>,
}

/// Resolución de un intento (Claimed -> {Completed, Pending, Failed}).
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Completed(CompletedOutput),
    /// Libera el claim; `note` queda en `ResultAttempt::last_error`.
    Released { note: Option<String> },
    Failed { error: String },
}

impl Resolution {
    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Completed(_) => "completed",
            Resolution::Released { .. } => "released",
            Resolution::Failed { .. } => "failed",
        }
    }
}

/// Almacenamiento de artifacts y sus resultados.
///
/// Contrato de concurrencia:
/// - `try_claim` y `resolve` son escrituras condicionales únicas
///   (compare-and-swap sobre status/revisión), nunca lectura-luego-escritura.
/// - `insert` tiene semántica de índice único sobre el fingerprint: una
///   inserción concurrente perdedora devuelve la fila ganadora.
pub trait ArtifactStore: Send + Sync {
    fn insert(&self, new: NewArtifact, now: DateTime<Utc>) -> Result<InsertOutcome, StoreError>;

    fn get(&self, id: Uuid) -> Result<Option<Artifact>, StoreError>;

    fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Option<Artifact>, StoreError>;

    fn get_result(&self, id: Uuid) -> Result<Option<ResultAttempt>, StoreError>;

    /// Claim atómico. En caso de éxito incrementa `attempt_count`, fija
    /// `requested_at` y devuelve el token del intento.
    fn try_claim(&self, id: Uuid, request: &ClaimRequest) -> Result<ClaimOutcome, StoreError>;

    /// Aplica la resolución sólo si el claim del token sigue vigente.
    /// Devuelve `false` si fue descartada (claim reemplazado o liberado).
    fn resolve(&self, token: &ClaimToken, resolution: Resolution, now: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Artifacts que necesitan atención: Pending, o Claimed con
    /// `claimed_at < stale_before`. Orden: más antiguos primero.
    fn sweep_candidates(&self, stale_before: DateTime<Utc>, limit: usize) -> Result<Vec<Artifact>, StoreError>;
}
