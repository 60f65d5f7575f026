use serde::{Deserialize, Serialize};
use std::fmt;

use crate::DomainError;

/// Estado de procesamiento de un artifact.
///
/// Las transiciones válidas son:
/// - `Pending` -> `Claimed` (claim normal)
/// - `Claimed` -> `Claimed` (re-claim de un claim abandonado)
/// - `Claimed` -> `Completed`
/// - `Claimed` -> `Failed`
/// - `Claimed` -> `Pending` (se libera el claim para que lo retome el sweep)
///
/// `Completed` y `Failed` son terminales: ninguna transición automática sale
/// de ellos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    /// Sin dueño; candidato para el camino síncrono o el sweep.
    Pending,
    /// Un intento en curso posee el artifact.
    Claimed,
    /// El proveedor devolvió un resultado.
    Completed,
    /// Falló de forma permanente.
    Failed,
}

impl ArtifactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactStatus::Pending => "pending",
            ArtifactStatus::Claimed => "claimed",
            ArtifactStatus::Completed => "completed",
            ArtifactStatus::Failed => "failed",
        }
    }

    /// Inversa de `as_str`; usada al leer filas persistidas.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(ArtifactStatus::Pending),
            "claimed" => Some(ArtifactStatus::Claimed),
            "completed" => Some(ArtifactStatus::Completed),
            "failed" => Some(ArtifactStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ArtifactStatus::Completed | ArtifactStatus::Failed)
    }

    pub fn can_transition_to(&self, next: ArtifactStatus) -> bool {
        use ArtifactStatus::*;
        match (self, next) {
            (Pending, Claimed) => true,
            (Claimed, Claimed | Completed | Failed | Pending) => true,
            (Pending, Pending | Completed | Failed) => false,
            (Completed | Failed, _) => false,
        }
    }

    /// Igual que `can_transition_to` pero devolviendo el error de dominio.
    pub fn ensure_transition(&self, next: ArtifactStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition { from: *self, to: next })
        }
    }
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
