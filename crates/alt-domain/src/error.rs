use thiserror::Error;

use crate::status::ArtifactStatus;

/// Errores del dominio (modelo de artifacts y resultados).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Validación fallida: {0}")]
    Validation(String),
    #[error("Entidad no encontrada: {0}")]
    NotFound(String),
    #[error("Transición inválida: {from} -> {to}")]
    InvalidTransition { from: ArtifactStatus, to: ArtifactStatus },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_variant_format() {
        let err = DomainError::Validation("vacío".into());
        assert_eq!(err.to_string(), "Validación fallida: vacío");
    }

    #[test]
    fn test_invalid_transition_format() {
        let err = DomainError::InvalidTransition { from: ArtifactStatus::Completed, to: ArtifactStatus::Pending };
        assert_eq!(err.to_string(), "Transición inválida: completed -> pending");
    }
}
