//! Errores del pipeline.
//!
//! Los problemas del proveedor NO aparecen aquí: quedan registrados como
//! estado del artifact. Estas variantes cubren validación de entrada,
//! configuración y fallas del store/contenido.

use alt_domain::DomainError;
use thiserror::Error;
use uuid::Uuid;

use crate::content::ContentError;
use crate::repo::StoreError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("validation error: {0}")] Validation(String),
    #[error("config error: {0}")] Config(String),
    #[error("artifact not found: {0}")] NotFound(Uuid),
    #[error(transparent)] Domain(#[from] DomainError),
    #[error(transparent)] Store(#[from] StoreError),
    #[error(transparent)] Content(#[from] ContentError),
}
