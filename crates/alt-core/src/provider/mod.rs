//! Contrato del proveedor de inferencia y caller con fallback ordenado.
//!
//! Un `ModelProvider` atiende una petición para un modelo concreto. El
//! `FallbackCaller` recorre la lista de modelos en orden bajo un budget común.
use alt_domain::Usage;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod fallback;
pub mod mock;

pub use fallback::{CallOutcome, FallbackCaller};
pub use mock::{ScriptStep, ScriptedProvider};

/// Clasificación de errores por modelo. Todas se tratan como "probar el
/// siguiente modelo"; la clase sólo importa al decidir si el intento completo
/// es terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Timeout,
    Transient,
    NonRetryable,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::Transient => "transient",
            ProviderErrorKind::NonRetryable => "non-retryable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("model={model} {kind}: {message}")]
pub struct ProviderError {
    pub model: String,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(model: impl Into<String>, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self { model: model.into(), kind, message: message.into() }
    }

    pub fn timeout(model: impl Into<String>, after: Duration) -> Self {
        Self::new(model, ProviderErrorKind::Timeout, format!("no response after {}ms", after.as_millis()))
    }

    pub fn transient(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(model, ProviderErrorKind::Transient, message)
    }

    pub fn non_retryable(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(model, ProviderErrorKind::NonRetryable, message)
    }
}

/// Contenido enviado al proveedor (referencia barata de clonar).
#[derive(Debug, Clone)]
pub struct ProviderContent {
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    pub prompt: String,
    pub content: ProviderContent,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub text: String,
    /// Modelo reportado por el proveedor (puede diferir del pedido si enruta).
    pub reported_model: Option<String>,
    pub usage: Option<Usage>,
    pub response_id: Option<String>,
    pub finish_reason: Option<String>,
    pub raw: Option<Value>,
}

impl ProviderResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), reported_model: None, usage: None, response_id: None, finish_reason: None, raw: None }
    }
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Debe respetar `request.timeout`; el caller además lo acota por fuera.
    async fn generate(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}
