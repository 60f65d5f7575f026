//! Registro de resultado (1:1 con `Artifact`).
//!
//! Guarda la salida del proveedor, la contabilidad de intentos y una nota del
//! último error. `attempt_count` se incrementa en cada ejecución del executor,
//! sin importar el resultado.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Uso de tokens reportado por el proveedor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultAttempt {
    pub artifact_id: Uuid,
    pub attempt_count: u32,
    pub model_used: Option<String>,
    pub output: Option<String>,
    pub raw_response: Option<Value>,
    pub prompt: Option<String>,
    pub usage: Option<Usage>,
    pub provider_response_id: Option<String>,
    pub finish_reason: Option<String>,
    pub requested_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Nota del último intento no exitoso (informativa, no implica Failed).
    pub last_error: Option<String>,
}

impl ResultAttempt {
    pub fn empty(artifact_id: Uuid) -> Self {
        Self { artifact_id,
               attempt_count: 0,
               model_used: None,
               output: None,
               raw_response: None,
               prompt: None,
               usage: None,
               provider_response_id: None,
               finish_reason: None,
               requested_at: None,
               completed_at: None,
               last_error: None }
    }

    /// Registra el inicio de un intento.
    pub fn begin_attempt(&mut self, now: DateTime<Utc>) -> u32 {
        self.attempt_count += 1;
        self.requested_at = Some(now);
        self.attempt_count
    }

    pub fn is_complete(&self) -> bool {
        self.output.is_some() && self.model_used.is_some()
    }
}
