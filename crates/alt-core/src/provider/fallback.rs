//! Caller con fallback ordenado bajo un budget compartido.
//!
//! Política por modelo:
//! - Antes de cada llamada se mide el budget restante; si no alcanza para una
//!   llamada acotada (`min_call_budget`) se devuelve `Exhausted` sin llamar.
//! - Timeout por llamada = `min(restante, per_call_timeout)`.
//! - Éxito: retorno inmediato, los modelos siguientes no se llaman.
//! - Cualquier error (timeout, transitorio, no reintentable): siguiente modelo.
//! - Lista agotada sin éxito: `ProviderFailure` con todos los errores.
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::{ModelProvider, ProviderContent, ProviderError, ProviderErrorKind, ProviderRequest, ProviderResponse};

#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Success { model: String, response: ProviderResponse },
    /// El budget se terminó antes de recorrer la lista. No es una falla.
    Exhausted { errors: Vec<ProviderError> },
    /// Todos los modelos fallaron dentro del budget.
    ProviderFailure { errors: Vec<ProviderError> },
}

impl CallOutcome {
    /// Texto agregado de errores, en orden de intento.
    pub fn error_summary(&self) -> Option<String> {
        let errors = match self {
            CallOutcome::Success { .. } => return None,
            CallOutcome::Exhausted { errors } | CallOutcome::ProviderFailure { errors } => errors,
        };
        if errors.is_empty() {
            return None;
        }
        Some(errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))
    }

    /// true si hubo fallas y todas fueron no reintentables.
    pub fn is_terminal_failure(&self) -> bool {
        match self {
            CallOutcome::ProviderFailure { errors } => {
                !errors.is_empty() && errors.iter().all(|e| e.kind == ProviderErrorKind::NonRetryable)
            }
            _ => false,
        }
    }
}

pub struct FallbackCaller {
    provider: Arc<dyn ModelProvider>,
    per_call_timeout: Duration,
    min_call_budget: Duration,
}

impl FallbackCaller {
    pub fn new(provider: Arc<dyn ModelProvider>, per_call_timeout: Duration, min_call_budget: Duration) -> Self {
        Self { provider, per_call_timeout, min_call_budget }
    }

    pub async fn call(&self, models: &[String], prompt: &str, content: &ProviderContent, budget: Duration) -> CallOutcome {
        let deadline = Instant::now() + budget;
        let mut errors: Vec<ProviderError> = Vec::new();
        for (index, model) in models.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || remaining < self.min_call_budget {
                info!("provider:budget_exhausted model={model} remaining_ms={} tried={index}", remaining.as_millis());
                return CallOutcome::Exhausted { errors };
            }
            let timeout = remaining.min(self.per_call_timeout);
            info!("provider:attempt provider={} model={model} n={}/{} timeout_ms={}",
                  self.provider.name(),
                  index + 1,
                  models.len(),
                  timeout.as_millis());
            let request = ProviderRequest { model: model.clone(),
                                            prompt: prompt.to_string(),
                                            content: content.clone(),
                                            timeout };
            let result = match tokio::time::timeout(timeout, self.provider.generate(request)).await {
                Ok(r) => r,
                Err(_) => Err(ProviderError::timeout(model.clone(), timeout)),
            };
            match result {
                Ok(response) => return CallOutcome::Success { model: model.clone(), response },
                Err(err) => {
                    warn!("provider:failed {err}; trying next model if available");
                    errors.push(err);
                }
            }
        }
        CallOutcome::ProviderFailure { errors }
    }
}
