//! Proveedor guionado para tests y demos.
//!
//! Cada modelo tiene una secuencia de pasos; cada llamada consume el siguiente
//! y, agotada la secuencia, se repite el último. Registra el orden de llamadas.
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::{ModelProvider, ProviderError, ProviderErrorKind, ProviderRequest, ProviderResponse};

#[derive(Debug, Clone)]
pub enum ScriptStep {
    Succeed { text: String, delay: Duration },
    Fail { kind: ProviderErrorKind, message: String },
    /// Nunca responde; el timeout del caller corta la llamada.
    Hang,
}

impl ScriptStep {
    pub fn succeed(text: impl Into<String>) -> Self {
        ScriptStep::Succeed { text: text.into(), delay: Duration::ZERO }
    }

    pub fn succeed_after(delay: Duration, text: impl Into<String>) -> Self {
        ScriptStep::Succeed { text: text.into(), delay }
    }

    pub fn fail(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        ScriptStep::Fail { kind, message: message.into() }
    }
}

#[derive(Default)]
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<String, (Vec<ScriptStep>, usize)>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self { Self::default() }

    pub fn script(self, model: &str, steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        self.scripts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(model.to_string(), (steps.into_iter().collect(), 0));
        self
    }

    /// Modelos llamados, en orden.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn next_step(&self, model: &str) -> Option<ScriptStep> {
        let mut scripts = self.scripts.lock().unwrap_or_else(|p| p.into_inner());
        let (steps, cursor) = scripts.get_mut(model)?;
        let last = steps.len().checked_sub(1)?;
        let step = steps[(*cursor).min(last)].clone();
        *cursor += 1;
        Some(step)
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str { "scripted" }

    async fn generate(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).push(request.model.clone());
        match self.next_step(&request.model) {
            None => Err(ProviderError::non_retryable(request.model, "unknown model")),
            Some(ScriptStep::Succeed { text, delay }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let mut response = ProviderResponse::text(text);
                response.reported_model = Some(request.model);
                Ok(response)
            }
            Some(ScriptStep::Fail { kind, message }) => Err(ProviderError::new(request.model, kind, message)),
            Some(ScriptStep::Hang) => {
                std::future::pending::<()>().await;
                Err(ProviderError::timeout(request.model, request.timeout))
            }
        }
    }
}
