//! Configuración inmutable del pipeline.
//!
//! Se construye una vez (desde entorno, CLI o tests) y se pasa por valor al
//! executor, al caller de fallback y al sweep. No hay estado global mutable.
use std::time::Duration;

use crate::constants::*;
use crate::errors::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Modelos en orden de preferencia.
    pub model_order: Vec<String>,
    /// Budget del camino síncrono (hay un usuario esperando).
    pub sync_budget: Duration,
    /// Budget de cada intento del sweep.
    pub sweep_budget: Duration,
    /// Tope de cada llamada individual al proveedor.
    pub per_call_timeout: Duration,
    /// Mínimo tiempo restante para iniciar otra llamada.
    pub min_call_budget: Duration,
    /// Antigüedad a partir de la cual un claim se considera abandonado.
    pub stuck_threshold: Duration,
    pub max_attempts: u32,
    pub sweep_batch_size: usize,
    pub sweep_concurrency: usize,
    pub max_content_bytes: u64,
}

impl PipelineConfig {
    /// Valores por defecto para el orden de modelos dado.
    pub fn new(model_order: Vec<String>) -> Self {
        let per_call = Duration::from_secs(DEFAULT_PER_CALL_TIMEOUT_SECS);
        Self { model_order,
               sync_budget: Duration::from_secs(DEFAULT_SYNC_BUDGET_SECS),
               sweep_budget: Duration::from_secs(DEFAULT_SWEEP_BUDGET_SECS),
               per_call_timeout: per_call,
               min_call_budget: per_call,
               stuck_threshold: Duration::from_secs(DEFAULT_STUCK_THRESHOLD_SECS),
               max_attempts: DEFAULT_MAX_ATTEMPTS,
               sweep_batch_size: DEFAULT_SWEEP_BATCH_SIZE,
               sweep_concurrency: DEFAULT_SWEEP_CONCURRENCY,
               max_content_bytes: DEFAULT_MAX_CONTENT_BYTES }
    }

    pub fn with_budgets(mut self, sync_budget: Duration, sweep_budget: Duration) -> Self {
        self.sync_budget = sync_budget;
        self.sweep_budget = sweep_budget;
        self
    }

    /// Fija el timeout por llamada; `min_call_budget` lo acompaña.
    pub fn with_per_call_timeout(mut self, timeout: Duration) -> Self {
        self.per_call_timeout = timeout;
        self.min_call_budget = timeout;
        self
    }

    pub fn with_min_call_budget(mut self, min: Duration) -> Self {
        self.min_call_budget = min;
        self
    }

    pub fn with_stuck_threshold(mut self, threshold: Duration) -> Self {
        self.stuck_threshold = threshold;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_sweep_batch(mut self, batch_size: usize, concurrency: usize) -> Self {
        self.sweep_batch_size = batch_size;
        self.sweep_concurrency = concurrency;
        self
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.model_order.is_empty() {
            return Err(PipelineError::Config("model_order vacío".into()));
        }
        if self.model_order.iter().any(|m| m.trim().is_empty()) {
            return Err(PipelineError::Config("model_order contiene un modelo vacío".into()));
        }
        if self.max_attempts == 0 {
            return Err(PipelineError::Config("max_attempts debe ser >= 1".into()));
        }
        if self.per_call_timeout.is_zero() {
            return Err(PipelineError::Config("per_call_timeout debe ser > 0".into()));
        }
        if self.sweep_budget < self.sync_budget {
            return Err(PipelineError::Config("sweep_budget debe ser >= sync_budget".into()));
        }
        if self.sweep_budget < self.min_call_budget {
            return Err(PipelineError::Config("sweep_budget debe alcanzar para una llamada (min_call_budget)".into()));
        }
        if self.max_attempts == 1 && self.sync_budget < self.min_call_budget {
            return Err(PipelineError::Config("con max_attempts = 1, sync_budget debe alcanzar para una llamada".into()));
        }
        if self.stuck_threshold <= self.sweep_budget {
            return Err(PipelineError::Config("stuck_threshold debe superar a sweep_budget".into()));
        }
        if self.sweep_batch_size == 0 || self.sweep_concurrency == 0 {
            return Err(PipelineError::Config("sweep_batch_size y sweep_concurrency deben ser >= 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        PipelineConfig::new(vec!["m1".into()]).validate().unwrap();
    }

    #[test]
    fn per_call_timeout_moves_min_call_budget() {
        let cfg = PipelineConfig::new(vec!["m1".into()]).with_per_call_timeout(Duration::from_secs(3));
        assert_eq!(cfg.min_call_budget, Duration::from_secs(3));
    }

    #[test]
    fn rejects_stuck_threshold_below_sweep_budget() {
        let cfg = PipelineConfig::new(vec!["m1".into()]).with_stuck_threshold(Duration::from_secs(30));
        assert!(matches!(cfg.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn rejects_sweep_budget_below_one_call() {
        let cfg = PipelineConfig::new(vec!["m1".into()]).with_per_call_timeout(Duration::from_secs(90));
        assert!(matches!(cfg.validate(), Err(PipelineError::Config(msg)) if msg.contains("sweep_budget")));
    }

    #[test]
    fn single_attempt_requires_sync_budget_for_one_call() {
        let cfg = PipelineConfig::new(vec!["m1".into()]).with_budgets(Duration::from_secs(3), Duration::from_secs(60))
                                                        .with_per_call_timeout(Duration::from_secs(5))
                                                        .with_max_attempts(1);
        assert!(matches!(cfg.validate(), Err(PipelineError::Config(msg)) if msg.contains("sync_budget")));
        // Con más intentos el sync corto sólo difiere el trabajo al sweep.
        cfg.with_max_attempts(2).validate().unwrap();
    }

    #[test]
    fn rejects_empty_model_order() {
        assert!(PipelineConfig::new(vec![]).validate().is_err());
    }
}
