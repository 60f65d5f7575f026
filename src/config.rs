//! Configuración central de la aplicación.
//!
//! Carga `.env` una sola vez y construye un `AppConfig` inmutable a partir de
//! variables de entorno. Una variable definida pero mal formada es un error;
//! una ausente toma su valor por defecto.
use alt_core::PipelineConfig;
use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::CoreError;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenvy::dotenv();
});

pub const DEFAULT_CONTENT_DIR: &str = "var/content";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub api_key: Option<String>,
    pub http_referer: Option<String>,
    pub ca_bundle: Option<PathBuf>,
    pub prompt_path: Option<PathBuf>,
    pub content_dir: PathBuf,
    pub database_url: Option<String>,
    pub db_min_connections: u32,
    pub db_max_connections: u32,
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, CoreError> {
    match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| CoreError::Config(format!("{key} inválido: {raw}"))),
    }
}

fn secs(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Result<Duration, CoreError> {
    parse_var(lookup, key, default.as_secs_f64()).and_then(|s| {
                                                      Duration::try_from_secs_f64(s).map_err(|_| {
                                                                                        CoreError::Config(format!("{key} fuera de rango: {s}"))
                                                                                    })
                                                  })
}

impl AppConfig {
    pub fn from_env() -> Result<Self, CoreError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables inyectable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let models: Vec<String> = lookup("OPENROUTER_MODEL_ORDER").unwrap_or_default()
                                                                  .split(',')
                                                                  .map(str::trim)
                                                                  .filter(|m| !m.is_empty())
                                                                  .map(str::to_string)
                                                                  .collect();
        let defaults = PipelineConfig::new(models);
        let per_call = secs(&lookup, "OPENROUTER_PER_CALL_TIMEOUT_SECONDS", defaults.per_call_timeout)?;
        let sync_budget = secs(&lookup, "OPENROUTER_SYNC_TIMEOUT_SECONDS", defaults.sync_budget)?;
        let sweep_budget = secs(&lookup, "OPENROUTER_CRON_TIMEOUT_SECONDS", defaults.sweep_budget)?;
        let stuck = secs(&lookup, "ALTFLOW_STUCK_THRESHOLD_SECONDS", defaults.stuck_threshold)?;
        let max_attempts = parse_var(&lookup, "ALTFLOW_MAX_ATTEMPTS", defaults.max_attempts)?;
        let batch = parse_var(&lookup, "ALTFLOW_SWEEP_BATCH_SIZE", defaults.sweep_batch_size)?;
        let concurrency = defaults.sweep_concurrency;

        let pipeline = defaults.with_per_call_timeout(per_call)
                               .with_budgets(sync_budget, sweep_budget)
                               .with_stuck_threshold(stuck)
                               .with_max_attempts(max_attempts)
                               .with_sweep_batch(batch, concurrency);
        pipeline.validate().map_err(|e| CoreError::Config(e.to_string()))?;

        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Ok(Self { pipeline,
                  api_key: non_empty("OPENROUTER_API_KEY"),
                  http_referer: non_empty("OPENROUTER_HTTP_REFERER"),
                  ca_bundle: non_empty("SYSTEM_CA_BUNDLE").map(PathBuf::from),
                  prompt_path: non_empty("ALTFLOW_PROMPT_PATH").map(PathBuf::from),
                  content_dir: non_empty("ALTFLOW_CONTENT_DIR").map(PathBuf::from)
                                                               .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTENT_DIR)),
                  database_url: non_empty("DATABASE_URL"),
                  db_min_connections: parse_var(&lookup, "DATABASE_MIN_CONNECTIONS", 2)?,
                  db_max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS", 16)? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn reads_model_order_and_budgets() {
        let cfg = AppConfig::from_lookup(lookup(&[("OPENROUTER_MODEL_ORDER", " a/m1, b/m2 ,,"),
                                                  ("OPENROUTER_SYNC_TIMEOUT_SECONDS", "5"),
                                                  ("OPENROUTER_PER_CALL_TIMEOUT_SECONDS", "5"),
                                                  ("ALTFLOW_MAX_ATTEMPTS", "4")])).unwrap();
        assert_eq!(cfg.pipeline.model_order, vec!["a/m1".to_string(), "b/m2".to_string()]);
        assert_eq!(cfg.pipeline.sync_budget, Duration::from_secs(5));
        assert_eq!(cfg.pipeline.min_call_budget, Duration::from_secs(5));
        assert_eq!(cfg.pipeline.max_attempts, 4);
        assert_eq!(cfg.content_dir, PathBuf::from(DEFAULT_CONTENT_DIR));
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn missing_model_order_is_config_error() {
        assert!(matches!(AppConfig::from_lookup(lookup(&[])), Err(CoreError::Config(_))));
    }

    #[test]
    fn per_call_timeout_longer_than_sweep_budget_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("OPENROUTER_MODEL_ORDER", "m1"),
                                                  ("OPENROUTER_PER_CALL_TIMEOUT_SECONDS", "90")])).unwrap_err();
        assert!(matches!(&err, CoreError::Config(msg) if msg.contains("sweep_budget")), "{err}");
    }

    #[test]
    fn malformed_number_is_config_error() {
        let err = AppConfig::from_lookup(lookup(&[("OPENROUTER_MODEL_ORDER", "m1"), ("ALTFLOW_MAX_ATTEMPTS", "tres")])).unwrap_err();
        assert!(err.to_string().contains("ALTFLOW_MAX_ATTEMPTS"));
    }
}
