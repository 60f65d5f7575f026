//! Ensamblado del pipeline productivo: Postgres + disco + OpenRouter.
use alt_core::{Pipeline, PipelineError};
use alt_persistence::{build_pool, FsContentStore, PgArtifactStore, PoolProvider};
use alt_providers::{load_prompt, OpenRouterConfig, OpenRouterProvider};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::CoreError;

pub type PgPipeline = Pipeline<PgArtifactStore<PoolProvider>, FsContentStore>;

pub fn openrouter_provider(cfg: &AppConfig) -> Result<OpenRouterProvider, CoreError> {
    let api_key = cfg.api_key
                     .clone()
                     .ok_or_else(|| CoreError::Config("OPENROUTER_API_KEY no definido".into()))?;
    let mut provider_cfg = OpenRouterConfig::new(api_key);
    provider_cfg.referer = cfg.http_referer.clone();
    provider_cfg.ca_bundle = cfg.ca_bundle.clone();
    Ok(OpenRouterProvider::new(provider_cfg)?)
}

pub fn build_pg_pipeline(cfg: &AppConfig) -> Result<PgPipeline, CoreError> {
    let url = cfg.database_url
                 .as_deref()
                 .ok_or_else(|| CoreError::Config("DATABASE_URL no definido".into()))?;
    let pool = build_pool(url, cfg.db_min_connections, cfg.db_max_connections)?;
    let store = Arc::new(PgArtifactStore::new(PoolProvider { pool }));
    let content = Arc::new(FsContentStore::open(&cfg.content_dir).map_err(PipelineError::from)?);
    let provider = Arc::new(openrouter_provider(cfg)?);
    let prompt = load_prompt(cfg.prompt_path.as_deref())?;
    Ok(Pipeline::new(store, content, provider, cfg.pipeline.clone(), prompt)?)
}
