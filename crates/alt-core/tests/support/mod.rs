#![allow(dead_code)]
use alt_core::provider::ScriptedProvider;
use alt_core::{InMemoryArtifactStore, InMemoryContentStore, Pipeline, PipelineConfig};
use std::sync::Arc;
use std::time::Duration;

pub type MemPipeline = Pipeline<InMemoryArtifactStore, InMemoryContentStore>;

pub struct Harness {
    pub store: Arc<InMemoryArtifactStore>,
    pub content: Arc<InMemoryContentStore>,
    pub provider: Arc<ScriptedProvider>,
    pub pipeline: Arc<MemPipeline>,
}

/// PNG mínimo distinguible por `tag`.
pub fn png(tag: u8) -> Vec<u8> {
    let mut v = b"\x89PNG\r\n\x1a\n".to_vec();
    v.extend_from_slice(&[0, 0, 0, 13, tag]);
    v
}

pub fn models(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub fn config(names: &[&str], sync_secs: u64, per_call_secs: u64) -> PipelineConfig {
    PipelineConfig::new(models(names)).with_budgets(Duration::from_secs(sync_secs), Duration::from_secs(60))
                                      .with_per_call_timeout(Duration::from_secs(per_call_secs))
}

pub fn harness(provider: ScriptedProvider, config: PipelineConfig) -> Harness {
    let store = Arc::new(InMemoryArtifactStore::new());
    let content = Arc::new(InMemoryContentStore::new());
    let provider = Arc::new(provider);
    let pipeline = Pipeline::new(store.clone(), content.clone(), provider.clone(), config, "describe the image")
        .expect("config válida");
    Harness { store, content, provider, pipeline: Arc::new(pipeline) }
}
