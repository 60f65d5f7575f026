//! alt-core: pipeline de procesamiento de artifacts.
//!
//! Un artifact enviado se intenta procesar de forma síncrona dentro de un
//! budget corto; si no alcanza, queda `Pending` y el sweep de recuperación lo
//! retoma con un budget mayor. El claim atómico del store garantiza a lo sumo
//! un intento activo por artifact.
pub mod config;
pub mod constants;
pub mod content;
pub mod engine;
pub mod errors;
pub mod ingest;
pub mod provider;
pub mod repo;

pub use config::PipelineConfig;
pub use content::{ContentError, ContentStore, InMemoryContentStore, PreviewRenderer};
pub use engine::{AttemptExecutor, AttemptReport, AttemptTrigger, Pipeline, RecoverySweep, StatusView, SubmissionReceipt, SweepReport};
pub use errors::PipelineError;
pub use ingest::{IngestGate, IngestOutcome, Submission};
pub use provider::{CallOutcome, FallbackCaller, ModelProvider, ProviderContent, ProviderError, ProviderErrorKind, ProviderRequest, ProviderResponse};
pub use repo::{ArtifactStore, ClaimMode, ClaimOutcome, ClaimRequest, ClaimToken, InMemoryArtifactStore, InsertOutcome, Resolution, StoreError};
