//! Gate de ingesta y deduplicación.
//!
//! Dado el contenido enviado:
//! 1. Valida tamaño y tipo (rechazo previo a crear cualquier artifact).
//! 2. Calcula el fingerprint (SHA-256, puro y determinista).
//! 3. Si ya existe un artifact con ese fingerprint, lo devuelve clasificado
//!    (completado, en curso o fallido) sin crear trabajo nuevo.
//! 4. Si no, guarda los bytes y crea el artifact `Pending`. Una inserción
//!    concurrente perdedora recibe la fila ganadora del store.
use alt_domain::{detect_kind, Artifact, ArtifactStatus, Fingerprint, NewArtifact};
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;

use crate::content::{ContentStore, PreviewRenderer};
use crate::errors::PipelineError;
use crate::repo::{ArtifactStore, InsertOutcome};

#[derive(Debug, Clone)]
pub struct Submission {
    pub bytes: Vec<u8>,
    pub original_filename: Option<String>,
}

impl Submission {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into(), original_filename: None }
    }

    pub fn with_filename(mut self, name: impl Into<String>) -> Self {
        self.original_filename = Some(name.into());
        self
    }
}

#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// Artifact nuevo; quien lo creó es responsable del intento síncrono.
    Created(Artifact),
    AlreadyCompleted(Artifact),
    /// Pending o Claimed: el envío se adjunta al artifact existente.
    Attached(Artifact),
    /// Failed es terminal; no se reintenta automáticamente.
    PreviouslyFailed(Artifact),
}

impl IngestOutcome {
    pub fn artifact(&self) -> &Artifact {
        match self {
            IngestOutcome::Created(a)
            | IngestOutcome::AlreadyCompleted(a)
            | IngestOutcome::Attached(a)
            | IngestOutcome::PreviouslyFailed(a) => a,
        }
    }

    fn existing(artifact: Artifact) -> Self {
        match artifact.status {
            ArtifactStatus::Completed => IngestOutcome::AlreadyCompleted(artifact),
            ArtifactStatus::Pending | ArtifactStatus::Claimed => IngestOutcome::Attached(artifact),
            ArtifactStatus::Failed => IngestOutcome::PreviouslyFailed(artifact),
        }
    }
}

pub struct IngestGate<S: ArtifactStore, C: ContentStore> {
    store: Arc<S>,
    content: Arc<C>,
    preview: Option<Arc<dyn PreviewRenderer>>,
    max_content_bytes: u64,
}

impl<S: ArtifactStore, C: ContentStore> IngestGate<S, C> {
    pub fn new(store: Arc<S>, content: Arc<C>, max_content_bytes: u64) -> Self {
        Self { store, content, preview: None, max_content_bytes }
    }

    pub fn with_preview_renderer(mut self, renderer: Arc<dyn PreviewRenderer>) -> Self {
        self.preview = Some(renderer);
        self
    }

    pub fn ingest(&self, submission: &Submission) -> Result<IngestOutcome, PipelineError> {
        let bytes = submission.bytes.as_slice();
        if bytes.is_empty() {
            return Err(PipelineError::Validation("empty content".into()));
        }
        if bytes.len() as u64 > self.max_content_bytes {
            return Err(PipelineError::Validation(format!("content exceeds {} bytes", self.max_content_bytes)));
        }
        let kind = detect_kind(bytes).ok_or_else(|| PipelineError::Validation("unsupported content type".into()))?;
        let fingerprint = Fingerprint::of_bytes(bytes);

        if let Some(existing) = self.store.find_by_fingerprint(&fingerprint)? {
            debug!("ingest:dedup artifact_id={} status={}", existing.id, existing.status);
            return Ok(IngestOutcome::existing(existing));
        }

        let stored = self.content.put(bytes)?;
        if stored != fingerprint {
            return Err(PipelineError::Validation(format!("content store fingerprint mismatch: {stored} != {fingerprint}")));
        }

        let new = NewArtifact { content_fingerprint: fingerprint,
                                size: bytes.len() as u64,
                                detected_kind: kind,
                                original_filename: submission.original_filename.clone() };
        match self.store.insert(new, Utc::now())? {
            InsertOutcome::Created(artifact) => {
                info!("ingest:created artifact_id={} kind={} size={}", artifact.id, kind.as_str(), artifact.size);
                self.render_preview(&artifact, bytes);
                Ok(IngestOutcome::Created(artifact))
            }
            InsertOutcome::Existing(winner) => {
                debug!("ingest:lost_insert_race artifact_id={}", winner.id);
                Ok(IngestOutcome::existing(winner))
            }
        }
    }

    fn render_preview(&self, artifact: &Artifact, bytes: &[u8]) {
        let Some(renderer) = &self.preview else { return };
        let rendered = renderer.render_preview(bytes)
                               .map_err(|e| e.to_string())
                               .and_then(|p| {
                                   self.content
                                       .put_preview(&artifact.content_fingerprint, &p)
                                       .map_err(|e| e.to_string())
                               });
        if let Err(e) = rendered {
            warn!("ingest:preview_failed artifact_id={} error={e}", artifact.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::InMemoryContentStore;
    use crate::repo::InMemoryArtifactStore;

    fn gif(tag: u8) -> Vec<u8> {
        let mut v = b"GIF89a".to_vec();
        v.push(tag);
        v
    }

    fn gate() -> IngestGate<InMemoryArtifactStore, InMemoryContentStore> {
        IngestGate::new(Arc::new(InMemoryArtifactStore::new()), Arc::new(InMemoryContentStore::new()), 1024)
    }

    #[test]
    fn rejects_unknown_kind_before_creating_rows() {
        let g = gate();
        let err = g.ingest(&Submission::new(b"plain text".to_vec())).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(g.store.is_empty());
    }

    #[test]
    fn rejects_oversize_content() {
        let g = gate();
        let mut big = gif(0);
        big.resize(2048, 0);
        assert!(matches!(g.ingest(&Submission::new(big)), Err(PipelineError::Validation(_))));
    }

    #[test]
    fn second_submission_attaches_to_pending() {
        let g = gate();
        let first = g.ingest(&Submission::new(gif(1)).with_filename("a.gif")).unwrap();
        let IngestOutcome::Created(created) = first else { panic!("se esperaba Created") };
        match g.ingest(&Submission::new(gif(1))).unwrap() {
            IngestOutcome::Attached(a) => assert_eq!(a.id, created.id),
            other => panic!("inesperado: {other:?}"),
        }
        assert_eq!(g.store.len(), 1);
    }

    struct FixedPreview;
    impl PreviewRenderer for FixedPreview {
        fn render_preview(&self, _bytes: &[u8]) -> Result<Vec<u8>, String> { Ok(b"thumb".to_vec()) }
    }

    #[test]
    fn preview_is_rendered_once_at_creation() {
        let content = Arc::new(InMemoryContentStore::new());
        let g = IngestGate::new(Arc::new(InMemoryArtifactStore::new()), content.clone(), 1024)
            .with_preview_renderer(Arc::new(FixedPreview));
        let out = g.ingest(&Submission::new(gif(2))).unwrap();
        let fp = out.artifact().content_fingerprint.clone();
        assert_eq!(&*content.get_preview(&fp).unwrap(), b"thumb");
    }
}
