//! Colaboradores de contenido: almacenamiento de bytes por fingerprint y
//! render de previews.
//!
//! El pipeline sólo necesita los bytes originales mientras el artifact no está
//! `Completed`; después `get` puede devolver `NotFound` (contenido purgado) sin
//! que eso sea un error para el resto del flujo.
use alt_domain::Fingerprint;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("content not found: {0}")]
    NotFound(Fingerprint),
    #[error("content store io: {0}")]
    Io(String),
}

pub trait ContentStore: Send + Sync {
    /// Guarda los bytes (idempotente) y devuelve su fingerprint.
    fn put(&self, bytes: &[u8]) -> Result<Fingerprint, ContentError>;
    fn get(&self, fingerprint: &Fingerprint) -> Result<Arc<[u8]>, ContentError>;
    /// Guarda la preview independientemente del original.
    fn put_preview(&self, fingerprint: &Fingerprint, preview: &[u8]) -> Result<(), ContentError>;
    fn get_preview(&self, fingerprint: &Fingerprint) -> Result<Arc<[u8]>, ContentError>;
}

/// Transformación pura bytes -> imagen pequeña codificada.
pub trait PreviewRenderer: Send + Sync {
    fn render_preview(&self, bytes: &[u8]) -> Result<Vec<u8>, String>;
}

#[derive(Default)]
pub struct InMemoryContentStore {
    blobs: DashMap<Fingerprint, Arc<[u8]>>,
    previews: DashMap<Fingerprint, Arc<[u8]>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self { Self::default() }

    /// Elimina el original (simula una política de retención externa).
    pub fn purge(&self, fingerprint: &Fingerprint) -> bool {
        self.blobs.remove(fingerprint).is_some()
    }
}

impl ContentStore for InMemoryContentStore {
    fn put(&self, bytes: &[u8]) -> Result<Fingerprint, ContentError> {
        let fp = Fingerprint::of_bytes(bytes);
        self.blobs.entry(fp.clone()).or_insert_with(|| Arc::from(bytes));
        Ok(fp)
    }

    fn get(&self, fingerprint: &Fingerprint) -> Result<Arc<[u8]>, ContentError> {
        self.blobs
            .get(fingerprint)
            .map(|b| Arc::clone(b.value()))
            .ok_or_else(|| ContentError::NotFound(fingerprint.clone()))
    }

    fn put_preview(&self, fingerprint: &Fingerprint, preview: &[u8]) -> Result<(), ContentError> {
        self.previews.insert(fingerprint.clone(), Arc::from(preview));
        Ok(())
    }

    fn get_preview(&self, fingerprint: &Fingerprint) -> Result<Arc<[u8]>, ContentError> {
        self.previews
            .get(fingerprint)
            .map(|b| Arc::clone(b.value()))
            .ok_or_else(|| ContentError::NotFound(fingerprint.clone()))
    }
}
