//! `ContentStore` en disco: `<dir>/<fingerprint>` y
//! `<dir>/previews/<fingerprint>`.
//!
//! Las escrituras van a un archivo temporal y luego `rename`, para que un
//! lector nunca vea bytes a medio escribir.
use alt_core::{ContentError, ContentStore};
use alt_domain::Fingerprint;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Crea los directorios si no existen.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ContentError> {
        let root = root.into();
        std::fs::create_dir_all(root.join("previews")).map_err(|e| ContentError::Io(format!("{}: {e}", root.display())))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path { &self.root }

    fn original_path(&self, fp: &Fingerprint) -> PathBuf { self.root.join(fp.as_str()) }

    fn preview_path(&self, fp: &Fingerprint) -> PathBuf { self.root.join("previews").join(fp.as_str()) }

    fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ContentError> {
        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
        std::fs::write(&tmp, bytes).map_err(|e| ContentError::Io(format!("{}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, path).map_err(|e| {
                                       let _ = std::fs::remove_file(&tmp);
                                       ContentError::Io(format!("{}: {e}", path.display()))
                                   })
    }

    fn read(path: &Path, fp: &Fingerprint) -> Result<Arc<[u8]>, ContentError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Arc::from(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ContentError::NotFound(fp.clone())),
            Err(e) => Err(ContentError::Io(format!("{}: {e}", path.display()))),
        }
    }
}

impl ContentStore for FsContentStore {
    fn put(&self, bytes: &[u8]) -> Result<Fingerprint, ContentError> {
        let fp = Fingerprint::of_bytes(bytes);
        let path = self.original_path(&fp);
        if !path.exists() {
            Self::write_atomic(&path, bytes)?;
        }
        Ok(fp)
    }

    fn get(&self, fingerprint: &Fingerprint) -> Result<Arc<[u8]>, ContentError> {
        Self::read(&self.original_path(fingerprint), fingerprint)
    }

    fn put_preview(&self, fingerprint: &Fingerprint, preview: &[u8]) -> Result<(), ContentError> {
        Self::write_atomic(&self.preview_path(fingerprint), preview)
    }

    fn get_preview(&self, fingerprint: &Fingerprint) -> Result<Arc<[u8]>, ContentError> {
        Self::read(&self.preview_path(fingerprint), fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> FsContentStore {
        let dir = std::env::temp_dir().join(format!("altflow-content-{}", uuid::Uuid::new_v4()));
        FsContentStore::open(dir).unwrap()
    }

    #[test]
    fn put_then_get_by_fingerprint() {
        let store = temp_store();
        let fp = store.put(b"GIF89a-bytes").unwrap();
        assert_eq!(fp, Fingerprint::of_bytes(b"GIF89a-bytes"));
        assert_eq!(&*store.get(&fp).unwrap(), b"GIF89a-bytes");
        assert!(store.root().join(fp.as_str()).is_file());
        std::fs::remove_dir_all(store.root()).ok();
    }

    #[test]
    fn missing_original_is_not_found_but_preview_survives() {
        let store = temp_store();
        let fp = store.put(b"original").unwrap();
        store.put_preview(&fp, b"thumb").unwrap();
        std::fs::remove_file(store.root().join(fp.as_str())).unwrap();
        assert_eq!(store.get(&fp), Err(ContentError::NotFound(fp.clone())));
        assert_eq!(&*store.get_preview(&fp).unwrap(), b"thumb");
        std::fs::remove_dir_all(store.root()).ok();
    }
}
