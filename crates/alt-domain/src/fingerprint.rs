//! Fingerprint de contenido y detección del tipo de imagen.
//!
//! El fingerprint es SHA-256 (hex, 64 caracteres) de los bytes crudos. Es la
//! clave de deduplicación: dos envíos byte-idénticos producen el mismo valor.
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Calcula el fingerprint de un buffer completo.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Fingerprint(format!("{:x}", hasher.finalize()))
    }

    /// Reconstruye un fingerprint leído de almacenamiento; valida forma hex de 64.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.len() != 64 || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::Validation(format!("fingerprint mal formado: {raw}")));
        }
        Ok(Fingerprint(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tipo de contenido detectado por magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedKind {
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
    Tiff,
}

impl DetectedKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            DetectedKind::Png => "image/png",
            DetectedKind::Jpeg => "image/jpeg",
            DetectedKind::Gif => "image/gif",
            DetectedKind::Webp => "image/webp",
            DetectedKind::Bmp => "image/bmp",
            DetectedKind::Tiff => "image/tiff",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectedKind::Png => "png",
            DetectedKind::Jpeg => "jpeg",
            DetectedKind::Gif => "gif",
            DetectedKind::Webp => "webp",
            DetectedKind::Bmp => "bmp",
            DetectedKind::Tiff => "tiff",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "png" => Some(DetectedKind::Png),
            "jpeg" => Some(DetectedKind::Jpeg),
            "gif" => Some(DetectedKind::Gif),
            "webp" => Some(DetectedKind::Webp),
            "bmp" => Some(DetectedKind::Bmp),
            "tiff" => Some(DetectedKind::Tiff),
            _ => None,
        }
    }
}

/// Detecta el tipo a partir de la cabecera (primeros 12 bytes).
/// Devuelve `None` si no es un formato de imagen soportado.
pub fn detect_kind(bytes: &[u8]) -> Option<DetectedKind> {
    let header = &bytes[..bytes.len().min(12)];
    if header.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(DetectedKind::Png)
    } else if header.starts_with(b"\xff\xd8\xff") {
        Some(DetectedKind::Jpeg)
    } else if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
        Some(DetectedKind::Gif)
    } else if header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP" {
        Some(DetectedKind::Webp)
    } else if header.starts_with(b"BM") {
        Some(DetectedKind::Bmp)
    } else if header.starts_with(b"II*\x00") || header.starts_with(b"MM\x00*") {
        Some(DetectedKind::Tiff)
    } else {
        None
    }
}
