//! Plantilla del prompt enviado junto con la imagen.
use std::path::Path;

use crate::error::ProviderSetupError;

pub const DEFAULT_PROMPT: &str = "\
You are writing alternative text for an image so that people using screen readers understand it.

- Describe the essential content and purpose of the image in one to three sentences.
- Transcribe short visible text verbatim when it matters for understanding.
- Do not start with \"Image of\" or \"Picture of\".
- Do not speculate about things that are not visible.

Reply with the alternative text only.";

/// Lee la plantilla desde `path`, o usa la incluida si no hay ruta.
/// Un archivo vacío se trata como error de configuración.
pub fn load_prompt(path: Option<&Path>) -> Result<String, ProviderSetupError> {
    let Some(path) = path else {
        return Ok(DEFAULT_PROMPT.to_string());
    };
    let text = std::fs::read_to_string(path)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(ProviderSetupError::Config(format!("prompt vacío en {}", path.display())));
    }
    Ok(text.to_string())
}
