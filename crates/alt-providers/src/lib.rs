//! alt-providers: proveedores reales de inferencia.
//!
//! Hoy sólo OpenRouter (chat-completions compatible con OpenAI). El cliente
//! implementa `alt_core::ModelProvider`; el fallback entre modelos y los
//! budgets viven en `alt-core`.
pub mod error;
pub mod openrouter;
pub mod parse;
pub mod prompt;

pub use error::ProviderSetupError;
pub use openrouter::{image_data_url, OpenRouterConfig, OpenRouterProvider, OPENROUTER_API_URL};
pub use parse::{parse_openrouter_response, ParsedCompletion};
pub use prompt::{load_prompt, DEFAULT_PROMPT};
