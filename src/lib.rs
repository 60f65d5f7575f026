//! AltFlow Rust Library
//!
//! Fachada del workspace:
//! - `config`: `AppConfig` desde entorno / `.env`.
//! - `errors`: `CoreError`, error de nivel aplicación.
//! - `wiring`: ensamblado del pipeline sobre Postgres, disco y OpenRouter.
//! - `logging`: subscriber de logs para los binarios.
//!
//! Re-exporta los crates del workspace para consumidores externos.

pub mod config;
pub mod errors;
pub mod logging;
pub mod wiring;

pub use alt_core as core;
pub use alt_domain as domain;
pub use alt_persistence as persistence;
pub use alt_providers as providers;

pub use config::AppConfig;
pub use errors::CoreError;
