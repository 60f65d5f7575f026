use thiserror::Error;

/// Errores al construir el proveedor (no durante una llamada: esos son
/// `alt_core::ProviderError` y se clasifican por modelo).
#[derive(Debug, Error)]
pub enum ProviderSetupError {
    #[error("config error: {0}")] Config(String),
    #[error("http client error: {0}")] Client(String),
    #[error("io error: {0}")] Io(#[from] std::io::Error),
}
