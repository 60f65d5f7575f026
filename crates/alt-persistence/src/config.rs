//! Carga de configuración de conexión desde variables de entorno.
//! Usa convención `DATABASE_URL` y parámetros opcionales de pool.

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;

use crate::error::PersistenceError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

fn parse_count(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u32) -> Result<u32, PersistenceError> {
    match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| PersistenceError::Config(format!("{key} inválido: {raw}"))),
    }
}

impl DbConfig {
    pub fn from_env() -> Result<Self, PersistenceError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Variable definida pero mal formada es error; ausente toma el default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PersistenceError> {
        let url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty())
                                        .ok_or_else(|| PersistenceError::Config("DATABASE_URL no definido".into()))?;
        let min_connections = parse_count(&lookup, "DATABASE_MIN_CONNECTIONS", 2)?;
        let max_connections = parse_count(&lookup, "DATABASE_MAX_CONNECTIONS", 16)?;
        Ok(Self { url, min_connections, max_connections })
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() { Lazy::force(&DOTENV_LOADED); }
