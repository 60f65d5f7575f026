//! Postgres (Diesel + r2d2): pool, provider de conexiones y reintentos.
//!
//! Toda operación del store corre dentro de `with_retry`: los errores
//! transitorios (pool, conexión, conflictos de serialización) se reintentan
//! hasta 3 veces con backoff lineal corto antes de propagarse.

use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use log::warn;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;

mod rows;
mod store;

pub use store::PgArtifactStore;

/// Pool r2d2 de conexiones Postgres. Al construirlo se corren las
/// migraciones pendientes.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type PgPooled = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones (pool real en producción).
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooled, PersistenceError>;
}

pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooled, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Determina si un error es transitorio (recomendado reintentar con backoff).
pub(crate) fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict => true,
        PersistenceError::TransientIo(_) => true,
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected")
            || m.contains("could not serialize access")
            || m.contains("terminating connection")
            || m.contains("connection closed")
            || m.contains("connection refused")
        }
        _ => false,
    }
}

/// Reintento con backoff 15ms, 30ms, 45ms; `warn!` por intento.
pub(crate) fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms", attempts + 1, e, delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let max = max_size.max(1);
    let min = min_size.max(1);
    if min > max {
        warn!("pool: min_size > max_size ({min} > {max}), ajustando min=max");
    }
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(min.min(max)))
                                    .max_size(max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Carga `.env`, lee `DbConfig` y construye un pool ya migrado.
pub fn build_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn retries_transient_then_succeeds() {
        let calls = Cell::new(0);
        let out = with_retry(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(PersistenceError::TransientIo("pool timeout".into()))
            } else {
                Ok(7)
            }
        });
        assert_eq!(out.unwrap(), 7);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn non_retryable_is_returned_immediately() {
        let calls = Cell::new(0);
        let out: Result<(), _> = with_retry(|| {
            calls.set(calls.get() + 1);
            Err(PersistenceError::UniqueViolation("dup".into()))
        });
        assert!(matches!(out, Err(PersistenceError::UniqueViolation(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn gives_up_after_three_retries() {
        let calls = Cell::new(0);
        let out: Result<(), _> = with_retry(|| {
            calls.set(calls.get() + 1);
            Err(PersistenceError::SerializationConflict)
        });
        assert!(out.is_err());
        assert_eq!(calls.get(), 4);
    }
}
