//! alt-persistence
//!
//! Implementaciones durables de los puertos de `alt-core`:
//! - `pg`: `ArtifactStore` sobre Postgres (Diesel + r2d2), con claims por
//!   `UPDATE` condicional y reintentos ante errores transitorios.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de `DbConfig` desde `.env` / entorno.
//! - `fs_content`: `ContentStore` en sistema de archivos.

pub mod config;
pub mod error;
pub mod fs_content;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use fs_content::FsContentStore;
pub use pg::{build_pool, build_pool_from_env, ConnectionProvider, PgArtifactStore, PgPool, PoolProvider};
