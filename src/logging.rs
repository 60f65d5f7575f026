//! Inicialización de logs para los binarios.
//!
//! Las librerías registran con `log`; el subscriber de `tracing` los recibe
//! a través de su puente `tracing-log`.
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` manda; sin él, `info` (o `debug` con `verbose`). Llamar más de
/// una vez no tiene efecto.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}
