//! Constantes del pipeline: valores por defecto de configuración y textos de
//! error que quedan persistidos en los registros.

pub const DEFAULT_SYNC_BUDGET_SECS: u64 = 10;
pub const DEFAULT_SWEEP_BUDGET_SECS: u64 = 60;
pub const DEFAULT_PER_CALL_TIMEOUT_SECS: u64 = 10;
/// Debe superar al budget del sweep; si no, un intento sano parecería abandonado.
pub const DEFAULT_STUCK_THRESHOLD_SECS: u64 = 300;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_SWEEP_BATCH_SIZE: usize = 1;
pub const DEFAULT_SWEEP_CONCURRENCY: usize = 1;
/// 50 MiB.
pub const DEFAULT_MAX_CONTENT_BYTES: u64 = 50 * 1024 * 1024;

pub const ATTEMPTS_EXHAUSTED: &str = "attempts exhausted";
pub const SYNC_DEFERRED_NOTE: &str = "sync attempt timed out; will retry in background";
pub const CONTENT_NOT_FOUND: &str = "content not found";
