pub mod executor;
pub mod pipeline;
pub mod sweep;

pub use executor::{AttemptExecutor, AttemptReport, AttemptTrigger};
pub use pipeline::{Pipeline, StatusView, SubmissionReceipt};
pub use sweep::{RecoverySweep, SweepReport};
