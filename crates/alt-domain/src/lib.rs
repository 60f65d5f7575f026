// alt-domain library entry point
pub mod artifact;
pub mod error;
pub mod fingerprint;
pub mod result;
pub mod status;
pub use artifact::{Artifact, NewArtifact};
pub use error::DomainError;
pub use fingerprint::{detect_kind, DetectedKind, Fingerprint};
pub use result::{ResultAttempt, Usage};
pub use status::ArtifactStatus;
