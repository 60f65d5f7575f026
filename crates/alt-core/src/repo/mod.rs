pub mod memory;
pub mod types;
pub use memory::InMemoryArtifactStore;
pub use types::{ArtifactStore, ClaimMode, ClaimOutcome, ClaimRequest, ClaimToken, CompletedOutput, InsertOutcome, Resolution, StoreError};
