pub mod analyze;
pub mod fetch;

pub use fetch::{ArtifactPipeline, FetchOutcome};
