//! Storage layer: the trained artifact pair on disk, and CSV ingestion of
//! historical training data.

mod error;
pub use error::StoreError;

mod artifacts;
pub use artifacts::{ArtifactManifest, ArtifactSet};

mod dataset;
pub use dataset::read_training_csv;
