//! The sync pipeline: extract, normalize, validate, stage, install.

pub mod batch;
pub mod orchestrator;
pub mod staging;

pub use batch::SyncBatch;
pub use orchestrator::{DryRunEntry, SyncOrchestrator, SyncReport, SyncState};
pub use staging::StagingArea;
