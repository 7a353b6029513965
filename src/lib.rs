pub mod cert;
pub mod cli;
pub mod config;
pub mod connectivity;
pub mod host;
pub mod sync;
pub mod truststore;
pub mod utils;

// Re-export specific items to avoid conflicts
pub use cert::{CertificateRecord, CertificateParser, RecordStatus, Thumbprint};
pub use cli::{args, commands};
pub use config::SyncConfig;
pub use sync::{SyncOrchestrator, SyncReport, SyncState};
pub use utils::{errors, paths};
