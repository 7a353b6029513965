//! Host-side certificate enumeration.

pub mod export;
pub mod powershell;

use crate::cert::Encoding;
use crate::utils::errors::Result;
use chrono::{DateTime, Utc};

pub use export::{read_export_dir, ExportDirectoryReader};
pub use powershell::PowerShellStoreReader;

/// One certificate as exported by the host, before any processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCertificate {
    pub raw_bytes: Vec<u8>,
    pub encoding_hint: Encoding,
    pub subject: Option<String>,
    pub issuer: Option<String>,
    pub not_after: Option<DateTime<Utc>>,
    pub source: String,
}

/// Source of host root certificates.
///
/// Implementations return every certificate they could read. An unreachable
/// or empty export is an `Extraction` error.
pub trait HostStoreReader {
    fn list_root_certificates(&self) -> Result<Vec<RawCertificate>>;
}
