use crate::cert::Thumbprint;
use crate::host::RawCertificate;
use crate::utils::errors::RecordError;
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Der,
    Pem,
    Unknown,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Der => write!(f, "DER"),
            Encoding::Pem => write!(f, "PEM"),
            Encoding::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Pending,
    Normalized,
    Validated,
    Rejected,
    Installed,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Normalized => "normalized",
            RecordStatus::Validated => "validated",
            RecordStatus::Rejected => "rejected",
            RecordStatus::Installed => "installed",
        };
        write!(f, "{label}")
    }
}

/// One certificate travelling through a sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    pub thumbprint: Thumbprint,
    pub subject: String,
    pub issuer: String,
    pub not_after: Option<DateTime<Utc>>,
    pub raw_bytes: Vec<u8>,
    pub encoding: Encoding,
    pub status: RecordStatus,
    pub rejection: Option<RecordError>,
    pub source: String,
}

impl CertificateRecord {
    /// Create a pending record from a host export. The thumbprint covers the
    /// raw bytes until normalization recomputes it from the DER content.
    pub fn from_raw(raw: RawCertificate) -> Self {
        Self {
            thumbprint: Thumbprint::of(&raw.raw_bytes),
            subject: raw.subject.unwrap_or_else(|| "Unknown".to_string()),
            issuer: raw.issuer.unwrap_or_else(|| "Unknown".to_string()),
            not_after: raw.not_after,
            raw_bytes: raw.raw_bytes,
            encoding: raw.encoding_hint,
            status: RecordStatus::Pending,
            rejection: None,
            source: raw.source,
        }
    }

    pub fn reject(mut self, reason: RecordError) -> Self {
        self.mark_rejected(reason);
        self
    }

    pub fn mark_rejected(&mut self, reason: RecordError) {
        tracing::info!("Rejected {}: {reason}", self.source);
        self.status = RecordStatus::Rejected;
        self.rejection = Some(reason);
    }

    /// Status column for reports: the rejection reason when rejected
    pub fn status_label(&self) -> String {
        match self.rejection {
            Some(reason) => format!("{} ({reason})", self.status),
            None => self.status.to_string(),
        }
    }

    pub fn not_after_label(&self) -> String {
        self.not_after
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

impl fmt::Display for CertificateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Subject: {}, Thumbprint: {}, Expires: {}",
            self.subject,
            self.thumbprint.short(),
            self.not_after_label()
        )
    }
}
