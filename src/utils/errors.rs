use thiserror::Error;

#[derive(Error, Debug)]
pub enum CertSyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Install error: {0}")]
    Install(String),

    #[error("Reset failed while {step}: {reason}")]
    Reset { step: ResetStep, reason: String },

    #[error("Connectivity test failed: {0}")]
    NetworkTest(String),

    #[error("Certificate parsing error: {0}")]
    CertParsing(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Sub-step of the reset path, named in [`CertSyncError::Reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStep {
    Purge,
    Reinstall,
    Refresh,
}

impl std::fmt::Display for ResetStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResetStep::Purge => write!(f, "purging imported anchors"),
            ResetStep::Reinstall => write!(f, "reinstalling the base trust package"),
            ResetStep::Refresh => write!(f, "refreshing the trust store"),
        }
    }
}

/// Per-record failures. These never abort a run; they are stored on the
/// record and exclude it from later stages.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    #[error("malformed encoding")]
    MalformedEncoding,

    #[error("malformed certificate")]
    MalformedCertificate,

    #[error("expired")]
    Expired,

    #[error("duplicate thumbprint")]
    DuplicateThumbprint,
}

pub type Result<T> = std::result::Result<T, CertSyncError>;
