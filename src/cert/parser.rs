use crate::utils::errors::{CertSyncError, Result};
use crate::utils::pem;
use chrono::{DateTime, Utc};
use x509_parser::der_parser::oid;
use x509_parser::prelude::*;

const BASIC_CONSTRAINTS_OID: oid::Oid = oid!(2.5.29 .19);

/// Fields surfaced from a parsed certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateMetadata {
    pub subject: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub is_ca: bool,
}

impl CertificateMetadata {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.not_after
    }
}

pub struct CertificateParser;

impl CertificateParser {
    /// Parse certificate PEM data into metadata
    pub fn parse_pem(pem_data: &str) -> Result<CertificateMetadata> {
        let der_bytes = pem::decode_first_certificate(pem_data).ok_or_else(|| {
            CertSyncError::CertParsing("No certificate data found in PEM".to_string())
        })?;

        Self::parse_der(&der_bytes)
    }

    /// Parse a DER certificate into metadata
    pub fn parse_der(der_bytes: &[u8]) -> Result<CertificateMetadata> {
        let (_, cert) = X509Certificate::from_der(der_bytes)
            .map_err(|e| CertSyncError::CertParsing(format!("DER parsing error: {e}")))?;

        Self::extract_metadata(&cert)
    }

    fn extract_metadata(cert: &X509Certificate) -> Result<CertificateMetadata> {
        let not_before = DateTime::from_timestamp(cert.validity().not_before.timestamp(), 0)
            .ok_or_else(|| CertSyncError::CertParsing("notBefore out of range".to_string()))?;
        let not_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
            .ok_or_else(|| CertSyncError::CertParsing("notAfter out of range".to_string()))?;

        // Check if this is a CA certificate
        let mut is_ca = false;
        for ext in cert.extensions() {
            if ext.oid == BASIC_CONSTRAINTS_OID {
                if let Ok((_rem, bc)) = BasicConstraints::from_der(ext.value) {
                    is_ca = bc.ca;
                }
                break;
            }
        }

        Ok(CertificateMetadata {
            subject: display_name(cert.subject()),
            issuer: display_name(cert.issuer()),
            not_before,
            not_after,
            is_ca,
        })
    }
}

/// Common name when present, otherwise the full distinguished name
fn display_name(name: &X509Name) -> String {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| {
            let full = name.to_string();
            if full.is_empty() {
                "Unknown".to_string()
            } else {
                full
            }
        })
}
