use crate::cert::record::{CertificateRecord, RecordStatus};
use crate::cert::CertificateParser;
use crate::utils::errors::{CertSyncError, RecordError};
use chrono::{DateTime, Utc};

/// Structural and expiry checks for normalized records.
pub struct Validator {
    now: DateTime<Utc>,
}

impl Validator {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Validate one record. Expiry is checked first and wins over structural
    /// failure; host metadata supplies `not_after` when parsing fails.
    pub fn validate(&self, record: CertificateRecord) -> CertificateRecord {
        if record.status != RecordStatus::Normalized {
            return record;
        }

        let parsed = std::str::from_utf8(&record.raw_bytes)
            .map_err(|e| CertSyncError::CertParsing(e.to_string()))
            .and_then(CertificateParser::parse_pem);

        let mut record = record;
        match parsed {
            Ok(meta) => {
                record.subject = meta.subject.clone();
                record.issuer = meta.issuer.clone();
                record.not_after = Some(meta.not_after);

                if meta.is_expired_at(self.now) {
                    return record.reject(RecordError::Expired);
                }
                if self.now < meta.not_before {
                    tracing::debug!(
                        "{}: not valid before {}",
                        record.source,
                        meta.not_before.format("%Y-%m-%d")
                    );
                }
                if !meta.is_ca {
                    tracing::debug!("{}: not marked as a CA certificate", record.source);
                }

                record.status = RecordStatus::Validated;
                record
            }
            Err(e) => {
                tracing::debug!("{}: {e}", record.source);
                if self.is_expired(&record) {
                    record.reject(RecordError::Expired)
                } else {
                    record.reject(RecordError::MalformedCertificate)
                }
            }
        }
    }

    fn is_expired(&self, record: &CertificateRecord) -> bool {
        record.not_after.is_some_and(|not_after| self.now > not_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::normalize::normalize;
    use crate::cert::record::Encoding;
    use crate::host::RawCertificate;
    use crate::utils::pem::PemCertificate;
    use chrono::TimeZone;
    use rcgen::{CertificateParams, DnType, KeyPair};

    fn cert(cn: &str, not_after_year: i32) -> rcgen::Certificate {
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.distinguished_name.push(DnType::CommonName, cn);
        params.not_before = rcgen::date_time_ymd(2015, 1, 1);
        params.not_after = rcgen::date_time_ymd(not_after_year, 6, 1);
        let key = KeyPair::generate().unwrap();
        params.self_signed(&key).unwrap()
    }

    fn normalized(bytes: Vec<u8>, host_not_after: Option<DateTime<Utc>>) -> CertificateRecord {
        normalize(CertificateRecord::from_raw(RawCertificate {
            raw_bytes: bytes,
            encoding_hint: Encoding::Unknown,
            subject: Some("host subject".to_string()),
            issuer: None,
            not_after: host_not_after,
            source: "test".to_string(),
        }))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_valid_certificate_is_validated() {
        let c = cert("Valid Root", 2040);
        let record = normalized(c.der().to_vec(), None);
        let bytes_before = record.raw_bytes.clone();

        let out = Validator::new(now()).validate(record);
        assert_eq!(out.status, RecordStatus::Validated);
        assert_eq!(out.subject, "Valid Root");
        assert_eq!(out.rejection, None);
        assert_eq!(out.raw_bytes, bytes_before);
        assert_eq!(
            out.not_after.unwrap().format("%Y-%m-%d").to_string(),
            "2040-06-01"
        );
    }

    #[test]
    fn test_expired_certificate_is_rejected() {
        let c = cert("Old Root", 2025);
        let out = Validator::new(now()).validate(normalized(c.pem().into_bytes(), None));
        assert_eq!(out.status, RecordStatus::Rejected);
        assert_eq!(out.rejection, Some(RecordError::Expired));
    }

    #[test]
    fn test_expiry_wins_over_malformed_structure() {
        // A well-formed DER envelope that is not a certificate
        let bogus = PemCertificate::from_der(&[0x30, 0x03, 0x02, 0x01, 0x05])
            .pem_data()
            .as_bytes()
            .to_vec();
        let expired_on = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();

        let out = Validator::new(now()).validate(normalized(bogus.clone(), Some(expired_on)));
        assert_eq!(out.rejection, Some(RecordError::Expired));

        let out = Validator::new(now()).validate(normalized(bogus, None));
        assert_eq!(out.rejection, Some(RecordError::MalformedCertificate));
    }

    #[test]
    fn test_parsed_expiry_overrides_host_metadata() {
        let c = cert("Renewed Root", 2040);
        let stale = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let out = Validator::new(now()).validate(normalized(c.der().to_vec(), Some(stale)));
        assert_eq!(out.status, RecordStatus::Validated);
    }

    #[test]
    fn test_pending_records_are_not_validated() {
        let c = cert("Pending Root", 2040);
        let pending = CertificateRecord::from_raw(RawCertificate {
            raw_bytes: c.der().to_vec(),
            encoding_hint: Encoding::Der,
            subject: None,
            issuer: None,
            not_after: None,
            source: "test".to_string(),
        });
        let out = Validator::new(now()).validate(pending.clone());
        assert_eq!(out, pending);
    }
}
