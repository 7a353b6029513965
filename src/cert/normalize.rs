//! Encoding detection and conversion to canonical PEM.
//!
//! Detection inspects content, never the file extension. Text armor wins,
//! then a structurally complete DER envelope, then the mixed encodings
//! Windows tooling produces (BOM-prefixed or UTF-16 PEM, bare base64).

use crate::cert::record::{CertificateRecord, Encoding, RecordStatus};
use crate::cert::Thumbprint;
use crate::utils::errors::RecordError;
use crate::utils::pem::{self, PemCertificate};

const ASN1_SEQUENCE: u8 = 0x30;

/// Detect the encoding of raw certificate bytes
pub fn detect_encoding(bytes: &[u8]) -> Encoding {
    if pem::is_canonical_text(bytes) {
        Encoding::Pem
    } else if is_der_envelope(bytes) {
        Encoding::Der
    } else {
        Encoding::Unknown
    }
}

/// DER content of one certificate, and whether the input bytes are already
/// a lone PEM block that can be kept as is
struct Decoded {
    der: Vec<u8>,
    keep_bytes: bool,
}

/// Decode exactly one certificate. Text holding several certificate blocks
/// is refused so that nothing unchecked rides along into the anchor file.
fn decode_single(bytes: &[u8], detected: Encoding) -> Option<Decoded> {
    let decoded = match detected {
        Encoding::Pem => {
            let text = std::str::from_utf8(bytes).ok()?;
            if pem::count_certificate_blocks(text) != 1 {
                return None;
            }
            Decoded {
                der: pem::decode_first_certificate(text)?,
                keep_bytes: pem::is_single_block(text),
            }
        }
        Encoding::Der => Decoded {
            der: bytes.to_vec(),
            keep_bytes: false,
        },
        Encoding::Unknown => Decoded {
            der: decode_mixed(bytes)?,
            keep_bytes: false,
        },
    };
    is_der_envelope(&decoded.der).then_some(decoded)
}

/// Convert a record to PEM holding exactly one certificate. A lone PEM block
/// keeps its bytes; anything else is re-armored from the DER content. The
/// thumbprint is always recomputed from the DER content.
pub fn normalize(record: CertificateRecord) -> CertificateRecord {
    if !matches!(
        record.status,
        RecordStatus::Pending | RecordStatus::Normalized
    ) {
        return record;
    }

    let detected = detect_encoding(&record.raw_bytes);
    let decoded = match decode_single(&record.raw_bytes, detected) {
        Some(decoded) => decoded,
        None => {
            tracing::debug!(
                "{}: not exactly one DER or PEM certificate (hint was {})",
                record.source,
                record.encoding
            );
            return record.reject(RecordError::MalformedEncoding);
        }
    };

    let mut record = record;
    record.thumbprint = Thumbprint::of(&decoded.der);
    if !decoded.keep_bytes {
        tracing::debug!("{}: converted {detected} to PEM", record.source);
        record.raw_bytes = PemCertificate::from_der(&decoded.der)
            .pem_data()
            .as_bytes()
            .to_vec();
    }
    record.encoding = Encoding::Pem;
    record.status = RecordStatus::Normalized;
    record
}

/// DER thumbprint of raw bytes without touching any record
pub fn der_thumbprint(bytes: &[u8]) -> Option<Thumbprint> {
    decode_single(bytes, detect_encoding(bytes)).map(|decoded| Thumbprint::of(&decoded.der))
}

/// Text that is not canonical PEM: BOM or UTF-16 armored text, or bare base64
fn decode_mixed(bytes: &[u8]) -> Option<Vec<u8>> {
    let text = pem::decode_text(bytes)?;
    if pem::has_certificate_armor(&text) {
        if pem::count_certificate_blocks(&text) != 1 {
            return None;
        }
        pem::decode_first_certificate(&text)
    } else {
        pem::decode_bare_base64(&text)
    }
}

/// True when the bytes are exactly one ASN.1 SEQUENCE with a definite
/// length covering the whole input.
pub fn is_der_envelope(bytes: &[u8]) -> bool {
    if bytes.len() < 2 || bytes[0] != ASN1_SEQUENCE {
        return false;
    }

    let first = bytes[1];
    let (content_len, header_len) = if first & 0x80 == 0 {
        (first as usize, 2)
    } else {
        let count = (first & 0x7f) as usize;
        // 0x80 is the indefinite form, which DER forbids
        if count == 0 || count > 4 || bytes.len() < 2 + count {
            return false;
        }
        let len = bytes[2..2 + count]
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | *b as usize);
        (len, 2 + count)
    };

    header_len + content_len == bytes.len()
}
