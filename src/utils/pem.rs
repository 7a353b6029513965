use base64::{engine::general_purpose, Engine as _};

pub const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
pub const PEM_END: &str = "-----END CERTIFICATE-----";
const PEM_LINE_WIDTH: usize = 64;

/// Represents a PEM-encoded certificate in canonical layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemCertificate {
    pem_data: String,
}

impl PemCertificate {
    /// Armor DER bytes: base64 body wrapped at 64 columns, single trailing newline
    pub fn from_der(der: &[u8]) -> Self {
        let body = general_purpose::STANDARD.encode(der);
        let mut pem_data = String::with_capacity(body.len() + body.len() / PEM_LINE_WIDTH + 64);
        pem_data.push_str(PEM_BEGIN);
        pem_data.push('\n');
        for chunk in body.as_bytes().chunks(PEM_LINE_WIDTH) {
            // base64 output is ASCII
            pem_data.push_str(&String::from_utf8_lossy(chunk));
            pem_data.push('\n');
        }
        pem_data.push_str(PEM_END);
        pem_data.push('\n');

        Self { pem_data }
    }

    /// Get the raw PEM data
    pub fn pem_data(&self) -> &str {
        &self.pem_data
    }
}

/// Decode bytes that might be text as written by Windows tooling.
///
/// Handles UTF-8 (with or without BOM) and UTF-16 with a BOM. Returns `None`
/// when the bytes are not text.
pub fn decode_text(bytes: &[u8]) -> Option<String> {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8(rest.to_vec()).ok();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, u16::from_be_bytes);
    }
    std::str::from_utf8(bytes).ok().map(str::to_string)
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

/// True when the bytes are plain UTF-8 text carrying certificate armor
pub fn is_canonical_text(bytes: &[u8]) -> bool {
    !bytes.starts_with(&[0xEF, 0xBB, 0xBF])
        && std::str::from_utf8(bytes).is_ok_and(has_certificate_armor)
}

pub fn has_certificate_armor(text: &str) -> bool {
    count_certificate_blocks(text) > 0
}

/// Number of `BEGIN CERTIFICATE` markers in the text
pub fn count_certificate_blocks(text: &str) -> usize {
    text.lines().filter(|line| line.trim() == PEM_BEGIN).count()
}

/// True when the text, ignoring surrounding whitespace, is exactly one
/// certificate block with nothing before or after it
pub fn is_single_block(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with(PEM_BEGIN)
        && trimmed.ends_with(PEM_END)
        && count_certificate_blocks(trimmed) == 1
        && trimmed.matches(PEM_END).count() == 1
}

/// Extract the base64 body of the first certificate block
fn extract_certificate_body(text: &str) -> Option<String> {
    let mut in_cert = false;
    let mut closed = false;
    let mut cert_lines = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line == PEM_BEGIN {
            in_cert = true;
            continue;
        } else if line == PEM_END && in_cert {
            closed = true;
            break;
        } else if in_cert {
            cert_lines.push(line);
        }
    }

    if !closed || cert_lines.is_empty() {
        return None;
    }

    Some(cert_lines.concat())
}

/// Decode the first armored certificate block to DER bytes
pub fn decode_first_certificate(text: &str) -> Option<Vec<u8>> {
    let body = extract_certificate_body(text)?;
    general_purpose::STANDARD.decode(body).ok()
}

/// Decode unarmored base64 text (whitespace tolerated) to bytes
pub fn decode_bare_base64(text: &str) -> Option<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }
    general_purpose::STANDARD.decode(compact).ok()
}
