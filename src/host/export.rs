use crate::cert::Encoding;
use crate::host::{HostStoreReader, RawCertificate};
use crate::utils::errors::{CertSyncError, Result};
use crate::utils::pem;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";
const CERTIFICATE_EXTENSIONS: [&str; 4] = ["cer", "crt", "der", "pem"];

/// Metadata written next to the exported files by the host
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ManifestEntry {
    file_name: String,
    subject: Option<String>,
    issuer: Option<String>,
    not_after: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Manifest {
    Many(Vec<ManifestEntry>),
    One(ManifestEntry),
}

/// Reads certificates already present in an export directory
pub struct ExportDirectoryReader {
    dir: PathBuf,
}

impl ExportDirectoryReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl HostStoreReader for ExportDirectoryReader {
    fn list_root_certificates(&self) -> Result<Vec<RawCertificate>> {
        read_export_dir(&self.dir)
    }
}

/// Enumerate exported certificate files. Unreadable files are skipped with a
/// warning; a missing directory or an export with no certificates is fatal.
pub fn read_export_dir(dir: &Path) -> Result<Vec<RawCertificate>> {
    if !dir.is_dir() {
        return Err(CertSyncError::Extraction(format!(
            "export directory missing: {}",
            dir.display()
        )));
    }

    let manifest = load_manifest(dir);

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| {
            CertSyncError::Extraction(format!(
                "export directory missing: {}: {e}",
                dir.display()
            ))
        })?
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {e}", dir.display());
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut certificates = Vec::new();
    for path in paths {
        let Some(hint) = encoding_hint(&path) else {
            tracing::debug!("Ignoring non-certificate file {}", path.display());
            continue;
        };

        let raw_bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Skipping {}: {e}", path.display());
                continue;
            }
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let meta = manifest.get(&file_name.to_lowercase());

        certificates.push(RawCertificate {
            raw_bytes,
            encoding_hint: hint,
            subject: meta.and_then(|m| m.subject.clone()),
            issuer: meta.and_then(|m| m.issuer.clone()),
            not_after: meta
                .and_then(|m| m.not_after.as_deref())
                .and_then(parse_timestamp),
            source: path.display().to_string(),
        });
    }

    if certificates.is_empty() {
        return Err(CertSyncError::Extraction(format!(
            "no certificates exported to {}",
            dir.display()
        )));
    }

    tracing::info!(
        "Read {} exported certificates from {}",
        certificates.len(),
        dir.display()
    );
    Ok(certificates)
}

/// Extension-based hint only; the normalizer inspects content
fn encoding_hint(path: &Path) -> Option<Encoding> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    if !CERTIFICATE_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    Some(match ext.as_str() {
        "pem" | "crt" => Encoding::Pem,
        _ => Encoding::Der,
    })
}

/// Manifest entries keyed by lowercase file name. A missing or corrupt
/// manifest only loses display metadata.
fn load_manifest(dir: &Path) -> HashMap<String, ManifestEntry> {
    let path = dir.join(MANIFEST_FILE);
    let Ok(bytes) = fs::read(&path) else {
        return HashMap::new();
    };

    let Some(text) = pem::decode_text(&bytes) else {
        tracing::warn!("Manifest {} is not text, ignoring", path.display());
        return HashMap::new();
    };

    let entries = match serde_json::from_str::<Manifest>(&text) {
        Ok(Manifest::Many(entries)) => entries,
        Ok(Manifest::One(entry)) => vec![entry],
        Err(e) => {
            tracing::warn!("Manifest {} could not be parsed: {e}", path.display());
            return HashMap::new();
        }
    };

    entries
        .into_iter()
        .map(|entry| (entry.file_name.to_lowercase(), entry))
        .collect()
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| tracing::debug!("Unparseable NotAfter '{value}': {e}"))
        .ok()
}
