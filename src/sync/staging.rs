use crate::cert::CertificateRecord;
use crate::utils::errors::{CertSyncError, Result};
use crate::utils::paths::CertBridgePaths;
use std::fs;
use std::path::{Path, PathBuf};

/// Private per-run directory holding `<thumbprint>.crt` files between
/// validation and installation. Removed when dropped.
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Create an empty staging directory, discarding leftovers from an
    /// interrupted run.
    pub fn create(dir: &Path) -> Result<Self> {
        if dir.exists() {
            tracing::debug!("Clearing stale staging directory {}", dir.display());
            fs::remove_dir_all(dir).map_err(|e| stage_error(dir, e))?;
        }
        CertBridgePaths::ensure_private_dir(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, record: &CertificateRecord) -> Result<PathBuf> {
        let path = self.dir.join(record.thumbprint.file_name());
        fs::write(&path, &record.raw_bytes).map_err(|e| stage_error(&path, e))?;
        Ok(path)
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            tracing::warn!("Failed to remove staging directory {}: {e}", self.dir.display());
        }
    }
}

fn stage_error(path: &Path, e: std::io::Error) -> CertSyncError {
    CertSyncError::Install(format!("failed to stage {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::Encoding;
    use crate::host::RawCertificate;

    #[test]
    fn test_create_write_and_drop() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("staging-1");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("leftover.crt"), "old").unwrap();

        let record = CertificateRecord::from_raw(RawCertificate {
            raw_bytes: b"pem".to_vec(),
            encoding_hint: Encoding::Pem,
            subject: None,
            issuer: None,
            not_after: None,
            source: "s".to_string(),
        });

        {
            let staging = StagingArea::create(&dir).unwrap();
            assert!(!dir.join("leftover.crt").exists());

            let path = staging.write(&record).unwrap();
            assert_eq!(path, dir.join(record.thumbprint.file_name()));
            assert_eq!(fs::read(&path).unwrap(), b"pem");
        }

        assert!(!dir.exists());
    }

    #[test]
    fn test_configured_parent_survives_a_run() {
        let root = tempfile::tempdir().unwrap();
        let parent = root.path().join("shared");
        fs::create_dir(&parent).unwrap();
        fs::write(parent.join("notes.txt"), "keep").unwrap();

        let dir = CertBridgePaths::staging_dir_in(&parent);
        drop(StagingArea::create(&dir).unwrap());

        assert!(!dir.exists());
        assert_eq!(fs::read_to_string(parent.join("notes.txt")).unwrap(), "keep");
    }
}
