//! Guest trust store: copying staged anchors in and driving the OS tooling.

pub mod system;

use crate::cert::Thumbprint;
use crate::utils::errors::{CertSyncError, Result};
use crate::utils::paths::CertBridgePaths;
use std::fs;
use std::path::{Path, PathBuf};

pub use system::{resolve_trust_bundle, SystemTrustStore, TrustCommand};

/// Result of copying a staged set into the anchor directory. `installed`
/// lists every file that landed even when `error` reports a later failure.
#[derive(Debug, Default)]
pub struct InstallOutcome {
    pub installed: Vec<Thumbprint>,
    pub error: Option<CertSyncError>,
}

impl InstallOutcome {
    pub fn count(&self) -> usize {
        self.installed.len()
    }
}

pub trait TrustStoreInstaller {
    /// Directory holding this tool's anchors
    fn anchor_dir(&self) -> &Path;

    /// Copy every staged `<thumbprint>.crt` into the anchor directory
    fn install_trust_anchors(&self, staging_dir: &Path) -> InstallOutcome;

    /// Remove the given anchor directory and everything in it
    fn purge_trust_anchors(&self, dir: &Path) -> Result<()>;

    fn reinstall_base_package(&self) -> Result<()>;

    fn refresh_trust_store(&self) -> Result<()>;
}

/// Copy staged files into `anchor_dir`, stopping at the first failure.
/// Each file is written under a temporary name and renamed into place so the
/// refresh tooling never sees a partial certificate.
pub fn copy_staged_anchors(staging_dir: &Path, anchor_dir: &Path) -> InstallOutcome {
    let mut outcome = InstallOutcome::default();

    let staged = match staged_files(staging_dir) {
        Ok(staged) => staged,
        Err(e) => {
            outcome.error = Some(e);
            return outcome;
        }
    };

    if staged.is_empty() {
        return outcome;
    }

    if let Err(e) = CertBridgePaths::ensure_public_dir(anchor_dir) {
        outcome.error = Some(CertSyncError::Install(format!(
            "cannot create anchor directory {}: {e}",
            anchor_dir.display()
        )));
        return outcome;
    }

    for (thumbprint, source) in staged {
        match install_one(&source, anchor_dir, &thumbprint) {
            Ok(()) => {
                tracing::debug!("Installed {}", thumbprint.file_name());
                outcome.installed.push(thumbprint);
            }
            Err(e) => {
                outcome.error = Some(CertSyncError::Install(format!(
                    "failed to copy {} into {}: {e}",
                    source.display(),
                    anchor_dir.display()
                )));
                break;
            }
        }
    }

    outcome
}

fn staged_files(staging_dir: &Path) -> Result<Vec<(Thumbprint, PathBuf)>> {
    let entries = fs::read_dir(staging_dir).map_err(|e| {
        CertSyncError::Install(format!(
            "cannot read staging directory {}: {e}",
            staging_dir.display()
        ))
    })?;

    let mut staged = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("crt") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match stem.parse::<Thumbprint>() {
            Ok(thumbprint) => staged.push((thumbprint, path)),
            Err(e) => tracing::warn!("Ignoring unexpected staged file {}: {e}", path.display()),
        }
    }
    staged.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(staged)
}

fn install_one(source: &Path, anchor_dir: &Path, thumbprint: &Thumbprint) -> std::io::Result<()> {
    let target = anchor_dir.join(thumbprint.file_name());
    let partial = anchor_dir.join(format!(".{}.partial", thumbprint.as_hex()));

    fs::copy(source, &partial)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&partial, fs::Permissions::from_mode(0o644))?;
    }

    fs::rename(&partial, &target).inspect_err(|_| {
        let _ = fs::remove_file(&partial);
    })
}

/// Remove an anchor directory. Refuses filesystem roots and relative paths.
pub fn remove_anchor_dir(dir: &Path) -> Result<()> {
    if !dir.is_absolute() || dir.parent().is_none() || dir.file_name().is_none() {
        return Err(CertSyncError::Config(format!(
            "refusing to purge {}",
            dir.display()
        )));
    }

    if !dir.exists() {
        tracing::info!("Anchor directory {} does not exist, nothing to purge", dir.display());
        return Ok(());
    }

    fs::remove_dir_all(dir)?;
    tracing::info!("Purged {}", dir.display());
    Ok(())
}
