use crate::utils::errors::{CertSyncError, Result};
use dirs;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CertBridgePaths;
pub const PROGRAM_NAME: &str = "certbridge";

impl CertBridgePaths {
    /// Get the config directory: ~/.config/certbridge/
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(PROGRAM_NAME))
            .ok_or_else(|| CertSyncError::Config("Cannot determine config directory".to_string()))
    }

    /// Get the default config file: ~/.config/certbridge/config.yaml
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.yaml"))
    }

    /// Get the runtime directory: $XDG_RUNTIME_DIR/certbridge/
    pub fn runtime_dir() -> Result<PathBuf> {
        if let Some(runtime_dir) = std::env::var_os("XDG_RUNTIME_DIR") {
            Ok(PathBuf::from(runtime_dir).join(PROGRAM_NAME))
        } else {
            // Fallback to temp directory with user-specific path
            let user_id = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
            Ok(PathBuf::from(format!("/tmp/{PROGRAM_NAME}-{user_id}")))
        }
    }

    /// Get the per-run staging directory: $XDG_RUNTIME_DIR/certbridge/staging-<pid>/
    pub fn staging_dir() -> Result<PathBuf> {
        Ok(Self::staging_dir_in(&Self::runtime_dir()?))
    }

    /// Per-run staging directory under `parent`
    pub fn staging_dir_in(parent: &Path) -> PathBuf {
        parent.join(format!("staging-{}", std::process::id()))
    }

    /// Ensure a directory exists with restrictive permissions (700)
    pub fn ensure_private_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mut perms = fs::metadata(path)?.permissions();
                perms.set_mode(0o700);
                fs::set_permissions(path, perms)?;
            }
        }
        Ok(())
    }

    /// Ensure a world-readable directory exists (755)
    pub fn ensure_public_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mut perms = fs::metadata(path)?.permissions();
                perms.set_mode(0o755);
                fs::set_permissions(path, perms)?;
            }
        }
        Ok(())
    }
}
