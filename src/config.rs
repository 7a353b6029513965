use crate::utils::errors::{CertSyncError, Result};
use crate::utils::paths::{CertBridgePaths, PROGRAM_NAME};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything a run needs, passed to each component at construction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub host: HostConfig,
    pub trust_store: TrustStoreConfig,
    /// Parent of the per-run staging directory, instead of the runtime dir
    pub staging_dir: Option<PathBuf>,
    pub test: ConnectivityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Export directory as seen from the guest
    pub export_dir: PathBuf,
    /// Export directory as seen from the host; derived with `wslpath -w` when unset
    pub export_dir_windows: Option<String>,
    pub powershell: String,
    /// Certificate store paths below `Cert:\`
    pub stores: Vec<String>,
    pub include_user_store: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from(format!("/mnt/c/Users/Public/{PROGRAM_NAME}")),
            export_dir_windows: None,
            powershell: "powershell.exe".to_string(),
            stores: vec!["LocalMachine\\Root".to_string()],
            include_user_store: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustStoreFlavor {
    #[default]
    Auto,
    Debian,
    RedHat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustStoreConfig {
    pub flavor: TrustStoreFlavor,
    /// Subdirectory of the OS anchor root holding this tool's imports
    pub subdirectory: String,
    /// Full override of `<anchor root>/<subdirectory>`
    pub anchor_dir: Option<PathBuf>,
    /// Bundle used as the sole trust source by the connectivity test
    pub trust_bundle: Option<PathBuf>,
}

impl Default for TrustStoreConfig {
    fn default() -> Self {
        Self {
            flavor: TrustStoreFlavor::Auto,
            subdirectory: PROGRAM_NAME.to_string(),
            anchor_dir: None,
            trust_bundle: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub timeout_secs: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl ConnectivityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SyncConfig {
    /// Load configuration. An explicit path must exist; the default path is
    /// optional and missing means built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (CertBridgePaths::config_file()?, false),
        };

        if !path.exists() {
            if required {
                return Err(CertSyncError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config = Self::from_yaml(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        let subdir = &self.trust_store.subdirectory;
        if subdir.is_empty() || subdir.contains('/') || subdir == "." || subdir == ".." {
            return Err(CertSyncError::Config(format!(
                "trust_store.subdirectory must be a single directory name, got '{subdir}'"
            )));
        }
        if self.test.timeout_secs == 0 {
            return Err(CertSyncError::Config(
                "test.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.host.stores.is_empty() {
            return Err(CertSyncError::Config(
                "host.stores must name at least one certificate store".to_string(),
            ));
        }
        Ok(())
    }

    /// Staging directory for this run
    pub fn staging_dir(&self) -> Result<PathBuf> {
        match &self.staging_dir {
            Some(dir) => Ok(CertBridgePaths::staging_dir_in(dir)),
            None => CertBridgePaths::staging_dir(),
        }
    }
}
