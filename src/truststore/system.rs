use crate::config::{TrustStoreConfig, TrustStoreFlavor};
use crate::truststore::{copy_staged_anchors, remove_anchor_dir, InstallOutcome, TrustStoreInstaller};
use crate::utils::errors::{CertSyncError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

const DEBIAN_ANCHOR_ROOT: &str = "/usr/local/share/ca-certificates";
const DEBIAN_BUNDLE: &str = "/etc/ssl/certs/ca-certificates.crt";
const REDHAT_ANCHOR_ROOT: &str = "/etc/pki/ca-trust/source/anchors";
const REDHAT_BUNDLE: &str = "/etc/pki/tls/certs/ca-bundle.crt";

/// An external command with fixed arguments and environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustCommand {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl TrustCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: Vec::new(),
        }
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    /// Run to completion; failure carries the exit code and stderr
    pub fn run(&self) -> std::result::Result<(), String> {
        let program = which::which(&self.program)
            .map_err(|_| format!("{} not found in PATH", self.program))?;

        tracing::debug!("Executing: {} {}", self.program, self.args.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        let output = cmd
            .output()
            .map_err(|e| format!("failed to execute {}: {e}", self.program))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::debug!("{}: {line}", self.program);
        }

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(format!(
                "{} exited with code {}: {}",
                self.program,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            ))
        }
    }
}

impl std::fmt::Display for TrustStoreFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrustStoreFlavor::Auto => write!(f, "auto"),
            TrustStoreFlavor::Debian => write!(f, "debian"),
            TrustStoreFlavor::RedHat => write!(f, "redhat"),
        }
    }
}

impl TrustStoreFlavor {
    /// Pick a concrete flavor from the refresh tooling present on the guest
    pub fn resolve(self) -> Result<Self> {
        match self {
            TrustStoreFlavor::Auto => {
                if which::which("update-ca-certificates").is_ok() {
                    Ok(TrustStoreFlavor::Debian)
                } else if which::which("update-ca-trust").is_ok() {
                    Ok(TrustStoreFlavor::RedHat)
                } else {
                    Err(CertSyncError::Config(
                        "No supported trust store tooling found (update-ca-certificates or update-ca-trust)"
                            .to_string(),
                    ))
                }
            }
            concrete => Ok(concrete),
        }
    }

    fn anchor_root(self) -> &'static str {
        match self {
            TrustStoreFlavor::RedHat => REDHAT_ANCHOR_ROOT,
            _ => DEBIAN_ANCHOR_ROOT,
        }
    }

    fn bundle(self) -> &'static str {
        match self {
            TrustStoreFlavor::RedHat => REDHAT_BUNDLE,
            _ => DEBIAN_BUNDLE,
        }
    }

    fn refresh_command(self) -> TrustCommand {
        match self {
            TrustStoreFlavor::RedHat => TrustCommand::new("update-ca-trust", &["extract"]),
            _ => TrustCommand::new("update-ca-certificates", &[]),
        }
    }

    fn reinstall_command(self) -> TrustCommand {
        match self {
            TrustStoreFlavor::RedHat => {
                TrustCommand::new("dnf", &["reinstall", "-y", "ca-certificates"])
            }
            _ => TrustCommand::new("apt-get", &["install", "--reinstall", "-y", "ca-certificates"])
                .with_env("DEBIAN_FRONTEND", "noninteractive"),
        }
    }
}

/// Bundle a TLS client should trust. A configured bundle is used as-is,
/// without looking for refresh tooling.
pub fn resolve_trust_bundle(config: &TrustStoreConfig) -> Result<PathBuf> {
    match &config.trust_bundle {
        Some(bundle) => Ok(bundle.clone()),
        None => Ok(PathBuf::from(config.flavor.resolve()?.bundle())),
    }
}

/// Guest trust store driven by the distribution's own tooling
pub struct SystemTrustStore {
    anchor_dir: PathBuf,
    refresh: TrustCommand,
    reinstall: TrustCommand,
}

impl SystemTrustStore {
    pub fn from_config(config: &TrustStoreConfig) -> Result<Self> {
        let flavor = config.flavor.resolve()?;
        tracing::debug!("Using {flavor} trust store layout");

        let anchor_dir = config
            .anchor_dir
            .clone()
            .unwrap_or_else(|| Path::new(flavor.anchor_root()).join(&config.subdirectory));

        Ok(Self::with_commands(
            anchor_dir,
            flavor.refresh_command(),
            flavor.reinstall_command(),
        ))
    }

    pub fn with_commands(
        anchor_dir: PathBuf,
        refresh: TrustCommand,
        reinstall: TrustCommand,
    ) -> Self {
        Self {
            anchor_dir,
            refresh,
            reinstall,
        }
    }
}

impl TrustStoreInstaller for SystemTrustStore {
    fn anchor_dir(&self) -> &Path {
        &self.anchor_dir
    }

    fn install_trust_anchors(&self, staging_dir: &Path) -> InstallOutcome {
        copy_staged_anchors(staging_dir, &self.anchor_dir)
    }

    fn purge_trust_anchors(&self, dir: &Path) -> Result<()> {
        remove_anchor_dir(dir)
    }

    fn reinstall_base_package(&self) -> Result<()> {
        self.reinstall.run().map_err(CertSyncError::Install)
    }

    fn refresh_trust_store(&self) -> Result<()> {
        self.refresh.run().map_err(CertSyncError::Install)
    }
}
