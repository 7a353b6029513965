use crate::config::HostConfig;
use crate::host::export::{read_export_dir, MANIFEST_FILE};
use crate::host::{HostStoreReader, RawCertificate};
use crate::utils::errors::{CertSyncError, Result};
use base64::{engine::general_purpose, Engine as _};
use std::fs;
use std::process::{Command, Output};

const USER_ROOT_STORE: &str = "CurrentUser\\Root";

/// Exports host root stores through `powershell.exe`, then enumerates the
/// export directory from the guest side.
pub struct PowerShellStoreReader {
    config: HostConfig,
    verbose: bool,
}

impl PowerShellStoreReader {
    pub fn new(config: &HostConfig, verbose: bool) -> Self {
        Self {
            config: config.clone(),
            verbose,
        }
    }

    /// Stores to export, in order, without duplicates
    fn stores(&self) -> Vec<String> {
        let mut stores = self.config.stores.clone();
        if self.config.include_user_store
            && !stores.iter().any(|s| s.eq_ignore_ascii_case(USER_ROOT_STORE))
        {
            stores.push(USER_ROOT_STORE.to_string());
        }
        stores
    }

    /// Export directory path as the host sees it
    fn windows_export_dir(&self) -> Result<String> {
        if let Some(dir) = &self.config.export_dir_windows {
            return Ok(dir.clone());
        }

        let wslpath = which::which("wslpath").map_err(|_| {
            CertSyncError::Extraction(
                "wslpath not found; set host.export_dir_windows in the config".to_string(),
            )
        })?;
        let output = Command::new(wslpath)
            .arg("-w")
            .arg(&self.config.export_dir)
            .output()
            .map_err(|e| CertSyncError::Extraction(format!("cannot run wslpath: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CertSyncError::Extraction(format!(
                "wslpath could not translate {}: {}",
                self.config.export_dir.display(),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Script run on the host. Each certificate is written as DER
    /// `<Thumbprint>.cer`; metadata goes to the manifest.
    pub fn export_script(&self, windows_dir: &str) -> String {
        let stores = self
            .stores()
            .iter()
            .map(|s| ps_quote(&format!("Cert:\\{s}")))
            .collect::<Vec<_>>()
            .join(", ");
        let verbose = if self.verbose { "Continue" } else { "SilentlyContinue" };

        format!(
            r#"$ErrorActionPreference = 'Stop'
$VerbosePreference = '{verbose}'
$dest = {dest}
New-Item -ItemType Directory -Force -Path $dest | Out-Null
Get-ChildItem -Path $dest -Filter *.cer | Remove-Item -Force
$items = foreach ($store in @({stores})) {{
  Get-ChildItem -Path $store | Where-Object {{ $_.RawData }} | ForEach-Object {{
    $name = "$($_.Thumbprint).cer"
    [System.IO.File]::WriteAllBytes((Join-Path $dest $name), $_.RawData)
    Write-Verbose "exported $name from $store"
    [pscustomobject]@{{
      FileName = $name
      Subject = $_.Subject
      Issuer = $_.Issuer
      NotAfter = $_.NotAfter.ToUniversalTime().ToString('o')
      Store = $store
    }}
  }}
}}
ConvertTo-Json -InputObject @($items) | Set-Content -Path (Join-Path $dest '{manifest}') -Encoding UTF8
"#,
            dest = ps_quote(windows_dir),
            manifest = MANIFEST_FILE,
        )
    }

    /// Runs the export. Errors are failures before PowerShell produced an
    /// exit status; a nonzero exit is left to the caller.
    fn run_export(&self) -> Result<Output> {
        let powershell = which::which(&self.config.powershell).map_err(|_| {
            CertSyncError::Extraction(format!("{} not found in PATH", self.config.powershell))
        })?;

        fs::create_dir_all(&self.config.export_dir).map_err(|e| {
            CertSyncError::Extraction(format!(
                "cannot create export directory {}: {e}",
                self.config.export_dir.display()
            ))
        })?;

        let windows_dir = self.windows_export_dir()?;
        let script = self.export_script(&windows_dir);

        tracing::debug!(
            "Exporting {} to {windows_dir} via {}",
            self.stores().join(", "),
            powershell.display()
        );

        let output = Command::new(powershell)
            .args([
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-EncodedCommand",
            ])
            .arg(encode_command(&script))
            .output()
            .map_err(|e| {
                CertSyncError::Extraction(format!("cannot run {}: {e}", self.config.powershell))
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::debug!("powershell: {line}");
        }

        Ok(output)
    }
}

impl HostStoreReader for PowerShellStoreReader {
    /// An export that ran but exited nonzero still yields whatever the
    /// export directory holds. Failing to start the export is fatal.
    fn list_root_certificates(&self) -> Result<Vec<RawCertificate>> {
        let output = self.run_export()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                "powershell export exited with code {} ({}); reading existing files in {}",
                output.status.code().unwrap_or(-1),
                stderr.trim(),
                self.config.export_dir.display()
            );
        }
        read_export_dir(&self.config.export_dir)
    }
}

/// Single-quoted PowerShell literal
fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `-EncodedCommand` takes base64 of UTF-16LE
fn encode_command(script: &str) -> String {
    let bytes: Vec<u8> = script
        .encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect();
    general_purpose::STANDARD.encode(bytes)
}
