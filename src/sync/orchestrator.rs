use crate::cert::{
    der_thumbprint, detect_encoding, normalize, CertificateRecord, Encoding, RecordStatus,
    Thumbprint, Validator,
};
use crate::config::SyncConfig;
use crate::host::HostStoreReader;
use crate::sync::batch::SyncBatch;
use crate::sync::staging::StagingArea;
use crate::truststore::TrustStoreInstaller;
use crate::utils::errors::{CertSyncError, ResetStep, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Extracting,
    Normalizing,
    Validating,
    Staging,
    Installing,
    Purging,
    Reinstalling,
    Refreshing,
    DryRun,
    Done,
    Aborted,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of a completed update run
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub records: Vec<CertificateRecord>,
    pub installed: usize,
    pub refreshed: bool,
}

impl SyncReport {
    pub fn count(&self, status: RecordStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }
}

/// One line of a dry-run preview. `record` carries the verdict an update
/// would reach; `detected` describes the bytes as exported.
#[derive(Debug, Clone)]
pub struct DryRunEntry {
    pub record: CertificateRecord,
    pub detected: Encoding,
    pub thumbprint: Option<Thumbprint>,
    pub present: bool,
}

/// Drives extract, normalize, validate, stage and install. Only this type
/// writes the guest anchor directory, and only while `Installing`.
///
/// No lock is held on the anchor directory: concurrent invocations must be
/// serialized by the caller.
pub struct SyncOrchestrator<'a> {
    reader: &'a dyn HostStoreReader,
    installer: &'a dyn TrustStoreInstaller,
    staging_dir: PathBuf,
    now: DateTime<Utc>,
    state: SyncState,
    aborted_in: Option<SyncState>,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(
        config: &SyncConfig,
        reader: &'a dyn HostStoreReader,
        installer: &'a dyn TrustStoreInstaller,
    ) -> Result<Self> {
        Ok(Self {
            reader,
            installer,
            staging_dir: config.staging_dir()?,
            now: Utc::now(),
            state: SyncState::Idle,
            aborted_in: None,
        })
    }

    /// Evaluate expiry against a fixed instant instead of the wall clock
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// State the last run was in when it aborted
    pub fn aborted_in(&self) -> Option<SyncState> {
        self.aborted_in
    }

    fn begin(&mut self) {
        self.state = SyncState::Idle;
        self.aborted_in = None;
    }

    fn transition(&mut self, next: SyncState) {
        tracing::debug!("Sync state: {} -> {next}", self.state);
        self.state = next;
    }

    fn abort(&mut self, err: CertSyncError) -> CertSyncError {
        tracing::debug!("Sync aborted in {}: {err}", self.state);
        self.aborted_in = Some(self.state);
        self.state = SyncState::Aborted;
        err
    }

    fn extract(&mut self) -> Result<Vec<CertificateRecord>> {
        self.transition(SyncState::Extracting);
        let raw = self
            .reader
            .list_root_certificates()
            .map_err(|e| self.abort(e))?;
        if raw.is_empty() {
            return Err(self.abort(CertSyncError::Extraction(
                "no certificates exported".to_string(),
            )));
        }
        Ok(raw.into_iter().map(CertificateRecord::from_raw).collect())
    }

    /// Full update: extract, normalize, validate, stage, install, refresh
    pub fn update(&mut self) -> Result<SyncReport> {
        self.begin();
        let records = self.extract()?;
        tracing::info!("Extracted {} certificates", records.len());

        self.transition(SyncState::Normalizing);
        let records: Vec<_> = records.into_iter().map(normalize).collect();

        self.transition(SyncState::Validating);
        let validator = Validator::new(self.now);
        let records: Vec<_> = records.into_iter().map(|r| validator.validate(r)).collect();

        self.transition(SyncState::Staging);
        let mut batch = SyncBatch::new(records);
        let selected = batch.select_for_staging();
        let staging = StagingArea::create(&self.staging_dir).map_err(|e| self.abort(e))?;
        for index in selected.values() {
            if let Some(record) = batch.records().get(*index) {
                staging.write(record).map_err(|e| self.abort(e))?;
            }
        }
        tracing::info!("Staged {} certificates in {}", selected.len(), staging.path().display());

        self.transition(SyncState::Installing);
        let outcome = self.installer.install_trust_anchors(staging.path());
        drop(staging);
        batch.mark_installed(&outcome.installed);

        let installed = outcome.count();
        let copy_error = outcome.error;
        let mut refreshed = false;
        if installed > 0 {
            // Refresh even after a copy failure so the store reflects what landed
            if let Err(refresh_error) = self.installer.refresh_trust_store() {
                let err = match copy_error {
                    Some(copy_error) => CertSyncError::Install(format!(
                        "{}; trust store refresh also failed: {}",
                        error_reason(copy_error),
                        error_reason(refresh_error)
                    )),
                    None => refresh_error,
                };
                return Err(self.abort(err));
            }
            refreshed = true;
            tracing::info!(
                "Installed {installed} certificates into {}",
                self.installer.anchor_dir().display()
            );
        } else {
            tracing::warn!("No certificates installed; skipping trust store refresh");
        }

        if let Some(err) = copy_error {
            return Err(self.abort(err));
        }

        self.transition(SyncState::Done);
        Ok(SyncReport {
            records: batch.into_records(),
            installed,
            refreshed,
        })
    }

    /// Preview what an update would import. Records get the same verdicts an
    /// update would give them, duplicates included. Nothing is written.
    pub fn dry_run(&mut self) -> Result<Vec<DryRunEntry>> {
        self.begin();
        let records = self.extract()?;
        self.transition(SyncState::DryRun);

        let anchor_dir = self.installer.anchor_dir();
        let scanned: Vec<(Encoding, Option<Thumbprint>)> = records
            .iter()
            .map(|r| (detect_encoding(&r.raw_bytes), der_thumbprint(&r.raw_bytes)))
            .collect();

        let validator = Validator::new(self.now);
        let mut batch = SyncBatch::new(
            records
                .into_iter()
                .map(|r| validator.validate(normalize(r)))
                .collect(),
        );
        batch.select_for_staging();

        Ok(batch
            .into_records()
            .into_iter()
            .zip(scanned)
            .map(|(record, (detected, thumbprint))| {
                let present = thumbprint
                    .as_ref()
                    .is_some_and(|t| anchor_dir.join(t.file_name()).is_file());
                DryRunEntry {
                    record,
                    detected,
                    thumbprint,
                    present,
                }
            })
            .collect())
    }

    /// Purge this tool's anchors, reinstall the base package and refresh.
    /// The first failing step aborts the reset.
    pub fn reset(&mut self) -> Result<()> {
        self.begin();
        let anchor_dir = self.installer.anchor_dir().to_path_buf();

        self.transition(SyncState::Purging);
        self.installer
            .purge_trust_anchors(&anchor_dir)
            .map_err(|e| self.abort(reset_error(ResetStep::Purge, e)))?;

        self.transition(SyncState::Reinstalling);
        self.installer
            .reinstall_base_package()
            .map_err(|e| self.abort(reset_error(ResetStep::Reinstall, e)))?;

        self.transition(SyncState::Refreshing);
        self.installer
            .refresh_trust_store()
            .map_err(|e| self.abort(reset_error(ResetStep::Refresh, e)))?;

        self.transition(SyncState::Done);
        Ok(())
    }
}

/// Message of an installer error without the variant prefix
fn error_reason(err: CertSyncError) -> String {
    match err {
        CertSyncError::Install(message) | CertSyncError::Config(message) => message,
        other => other.to_string(),
    }
}

fn reset_error(step: ResetStep, err: CertSyncError) -> CertSyncError {
    CertSyncError::Reset {
        step,
        reason: error_reason(err),
    }
}
