use certbridge::cert::{RecordStatus, Thumbprint};
use certbridge::config::SyncConfig;
use certbridge::host::ExportDirectoryReader;
use certbridge::sync::{SyncOrchestrator, SyncState};
use certbridge::truststore::{SystemTrustStore, TrustCommand, TrustStoreInstaller};
use certbridge::utils::errors::{CertSyncError, RecordError};
use chrono::{TimeZone, Utc};
use rcgen::{CertificateParams, DnType, KeyPair};
use std::fs;
use std::path::{Path, PathBuf};

struct Guest {
    _root: tempfile::TempDir,
    export_dir: PathBuf,
    anchor_dir: PathBuf,
    refresh_log: PathBuf,
    config: SyncConfig,
}

impl Guest {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let export_dir = root.path().join("export");
        fs::create_dir(&export_dir).unwrap();
        let config = SyncConfig {
            staging_dir: Some(root.path().join("staging")),
            ..SyncConfig::default()
        };
        Self {
            export_dir,
            anchor_dir: root.path().join("anchors").join("certbridge"),
            refresh_log: root.path().join("refresh.log"),
            config,
            _root: root,
        }
    }

    /// Installer whose refresh appends a line to `refresh_log`
    fn store(&self) -> SystemTrustStore {
        let script = format!("echo refreshed >> '{}'", self.refresh_log.display());
        SystemTrustStore::with_commands(
            self.anchor_dir.clone(),
            TrustCommand::new("sh", &["-c", &script]),
            TrustCommand::new("true", &[]),
        )
    }

    fn refresh_count(&self) -> usize {
        fs::read_to_string(&self.refresh_log)
            .map(|log| log.lines().count())
            .unwrap_or(0)
    }

    fn export(&self, name: &str, bytes: &[u8]) {
        fs::write(self.export_dir.join(name), bytes).unwrap();
    }
}

fn root_cert(cn: &str, not_after: (i32, u8, u8)) -> rcgen::Certificate {
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(DnType::CommonName, cn);
    params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    params.not_before = rcgen::date_time_ymd(2020, 1, 1);
    params.not_after = rcgen::date_time_ymd(not_after.0, not_after.1, not_after.2);
    let key = KeyPair::generate().unwrap();
    params.self_signed(&key).unwrap()
}

fn anchor_files(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| {
            let path = e.unwrap().path();
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            (name, fs::read(&path).unwrap())
        })
        .collect();
    files.sort();
    files
}

#[test]
fn three_valid_certificates_are_installed_with_one_refresh() {
    let guest = Guest::new();
    let certs = [
        root_cert("Alpha Root", (2045, 1, 1)),
        root_cert("Beta Root", (2045, 1, 1)),
        root_cert("Gamma Root", (2045, 1, 1)),
    ];
    guest.export("alpha.cer", certs[0].der());
    guest.export("beta.crt", certs[1].pem().as_bytes());
    guest.export("gamma.cer", certs[2].der());

    let reader = ExportDirectoryReader::new(&guest.export_dir);
    let store = guest.store();
    let mut sync = SyncOrchestrator::new(&guest.config, &reader, &store).unwrap();
    let report = sync.update().unwrap();

    assert_eq!(sync.state(), SyncState::Done);
    assert_eq!(report.installed, 3);
    assert_eq!(report.count(RecordStatus::Installed), 3);
    assert_eq!(guest.refresh_count(), 1);

    let files = anchor_files(store.anchor_dir());
    assert_eq!(files.len(), 3);
    for cert in &certs {
        let name = Thumbprint::of(cert.der()).file_name();
        let (_, content) = files.iter().find(|(n, _)| *n == name).unwrap();
        assert!(String::from_utf8_lossy(content).starts_with("-----BEGIN CERTIFICATE-----"));
    }
}

#[test]
fn expired_certificate_is_rejected_and_the_rest_installed() {
    let guest = Guest::new();
    let valid = root_cert("Current Root", (2045, 1, 1));
    guest.export("current.cer", valid.der());
    guest.export("old.cer", root_cert("Old Root", (2021, 6, 1)).der());

    let reader = ExportDirectoryReader::new(&guest.export_dir);
    let store = guest.store();
    let mut sync = SyncOrchestrator::new(&guest.config, &reader, &store)
        .unwrap()
        .with_clock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    let report = sync.update().unwrap();

    assert_eq!(report.installed, 1);
    let rejected: Vec<_> = report
        .records
        .iter()
        .filter(|r| r.status == RecordStatus::Rejected)
        .collect();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].rejection, Some(RecordError::Expired));
    assert_eq!(rejected[0].subject, "Old Root");
    assert_eq!(guest.refresh_count(), 1);
    assert_eq!(
        anchor_files(store.anchor_dir())[0].0,
        Thumbprint::of(valid.der()).file_name()
    );
}

#[test]
fn same_certificate_in_two_encodings_is_installed_once() {
    let guest = Guest::new();
    let cert = root_cert("Twin Root", (2045, 1, 1));
    guest.export("twin.cer", cert.der());
    guest.export("twin.pem", cert.pem().as_bytes());

    let reader = ExportDirectoryReader::new(&guest.export_dir);
    let store = guest.store();
    let mut sync = SyncOrchestrator::new(&guest.config, &reader, &store).unwrap();
    let report = sync.update().unwrap();

    assert_eq!(report.installed, 1);
    assert_eq!(report.count(RecordStatus::Installed), 1);
    let duplicate = report
        .records
        .iter()
        .find(|r| r.status == RecordStatus::Rejected)
        .unwrap();
    assert_eq!(duplicate.rejection, Some(RecordError::DuplicateThumbprint));
    assert_eq!(duplicate.source, guest.export_dir.join("twin.pem").display().to_string());
}

#[test]
fn pem_bundle_never_reaches_the_anchor_directory() {
    let guest = Guest::new();
    let current = root_cert("Current Root", (2045, 1, 1));
    let expired = root_cert("Expired Root", (2021, 6, 1));
    guest.export("single.cer", current.der());
    guest.export("bundle.pem", format!("{}{}", current.pem(), expired.pem()).as_bytes());

    let reader = ExportDirectoryReader::new(&guest.export_dir);
    let store = guest.store();
    let mut sync = SyncOrchestrator::new(&guest.config, &reader, &store)
        .unwrap()
        .with_clock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    let report = sync.update().unwrap();

    assert_eq!(report.installed, 1);
    let bundle = report
        .records
        .iter()
        .find(|r| r.source.ends_with("bundle.pem"))
        .unwrap();
    assert_eq!(bundle.rejection, Some(RecordError::MalformedEncoding));

    let files = anchor_files(store.anchor_dir());
    assert_eq!(files.len(), 1);
    let content = String::from_utf8_lossy(&files[0].1).into_owned();
    assert_eq!(content.matches("-----BEGIN CERTIFICATE-----").count(), 1);
    assert_eq!(files[0].0, Thumbprint::of(current.der()).file_name());
}

#[test]
fn empty_export_aborts_without_touching_the_guest() {
    let guest = Guest::new();
    fs::create_dir_all(&guest.anchor_dir).unwrap();
    fs::write(guest.anchor_dir.join("existing.crt"), "keep").unwrap();
    let before = anchor_files(&guest.anchor_dir);

    let reader = ExportDirectoryReader::new(&guest.export_dir);
    let store = guest.store();
    let mut sync = SyncOrchestrator::new(&guest.config, &reader, &store).unwrap();
    let err = sync.update().unwrap_err();

    assert!(matches!(err, CertSyncError::Extraction(_)));
    assert_eq!(sync.aborted_in(), Some(SyncState::Extracting));
    assert_eq!(guest.refresh_count(), 0);
    assert_eq!(anchor_files(&guest.anchor_dir), before);
}

#[test]
fn dry_run_leaves_the_guest_byte_identical() {
    let guest = Guest::new();
    let known = root_cert("Known Root", (2045, 1, 1));
    guest.export("known.cer", known.der());
    guest.export("fresh.cer", root_cert("Fresh Root", (2045, 1, 1)).der());

    let reader = ExportDirectoryReader::new(&guest.export_dir);
    let store = guest.store();
    SyncOrchestrator::new(&guest.config, &reader, &store)
        .unwrap()
        .update()
        .unwrap();
    fs::remove_file(guest.export_dir.join("fresh.cer")).unwrap();
    guest.export("new.cer", root_cert("New Root", (2045, 1, 1)).der());
    let before = anchor_files(&guest.anchor_dir);

    let mut sync = SyncOrchestrator::new(&guest.config, &reader, &store).unwrap();
    let entries = sync.dry_run().unwrap();

    assert_eq!(sync.state(), SyncState::DryRun);
    assert_eq!(anchor_files(&guest.anchor_dir), before);
    assert_eq!(guest.refresh_count(), 1);

    let known_entry = entries.iter().find(|e| e.record.subject == "Known Root").unwrap();
    assert!(known_entry.present);
    let new_entry = entries.iter().find(|e| e.record.subject == "New Root").unwrap();
    assert!(!new_entry.present);
}

#[test]
fn dry_run_reports_duplicates_like_update() {
    let guest = Guest::new();
    let cert = root_cert("Twin Root", (2045, 1, 1));
    guest.export("twin.cer", cert.der());
    guest.export("twin.pem", cert.pem().as_bytes());

    let reader = ExportDirectoryReader::new(&guest.export_dir);
    let store = guest.store();
    let entries = SyncOrchestrator::new(&guest.config, &reader, &store)
        .unwrap()
        .dry_run()
        .unwrap();

    let importable: Vec<_> = entries
        .iter()
        .filter(|e| e.record.status == RecordStatus::Validated)
        .collect();
    assert_eq!(importable.len(), 1);
    let duplicate = entries
        .iter()
        .find(|e| e.record.source.ends_with("twin.pem"))
        .unwrap();
    assert_eq!(duplicate.record.rejection, Some(RecordError::DuplicateThumbprint));

    let report = SyncOrchestrator::new(&guest.config, &reader, &store)
        .unwrap()
        .update()
        .unwrap();
    assert_eq!(report.installed, importable.len());
}

#[test]
fn rerun_overwrites_the_same_anchor_file() {
    let guest = Guest::new();
    guest.export("a.cer", root_cert("Stable Root", (2045, 1, 1)).der());

    let reader = ExportDirectoryReader::new(&guest.export_dir);
    let store = guest.store();
    for _ in 0..2 {
        SyncOrchestrator::new(&guest.config, &reader, &store)
            .unwrap()
            .update()
            .unwrap();
    }

    assert_eq!(anchor_files(&guest.anchor_dir).len(), 1);
    assert_eq!(guest.refresh_count(), 2);
}

#[test]
fn reset_removes_only_imported_anchors() {
    let guest = Guest::new();
    guest.export("a.cer", root_cert("Imported Root", (2045, 1, 1)).der());
    let distro_anchor = guest.anchor_dir.parent().unwrap().join("distro.crt");

    let reader = ExportDirectoryReader::new(&guest.export_dir);
    let store = guest.store();
    let mut sync = SyncOrchestrator::new(&guest.config, &reader, &store).unwrap();
    sync.update().unwrap();
    fs::write(&distro_anchor, "distro").unwrap();

    sync.reset().unwrap();

    assert_eq!(sync.state(), SyncState::Done);
    assert!(!guest.anchor_dir.exists());
    assert!(distro_anchor.exists());
    assert_eq!(guest.refresh_count(), 2);
}
