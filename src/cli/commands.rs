use crate::cert::{CertificateRecord, RecordStatus};
use crate::cli::args::Cli;
use crate::config::SyncConfig;
use crate::connectivity::{normalize_domain, ConnectivityTester};
use crate::host::PowerShellStoreReader;
use crate::sync::{DryRunEntry, SyncOrchestrator, SyncReport};
use crate::truststore::{resolve_trust_bundle, SystemTrustStore, TrustStoreInstaller};
use crate::utils::errors::Result;
use crate::utils::output::{build_table_data, OutputFormat, TableRow};
use std::io;

const RECORD_HEADER: &[&str] = &["SUBJECT", "THUMBPRINT", "EXPIRES", "SOURCE", "STATUS"];
const DRY_RUN_HEADER: &[&str] = &[
    "SOURCE",
    "ENCODING",
    "SUBJECT",
    "ISSUER",
    "EXPIRES",
    "THUMBPRINT",
    "VERDICT",
    "GUEST",
];

impl TableRow for CertificateRecord {
    fn cells(&self) -> Vec<String> {
        vec![
            self.subject.clone(),
            self.thumbprint.short().to_string(),
            self.not_after_label(),
            self.source.clone(),
            self.status_label(),
        ]
    }
}

impl TableRow for DryRunEntry {
    fn cells(&self) -> Vec<String> {
        let thumbprint = self
            .thumbprint
            .as_ref()
            .map(|t| t.short().to_string())
            .unwrap_or_else(|| "-".to_string());
        let guest = match (&self.thumbprint, self.present) {
            (None, _) => "-",
            (Some(_), true) => "present",
            (Some(_), false) => "new",
        };
        vec![
            self.record.source.clone(),
            self.detected.to_string(),
            self.record.subject.clone(),
            self.record.issuer.clone(),
            self.record.not_after_label(),
            thumbprint,
            self.record.status_label(),
            guest.to_string(),
        ]
    }
}

pub async fn handle_command(cli: Cli) -> Result<()> {
    // Initialize logging - always to stderr
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(cli.log_filter())
        .init();

    let output = OutputFormat::detect();
    let config = SyncConfig::load(cli.config.as_deref())?;

    // Reject a bad domain before any other action touches the system
    let domain = cli.test.as_deref().map(normalize_domain).transpose()?;

    if cli.reset || cli.update || cli.dry_run {
        let installer = SystemTrustStore::from_config(&config.trust_store)?;
        let reader = PowerShellStoreReader::new(&config.host, cli.verbose || cli.debug);
        let mut sync = SyncOrchestrator::new(&config, &reader, &installer)?;

        if cli.reset {
            sync.reset()?;
            println!(
                "Trust store reset: removed {} and restored distribution defaults",
                installer.anchor_dir().display()
            );
        }
        if cli.update {
            let report = sync.update()?;
            print_update_report(&report, &output);
        }
        if cli.dry_run {
            let entries = sync.dry_run()?;
            print_dry_run(&entries, &output);
        }
    }

    if let Some(domain) = domain {
        let bundle = resolve_trust_bundle(&config.trust_store)?;
        let tester = ConnectivityTester::new(
            &bundle,
            config.test.timeout(),
            cli.verbosity(),
        );
        tester.run(&domain).await?;
    }

    Ok(())
}

fn print_update_report(report: &SyncReport, output: &OutputFormat) {
    output.print_table(&build_table_data(RECORD_HEADER, &report.records));
    println!();
    output.print_key_value(&[
        ("Extracted", report.records.len().to_string()),
        ("Installed", report.installed.to_string()),
        ("Rejected", report.count(RecordStatus::Rejected).to_string()),
        (
            "Trust store refreshed",
            if report.refreshed { "yes" } else { "no" }.to_string(),
        ),
    ]);
}

fn print_dry_run(entries: &[DryRunEntry], output: &OutputFormat) {
    output.print_table(&build_table_data(DRY_RUN_HEADER, entries));

    let importable = entries
        .iter()
        .filter(|e| e.record.status == RecordStatus::Validated)
        .count();
    let new = entries
        .iter()
        .filter(|e| e.record.status == RecordStatus::Validated && !e.present)
        .count();
    println!();
    println!("Dry run: {importable} of {} certificates would be imported ({new} new); nothing was changed", entries.len());
}
