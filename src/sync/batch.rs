use crate::cert::{CertificateRecord, RecordStatus, Thumbprint};
use crate::utils::errors::RecordError;
use ordermap::map::Entry;
use ordermap::{OrderMap, OrderSet};

/// Ordered records of one run
#[derive(Debug, Clone, Default)]
pub struct SyncBatch {
    records: Vec<CertificateRecord>,
}

impl SyncBatch {
    pub fn new(records: Vec<CertificateRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[CertificateRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CertificateRecord> {
        self.records
    }

    /// Select validated records for staging, keyed by thumbprint in batch
    /// order. The first record with a thumbprint wins; later ones are
    /// rejected as duplicates.
    pub fn select_for_staging(&mut self) -> OrderMap<Thumbprint, usize> {
        let mut staged = OrderMap::new();

        for (index, record) in self.records.iter_mut().enumerate() {
            if record.status != RecordStatus::Validated {
                continue;
            }
            match staged.entry(record.thumbprint.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(index);
                }
                Entry::Occupied(_) => record.mark_rejected(RecordError::DuplicateThumbprint),
            }
        }

        staged
    }

    /// Mark validated records whose thumbprint landed in the trust store
    pub fn mark_installed(&mut self, installed: &[Thumbprint]) {
        let installed: OrderSet<&Thumbprint> = installed.iter().collect();
        for record in &mut self.records {
            if record.status == RecordStatus::Validated && installed.contains(&record.thumbprint) {
                record.status = RecordStatus::Installed;
            }
        }
    }

    pub fn count(&self, status: RecordStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }
}
