use std::sync::Arc;

use dashmap::{DashMap, DashSet};

use crate::types::{AlertIdentity, AlertRecord, AlertStatus};

/// Process-wide alert tracking, shared by the dispatcher, the callback poller
/// and the status API. Records live for the process lifetime.
pub struct AlertStore {
    records: DashMap<AlertIdentity, AlertRecord>,
    /// Identities with a dispatch underway but no record yet.
    in_flight: DashSet<AlertIdentity>,
}

impl AlertStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: DashMap::new(),
            in_flight: DashSet::new(),
        })
    }

    /// True iff nothing was ever sent (or is being sent) for this identity.
    pub fn should_alert(&self, identity: &AlertIdentity) -> bool {
        !self.records.contains_key(identity) && !self.in_flight.contains(identity)
    }

    /// Claim the identity for one dispatch. Every successful reservation must be
    /// followed by `insert` or `release`.
    pub fn try_reserve(&self, identity: &AlertIdentity) -> bool {
        if !self.in_flight.insert(identity.clone()) {
            return false;
        }
        // insert() stores the record before dropping the reservation, so a
        // record existing here means another dispatch already finished.
        if self.records.contains_key(identity) {
            self.in_flight.remove(identity);
            return false;
        }
        true
    }

    pub fn release(&self, identity: &AlertIdentity) {
        self.in_flight.remove(identity);
    }

    pub fn insert(&self, record: AlertRecord) {
        let identity = record.identity.clone();
        self.records.insert(identity.clone(), record);
        self.in_flight.remove(&identity);
    }

    pub fn get(&self, identity: &AlertIdentity) -> Option<AlertRecord> {
        self.records.get(identity).map(|r| r.value().clone())
    }

    /// Set the status and return the updated record, `None` when unknown.
    pub fn set_status(&self, identity: &AlertIdentity, status: AlertStatus) -> Option<AlertRecord> {
        let mut entry = self.records.get_mut(identity)?;
        entry.status = Some(status);
        Some(entry.value().clone())
    }

    /// All records, oldest first.
    pub fn all(&self) -> Vec<AlertRecord> {
        let mut records: Vec<AlertRecord> =
            self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by_key(|r| r.created_at_ns);
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
