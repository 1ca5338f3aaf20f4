//! In-memory set of identity keys already processed.
//!
//! The sheet is the durable record; this is a rebuildable cache seeded from
//! existing rows at startup. Mutated only by the watch loop — read paths take
//! a snapshot and tolerate eventual consistency.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::submission::{COL_EMAIL, COL_FIRST_NAME, COL_LAST_NAME, identity_key};

#[derive(Debug, Default)]
pub struct DedupLedger {
    keys: Mutex<HashSet<String>>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the ledger from every existing row, skipping the header. Rows need
    /// a non-empty email and first name to contribute a key. Additive and
    /// idempotent — seeding twice from the same rows changes nothing.
    ///
    /// Returns the resulting ledger size.
    pub fn seed(&self, rows: &[Vec<String>]) -> usize {
        let mut keys = self.keys.lock().expect("ledger lock poisoned");
        for row in rows.iter().skip(1) {
            let email = row.get(COL_EMAIL).map(|c| c.trim()).unwrap_or("");
            let first = row.get(COL_FIRST_NAME).map(|c| c.trim()).unwrap_or("");
            let last = row.get(COL_LAST_NAME).map(|c| c.trim()).unwrap_or("");
            if !email.is_empty() && !first.is_empty() {
                keys.insert(identity_key(email, first, last));
            }
        }
        keys.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.lock().expect("ledger lock poisoned").contains(key)
    }

    /// Record a key once a processing decision (sent, failed, or duplicate)
    /// has been made for that identity.
    pub fn record(&self, key: String) {
        self.keys.lock().expect("ledger lock poisoned").insert(key);
    }

    pub fn len(&self) -> usize {
        self.keys.lock().expect("ledger lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted copy of all keys, for the read endpoints.
    pub fn snapshot(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .keys
            .lock()
            .expect("ledger lock poisoned")
            .iter()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> Vec<Vec<String>> {
        let rows = [
            vec!["Timestamp", "Email", "First Name", "Last Name"],
            vec!["t1", "a@x.com", "Jo", "Li"],
            vec!["t2", "b@x.com", "Amy", "Wu"],
            vec!["t3", "", "NoEmail", "Nobody"],
            vec!["t4", "c@x.com", "", "NoFirst"],
        ];
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn seed_skips_header_and_incomplete_rows() {
        let ledger = DedupLedger::new();
        assert_eq!(ledger.seed(&sheet()), 2);
        assert!(ledger.contains("a@x.com:jo:li"));
        assert!(ledger.contains("b@x.com:amy:wu"));
    }

    #[test]
    fn seed_twice_is_idempotent() {
        let ledger = DedupLedger::new();
        let rows = sheet();
        let first = ledger.seed(&rows);
        let second = ledger.seed(&rows);
        assert_eq!(first, second);
        assert_eq!(ledger.snapshot().len(), first);
    }

    #[test]
    fn seed_normalizes_case_and_whitespace() {
        let ledger = DedupLedger::new();
        let rows: Vec<Vec<String>> = [
            vec!["header"],
            vec!["t", " A@X.COM ", "JO", " li "],
        ]
        .iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();
        ledger.seed(&rows);
        assert!(ledger.contains("a@x.com:jo:li"));
    }

    #[test]
    fn record_and_contains() {
        let ledger = DedupLedger::new();
        assert!(ledger.is_empty());
        assert!(!ledger.contains("k"));
        ledger.record("k".to_string());
        assert!(ledger.contains("k"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn snapshot_is_sorted() {
        let ledger = DedupLedger::new();
        ledger.record("b".to_string());
        ledger.record("a".to_string());
        assert_eq!(ledger.snapshot(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn rows_missing_last_name_cell_still_seed() {
        let ledger = DedupLedger::new();
        let rows: Vec<Vec<String>> = [vec!["header"], vec!["t", "a@x.com", "Jo"]]
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        assert_eq!(ledger.seed(&rows), 1);
        assert!(ledger.contains("a@x.com:jo:"));
    }
}
