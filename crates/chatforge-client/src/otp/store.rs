use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{Duration, Utc};

use crate::domain::types::{OtpPurpose, OtpRecord};

/// Process-wide store of pending one-time codes keyed by `(recipient, purpose)`.
///
/// At most one live record exists per pair: a new `put` overwrites any prior
/// unconsumed record. Instantiated once and shared by `Arc` between the
/// account workflows and resend paths.
#[derive(Debug, Default)]
pub struct OtpStore {
    records: Mutex<HashMap<(String, OtpPurpose), OtpRecord>>,
}

impl OtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or overwrite the record for the pair. `expires_at = now + ttl`.
    pub fn put(&self, recipient: &str, purpose: OtpPurpose, code: &str, ttl: Duration) {
        let now = Utc::now();
        let record = OtpRecord {
            recipient: recipient.to_owned(),
            purpose,
            code: code.to_owned(),
            issued_at: now,
            expires_at: now + ttl,
        };
        self.records
            .lock()
            .unwrap()
            .insert((recipient.to_owned(), purpose), record);
    }

    /// Consume the record if it exists, is unexpired, and `code` matches
    /// exactly. An expired record is deleted as a side effect of the failed
    /// take (lazy cleanup); a wrong code leaves the record in place.
    pub fn take(&self, recipient: &str, purpose: OtpPurpose, code: &str) -> bool {
        let mut records = self.records.lock().unwrap();
        let key = (recipient.to_owned(), purpose);

        let Some(record) = records.get(&key) else {
            return false;
        };
        if record.is_expired() {
            records.remove(&key);
            return false;
        }
        if record.code != code {
            return false;
        }
        records.remove(&key);
        true
    }

    /// Unconditionally delete the record for the pair. Idempotent.
    pub fn clear(&self, recipient: &str, purpose: OtpPurpose) {
        self.records
            .lock()
            .unwrap()
            .remove(&(recipient.to_owned(), purpose));
    }
}
