pub mod issuer;
pub mod store;

use crate::domain::types::OtpPurpose;
use store::OtpStore;

/// Check a submitted code against the store, enforcing expiry and single use.
///
/// Pure and synchronous; call this before any backend mutation the purpose
/// guards so a round trip is only attempted once the code is locally valid.
pub fn verify(store: &OtpStore, recipient: &str, purpose: OtpPurpose, code: &str) -> bool {
    store.take(recipient, purpose, code)
}
