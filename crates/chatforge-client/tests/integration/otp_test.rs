use std::sync::Arc;

use chrono::Duration;

use chatforge_client::domain::types::{OtpPurpose, otp_ttl};
use chatforge_client::otp::issuer::OtpIssuer;
use chatforge_client::otp::store::OtpStore;
use chatforge_client::otp::verify;

use crate::helpers::{MockMailer, last_code};

const ALICE: &str = "alice@example.com";

#[tokio::test]
async fn should_round_trip_issue_and_verify_for_every_purpose() {
    for purpose in [OtpPurpose::Verify, OtpPurpose::Reset] {
        let store = Arc::new(OtpStore::new());
        let mailer = MockMailer::default();
        let sent = mailer.sent_handle();
        let issuer = OtpIssuer {
            store: Arc::clone(&store),
            mailer,
        };

        issuer.issue(ALICE, purpose).await.unwrap();
        let code = last_code(&sent, ALICE, purpose);

        assert_eq!(code.len(), 6);
        assert!(verify(&store, ALICE, purpose, &code));
    }
}

#[tokio::test]
async fn should_verify_at_most_once_per_issued_code() {
    let store = OtpStore::new();
    store.put(ALICE, OtpPurpose::Reset, "482913", otp_ttl());

    assert!(verify(&store, ALICE, OtpPurpose::Reset, "482913"));
    assert!(!verify(&store, ALICE, OtpPurpose::Reset, "482913"));
}

#[tokio::test]
async fn should_invalidate_prior_code_when_new_one_is_issued() {
    let store = Arc::new(OtpStore::new());
    let mailer = MockMailer::default();
    let sent = mailer.sent_handle();
    let issuer = OtpIssuer {
        store: Arc::clone(&store),
        mailer,
    };

    issuer.issue(ALICE, OtpPurpose::Verify).await.unwrap();
    let first = last_code(&sent, ALICE, OtpPurpose::Verify);

    issuer.issue(ALICE, OtpPurpose::Verify).await.unwrap();
    let second = last_code(&sent, ALICE, OtpPurpose::Verify);

    assert!(!verify(&store, ALICE, OtpPurpose::Verify, &first));
    assert!(verify(&store, ALICE, OtpPurpose::Verify, &second));
}

#[tokio::test]
async fn should_keep_stored_code_valid_when_delivery_fails() {
    let store = Arc::new(OtpStore::new());
    let mailer = MockMailer::failing();
    let sent = mailer.sent_handle();
    let issuer = OtpIssuer {
        store: Arc::clone(&store),
        mailer,
    };

    // The store write precedes the delivery call, so the code survives a
    // failed send.
    issuer.issue(ALICE, OtpPurpose::Verify).await.unwrap_err();
    let code = last_code(&sent, ALICE, OtpPurpose::Verify);
    assert!(verify(&store, ALICE, OtpPurpose::Verify, &code));
}

#[tokio::test]
async fn should_reject_expired_code_and_leave_no_residue() {
    let store = OtpStore::new();
    store.put(ALICE, OtpPurpose::Reset, "482913", Duration::seconds(-1));

    assert!(!verify(&store, ALICE, OtpPurpose::Reset, "482913"));

    // The pair starts clean for the next issuance.
    store.put(ALICE, OtpPurpose::Reset, "555555", otp_ttl());
    assert!(verify(&store, ALICE, OtpPurpose::Reset, "555555"));
}

#[tokio::test]
async fn should_scope_codes_to_their_purpose() {
    let store = OtpStore::new();
    store.put(ALICE, OtpPurpose::Verify, "123456", otp_ttl());

    assert!(!verify(&store, ALICE, OtpPurpose::Reset, "123456"));
    assert!(verify(&store, ALICE, OtpPurpose::Verify, "123456"));
}
