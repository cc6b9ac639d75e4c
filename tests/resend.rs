//! Validation, transport failures and the resend budget.

mod common;

use std::sync::Arc;

use as2::message::{attr, PA_AS2_RECEIPT_OPTION, PA_ENCRYPT, PA_SIGN, PID_EMAIL};
use as2::{As2Error, FilePendingStore, MimeBody, SendOutcome};
use common::*;
use proptest::prelude::*;

async fn pending_store() -> (tempfile::TempDir, Arc<FilePendingStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = FilePendingStore::open(dir.path().join("info"), dir.path().join("payload"))
        .await
        .unwrap();
    (dir, Arc::new(store))
}

#[tokio::test]
async fn test_rejected_status_exhausts_budget() {
    init_tracing();
    let (_dir, pending) = pending_store().await;
    let partner = spawn_partner(PartnerReply::Status(503)).await;

    for retries in [0u32, 1, 3] {
        let before = partner.attempts();
        let mut msg = invoice(alpha_beta(&partner.url));

        let outcome = sender(pending.clone(), retries).send(&mut msg).await.unwrap();

        assert_eq!(outcome, SendOutcome::Abandoned { attempts: retries + 1 });
        assert_eq!(partner.attempts() - before, retries as usize + 1);
        let expected_resends = (retries > 0).then(|| retries.to_string());
        assert_eq!(
            msg.attribute(attr::RESEND_COUNT).map(str::to_string),
            expected_resends
        );
    }
}

#[tokio::test]
async fn test_redirect_is_not_followed() {
    let (_dir, pending) = pending_store().await;
    let partner = spawn_partner(PartnerReply::Redirect).await;

    for retries in [0u32, 2] {
        let before = partner.attempts();
        let mut msg = invoice(alpha_beta(&partner.url));

        let outcome = sender(pending.clone(), retries).send(&mut msg).await.unwrap();

        assert_eq!(outcome, SendOutcome::Abandoned { attempts: retries + 1 });
        assert_eq!(partner.attempts() - before, retries as usize + 1);
    }
}

#[tokio::test]
async fn test_async_redirect_is_not_awaiting_receipt() {
    let (_dir, pending) = pending_store().await;
    let partner = spawn_partner(PartnerReply::Redirect).await;
    let partnership = alpha_beta(&partner.url)
        .with_attribute(PA_AS2_RECEIPT_OPTION, "http://alpha.example/mdn");
    let mut msg = invoice(partnership);

    let outcome = sender(pending, 0).send(&mut msg).await.unwrap();

    assert_eq!(outcome, SendOutcome::Abandoned { attempts: 1 });
}

#[tokio::test]
async fn test_unbuildable_request_is_not_resent() {
    let (_dir, pending) = pending_store().await;
    let partner = spawn_partner(PartnerReply::Status(200)).await;

    let mut bad_subject = invoice(alpha_beta(&partner.url));
    bad_subject.set_subject("Invoice\n42");
    let err = sender(pending.clone(), 3).send(&mut bad_subject).await.unwrap_err();
    assert!(matches!(err, As2Error::InvalidRequest(_)), "{err:?}");
    assert!(bad_subject.attribute(attr::RESEND_COUNT).is_none());

    let ftp_url = partner.url.replacen("http://", "ftp://", 1);
    let mut bad_scheme = invoice(alpha_beta(&ftp_url));
    let err = sender(pending, 3).send(&mut bad_scheme).await.unwrap_err();
    assert!(matches!(err, As2Error::InvalidRequest(_)), "{err:?}");

    assert_eq!(partner.attempts(), 0);
}

#[tokio::test]
async fn test_unreachable_partner_is_abandoned() {
    let (_dir, pending) = pending_store().await;
    let mut msg = invoice(alpha_beta(&closed_url().await));

    let outcome = sender(pending, 2).send(&mut msg).await.unwrap();

    assert_eq!(outcome, SendOutcome::Abandoned { attempts: 3 });
}

#[tokio::test]
async fn test_every_success_status_is_accepted() {
    let (_dir, pending) = pending_store().await;
    for status in [200u16, 201, 202, 204, 206] {
        let partner = spawn_partner(PartnerReply::Status(status)).await;
        let mut msg = invoice(alpha_beta(&partner.url));

        let outcome = sender(pending.clone(), 2).send(&mut msg).await.unwrap();

        assert!(outcome.is_delivered(), "status {status}");
        assert_eq!(partner.attempts(), 1);
    }
}

#[tokio::test]
async fn test_missing_field_fails_before_network() {
    let (_dir, pending) = pending_store().await;
    let partner = spawn_partner(PartnerReply::Status(200)).await;

    let mut no_email = invoice(alpha_beta(&partner.url));
    no_email.partnership_mut().set_sender_id(PID_EMAIL, "");
    let err = sender(pending.clone(), 3).send(&mut no_email).await.unwrap_err();
    assert!(matches!(err, As2Error::Validation { ref field } if field == "Sender: email"));

    let mut empty = invoice(alpha_beta(&partner.url));
    empty.set_data(MimeBody::new("application/edi-x12", ""));
    let err = sender(pending, 3).send(&mut empty).await.unwrap_err();
    assert!(matches!(err, As2Error::Validation { ref field } if field == "Message Data"));

    assert_eq!(partner.attempts(), 0);
}

#[tokio::test]
async fn test_missing_certificate_is_not_resent() {
    let (_dir, pending) = pending_store().await;
    let partner = spawn_partner(PartnerReply::Status(200)).await;

    let mut partnership = alpha_beta(&partner.url).with_attribute(PA_SIGN, "sha1");
    partnership.set_sender_id(as2::PID_X509_ALIAS, "unknown-cert");
    let mut msg = invoice(partnership);

    let err = sender(pending, 3).send(&mut msg).await.unwrap_err();
    assert!(matches!(err, As2Error::Certificate(_)));
    assert_eq!(partner.attempts(), 0);
}

#[tokio::test]
async fn test_secure_history_counts() {
    let (_dir, pending) = pending_store().await;
    let sender = sender(pending, 0);

    let mut both = invoice(
        alpha_beta("http://beta.invalid/as2")
            .with_attribute(PA_SIGN, "sha256")
            .with_attribute(PA_ENCRYPT, "3des"),
    );
    let secured = sender.secure(&mut both).unwrap();
    let types: Vec<_> = both.history().iter().map(|h| h.content_type.as_str()).collect();
    assert_eq!(types, vec!["application/edi-x12", SIGNED_TYPE, ENCRYPTED_TYPE]);
    assert_eq!(both.content_type(), Some(ENCRYPTED_TYPE));
    assert_eq!(secured.content_type(), Some(ENCRYPTED_TYPE));

    let mut encrypt_only =
        invoice(alpha_beta("http://beta.invalid/as2").with_attribute(PA_ENCRYPT, "3des"));
    sender.secure(&mut encrypt_only).unwrap();
    assert_eq!(encrypt_only.history().len(), 2);

    let mut plain = invoice(alpha_beta("http://beta.invalid/as2"));
    let secured = sender.secure(&mut plain).unwrap();
    assert_eq!(plain.history().len(), 1);
    assert_eq!(&secured.content[..], b"ISA*00*          *00*~");
}

proptest! {
    #[test]
    fn test_mic_whitespace_insensitive(
        digest in "[A-Za-z0-9+/]{27}=",
        pad_a in "[ \t]{0,4}",
        pad_b in "[ \t]{0,4}",
    ) {
        let spaced = format!("{pad_a}{digest},{pad_b} sha-256{pad_a}");
        let expected = format!("{digest}, sha-256");
        prop_assert!(as2::mic_matches(&expected, &spaced));
    }
}
