#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use csl_cert::audit::LifecycleKind;
use csl_cert::{
    CachingStore, CertError, CertificateEngine, CertificateStatus, EngineConfig, MemoryAuditLog,
    MemoryDirectory, MemoryStore, Pepper, VerificationReason,
};
use std::sync::Arc;

struct Fixture {
    engine: CertificateEngine,
    store: Arc<CachingStore<MemoryStore>>,
    audit: Arc<MemoryAuditLog>,
}

async fn fixture() -> Fixture {
    let directory = MemoryDirectory::new();
    directory.add_course("course-cs", "cs").await.unwrap();
    directory.add_admin("admin-1", "registrar").await;
    directory.add_student("stu-1", "CSL-00001").await;
    directory.add_student("stu-2", "CSL-00002").await;

    let store = Arc::new(CachingStore::new(MemoryStore::new(), 16));
    let audit = Arc::new(MemoryAuditLog::new());
    let engine = CertificateEngine::new(
        &EngineConfig::new(Pepper::new("verification-pepper").unwrap()),
        store.clone(),
        Arc::new(directory),
        audit.clone(),
    );
    Fixture {
        engine,
        store,
        audit,
    }
}

async fn issue(fx: &Fixture, student: &str) -> String {
    fx.engine
        .lifecycle
        .issue_at(
            student,
            "course-cs",
            "admin-1",
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        )
        .await
        .unwrap()
        .identifier
}

fn flip_digest_char(identifier: &str) -> String {
    let mut chars: Vec<char> = identifier.chars().collect();
    chars[13] = if chars[13] == 'F' { 'E' } else { 'F' };
    chars.into_iter().collect()
}

#[tokio::test]
async fn freshly_issued_certificate_verifies() {
    let fx = fixture().await;
    let id = issue(&fx, "stu-1").await;

    let outcome = fx.engine.verifier.verify(&id).await.unwrap();
    assert!(outcome.valid);
    assert_eq!(outcome.reason, VerificationReason::Authentic);
    assert_eq!(outcome.certificate.unwrap().student_ref, "stu-1");
}

#[tokio::test]
async fn revoked_certificate_reports_status_and_details() {
    let fx = fixture().await;
    let id = issue(&fx, "stu-1").await;
    // warm the cache so the revocation has to evict the entry
    fx.engine.verifier.verify(&id).await.unwrap();

    fx.engine
        .lifecycle
        .revoke(&id, "admin-1", Some("issued in error"))
        .await
        .unwrap();

    let outcome = fx.engine.verifier.verify(&id).await.unwrap();
    assert!(!outcome.valid);
    assert_eq!(outcome.reason.to_string(), "certificate is revoked");
    let cert = outcome.certificate.unwrap();
    assert_eq!(cert.status, CertificateStatus::Revoked);
    let revocation = cert.revocation.unwrap();
    assert_eq!(revocation.reason, "issued in error");
    assert_eq!(revocation.revoked_by, "registrar");
}

#[tokio::test]
async fn revoking_twice_is_already_revoked() {
    let fx = fixture().await;
    let id = issue(&fx, "stu-1").await;
    fx.engine.lifecycle.revoke(&id, "admin-1", None).await.unwrap();

    let err = fx.engine.lifecycle.revoke(&id, "admin-1", None).await.unwrap_err();
    assert_eq!(err, CertError::AlreadyRevoked(id));
}

#[tokio::test]
async fn one_changed_digest_character_fails_authenticity() {
    let fx = fixture().await;
    let id = issue(&fx, "stu-1").await;
    let forged = flip_digest_char(&id);
    assert_ne!(forged, id);

    let outcome = fx.engine.verifier.verify(&forged).await.unwrap();
    assert!(!outcome.valid);
    assert_eq!(outcome.reason.to_string(), "authenticity could not be verified");
    assert!(outcome.certificate.is_none());
}

#[tokio::test]
async fn digest_from_another_student_does_not_transfer() {
    let fx = fixture().await;
    let first = issue(&fx, "stu-1").await;
    let second = issue(&fx, "stu-2").await;

    // base of the first, digest of the second
    let spliced = format!("{}{}", &first[..13], &second[13..]);
    let outcome = fx.engine.verifier.verify(&spliced).await.unwrap();
    assert_eq!(outcome.reason, VerificationReason::AuthenticityUnverified);
}

#[tokio::test]
async fn lowercase_digest_is_a_format_error() {
    let fx = fixture().await;
    let id = issue(&fx, "stu-1").await;

    let outcome = fx.engine.verifier.verify(&id.to_lowercase()).await.unwrap();
    assert_eq!(outcome.reason, VerificationReason::InvalidFormat);
}

#[tokio::test]
async fn suspended_certificate_cannot_be_revoked_or_verified() {
    let fx = fixture().await;
    let id = issue(&fx, "stu-1").await;
    fx.engine
        .lifecycle
        .suspend(&id, "admin-1", "under review")
        .await
        .unwrap();

    let outcome = fx.engine.verifier.verify(&id).await.unwrap();
    assert_eq!(
        outcome.reason,
        VerificationReason::NotActive(CertificateStatus::Suspended)
    );

    let err = fx.engine.lifecycle.revoke(&id, "admin-1", None).await.unwrap_err();
    assert!(matches!(
        err,
        CertError::InvalidTransition {
            from: CertificateStatus::Suspended,
            to: CertificateStatus::Revoked,
            ..
        }
    ));
}

#[tokio::test]
async fn audit_trail_records_transitions_and_attempts() {
    let fx = fixture().await;
    let id = issue(&fx, "stu-1").await;
    fx.engine.verifier.verify(&id).await.unwrap();
    fx.engine.lifecycle.revoke(&id, "admin-1", None).await.unwrap();
    fx.engine.verifier.verify(&id).await.unwrap();

    let transitions = fx.audit.transitions().await;
    let kinds: Vec<LifecycleKind> = transitions.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            LifecycleKind::CertificateIssued,
            LifecycleKind::CertificateRevoked
        ]
    );
    let revoked = &transitions[1];
    assert_eq!(revoked.before.as_ref().unwrap().status, CertificateStatus::Active);
    assert_eq!(revoked.after.status, CertificateStatus::Revoked);

    let attempts = fx.audit.verifications().await;
    assert_eq!(attempts.len(), 2);
    assert!(attempts[0].valid);
    assert!(!attempts[1].valid);
}

#[tokio::test]
async fn cached_lookups_serve_repeat_verifications() {
    let fx = fixture().await;
    let id = issue(&fx, "stu-1").await;
    for _ in 0..4 {
        assert!(fx.engine.verifier.verify(&id).await.unwrap().valid);
    }
    assert!(fx.store.hit_rate() > 0.0);
}
