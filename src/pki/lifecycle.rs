use super::certificate::{Certificate, CertificateStatus, IssueRequest};
use crate::audit::{AuditSink, LifecycleEvent, LifecycleKind};
use crate::config::EngineConfig;
use crate::crypto::{Pepper, compute_digest};
use crate::directory::Directory;
use crate::error::{CertError, Result};
use crate::identifier::{format_base, format_full, normalize_course_code, parse, validate_format};
use crate::store::{CertificateStore, bounded};
use chrono::{DateTime, Datelike, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Issues certificates and moves them through `Active -> Revoked` and
/// `Active -> Suspended`. `Expired` is set by whoever owns expiry policy,
/// never here.
pub struct CertificateLifecycle {
    store: Arc<dyn CertificateStore>,
    directory: Arc<dyn Directory>,
    audit: Arc<dyn AuditSink>,
    pepper: Pepper,
    store_timeout: Duration,
}

impl CertificateLifecycle {
    pub fn new(
        config: &EngineConfig,
        store: Arc<dyn CertificateStore>,
        directory: Arc<dyn Directory>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            directory,
            audit,
            pepper: config.pepper.clone(),
            store_timeout: config.store_timeout(),
        }
    }

    pub async fn issue(
        &self,
        student_ref: &str,
        course_ref: &str,
        issuer_ref: &str,
    ) -> Result<Certificate> {
        self.issue_at(student_ref, course_ref, issuer_ref, Utc::now())
            .await
    }

    /// Issues with an explicit timestamp; its year selects the sequence
    /// space.
    pub async fn issue_at(
        &self,
        student_ref: &str,
        course_ref: &str,
        issuer_ref: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<Certificate> {
        let limit = self.store_timeout;
        let identity = bounded(limit, self.directory.student_identity(student_ref)).await?;
        let course_code =
            normalize_course_code(&bounded(limit, self.directory.course_code(course_ref)).await?)?;
        let issuer = bounded(limit, self.directory.admin(issuer_ref)).await?;

        if let Some(existing) =
            bounded(limit, self.store.find_active(student_ref, course_ref)).await?
        {
            debug!(
                "refusing duplicate issuance for student {} course {}: {} is active",
                student_ref, course_ref, existing.identifier
            );
            return Err(CertError::DuplicateCertificate {
                student_ref: student_ref.to_string(),
                course_ref: course_ref.to_string(),
                existing: existing.identifier,
            });
        }

        let request = IssueRequest {
            student_ref: student_ref.to_string(),
            course_ref: course_ref.to_string(),
            issuer_ref: issuer,
            year: issued_at.year(),
            course_code,
            issued_at,
        };
        let pepper = &self.pepper;
        let mint = |sequence: u32| -> Result<Certificate> {
            let base = format_base(request.year, &request.course_code, sequence)?;
            let digest = compute_digest(&identity, &base, pepper);
            let identifier = format_full(&base, &digest)?;
            let parsed =
                parse(&identifier).ok_or_else(|| CertError::InvalidFormat(identifier.clone()))?;
            Ok(Certificate::new_active(&request, parsed))
        };

        let cert = bounded(limit, self.store.insert_next(&request, &mint)).await?;
        info!(
            "issued certificate {} to student {} by {}",
            cert.identifier, cert.student_ref, cert.issuer_ref
        );
        self.emit(LifecycleEvent::issued(&cert)).await;
        Ok(cert)
    }

    pub async fn revoke(
        &self,
        identifier: &str,
        revoked_by: &str,
        reason: Option<&str>,
    ) -> Result<Certificate> {
        if !validate_format(identifier) {
            return Err(CertError::InvalidFormat(identifier.to_string()));
        }
        let actor = bounded(self.store_timeout, self.directory.admin(revoked_by)).await?;
        let at = Utc::now();

        let apply = |cert: &Certificate| -> Result<Certificate> {
            match cert.status {
                CertificateStatus::Active => Ok(cert.revoked(&actor, reason, at)),
                CertificateStatus::Revoked => {
                    Err(CertError::AlreadyRevoked(cert.identifier.clone()))
                }
                from => Err(CertError::InvalidTransition {
                    identifier: cert.identifier.clone(),
                    from,
                    to: CertificateStatus::Revoked,
                }),
            }
        };
        let (before, after) =
            bounded(self.store_timeout, self.store.transition(identifier, &apply)).await?;

        info!("revoked certificate {} by {}", identifier, actor);
        self.emit(LifecycleEvent::changed(
            LifecycleKind::CertificateRevoked,
            &actor,
            before,
            after.clone(),
            at,
        ))
        .await;
        Ok(after)
    }

    /// Takes an active certificate out of circulation without revoking it.
    /// There is no way back to `Active`.
    pub async fn suspend(
        &self,
        identifier: &str,
        suspended_by: &str,
        reason: &str,
    ) -> Result<Certificate> {
        if !validate_format(identifier) {
            return Err(CertError::InvalidFormat(identifier.to_string()));
        }
        let actor = bounded(self.store_timeout, self.directory.admin(suspended_by)).await?;

        let apply = |cert: &Certificate| -> Result<Certificate> {
            if cert.is_active() {
                Ok(cert.suspended(reason))
            } else {
                Err(CertError::InvalidTransition {
                    identifier: cert.identifier.clone(),
                    from: cert.status,
                    to: CertificateStatus::Suspended,
                })
            }
        };
        let (before, after) =
            bounded(self.store_timeout, self.store.transition(identifier, &apply)).await?;

        info!("suspended certificate {} by {}", identifier, actor);
        self.emit(LifecycleEvent::changed(
            LifecycleKind::CertificateSuspended,
            &actor,
            before,
            after.clone(),
            Utc::now(),
        ))
        .await;
        Ok(after)
    }

    pub async fn get(&self, identifier: &str) -> Result<Certificate> {
        bounded(self.store_timeout, self.store.find(identifier))
            .await?
            .ok_or_else(|| CertError::NotFound(identifier.to_string()))
    }

    // The transition is already committed; a failing audit sink must not
    // make it look like it wasn't.
    async fn emit(&self, event: LifecycleEvent) {
        if let Err(e) = self.audit.record_transition(&event).await {
            warn!(
                "audit sink rejected {:?} for {}: {}",
                event.kind, event.identifier, e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;
    use crate::directory::MemoryDirectory;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    struct Fixture {
        lifecycle: CertificateLifecycle,
        store: Arc<MemoryStore>,
        audit: Arc<MemoryAuditLog>,
    }

    async fn fixture() -> Fixture {
        let directory = MemoryDirectory::new();
        directory.add_student("s1", "CSL-2025-001").await;
        directory.add_student("s2", "CSL-2025-002").await;
        directory.add_course("c-cs", "CS").await.unwrap();
        directory.add_admin("a1", "admin-1").await;

        let store = Arc::new(MemoryStore::new());
        let audit = Arc::new(MemoryAuditLog::new());
        let config = EngineConfig::new(Pepper::new("test-pepper").unwrap());
        let lifecycle =
            CertificateLifecycle::new(&config, store.clone(), Arc::new(directory), audit.clone());
        Fixture {
            lifecycle,
            store,
            audit,
        }
    }

    fn in_2025() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn first_issuance_gets_sequence_one() {
        let f = fixture().await;
        let cert = f.lifecycle.issue_at("s1", "c-cs", "a1", in_2025()).await.unwrap();

        assert!(cert.identifier.starts_with("2025-CS-0001-"));
        assert!(validate_format(&cert.identifier));
        assert_eq!(cert.issuer_ref, "admin-1");
        assert_eq!(
            cert.digest,
            compute_digest("CSL-2025-001", "2025-CS-0001", &Pepper::new("test-pepper").unwrap())
        );
        assert_eq!(f.audit.transitions().await.len(), 1);
    }

    #[tokio::test]
    async fn second_active_issuance_is_a_duplicate() {
        let f = fixture().await;
        let first = f.lifecycle.issue_at("s1", "c-cs", "a1", in_2025()).await.unwrap();
        let err = f
            .lifecycle
            .issue_at("s1", "c-cs", "a1", in_2025())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CertError::DuplicateCertificate {
                student_ref: "s1".into(),
                course_ref: "c-cs".into(),
                existing: first.identifier,
            }
        );
        assert_eq!(f.store.len().await, 1);
    }

    #[tokio::test]
    async fn revoke_records_details_and_is_terminal() {
        let f = fixture().await;
        let cert = f.lifecycle.issue_at("s1", "c-cs", "a1", in_2025()).await.unwrap();

        let revoked = f
            .lifecycle
            .revoke(&cert.identifier, "a1", Some("issued in error"))
            .await
            .unwrap();
        assert_eq!(revoked.status, CertificateStatus::Revoked);
        assert_eq!(revoked.revocation.as_ref().unwrap().reason, "issued in error");
        assert_eq!(revoked.revocation.as_ref().unwrap().revoked_by, "admin-1");

        let again = f.lifecycle.revoke(&cert.identifier, "a1", None).await;
        assert_eq!(again, Err(CertError::AlreadyRevoked(cert.identifier.clone())));

        let events = f.audit.transitions().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, LifecycleKind::CertificateRevoked);
        assert!(events[1].before.as_ref().unwrap().is_active());
    }

    #[tokio::test]
    async fn revoked_pair_can_be_reissued_with_next_sequence() {
        let f = fixture().await;
        let first = f.lifecycle.issue_at("s1", "c-cs", "a1", in_2025()).await.unwrap();
        f.lifecycle.revoke(&first.identifier, "a1", None).await.unwrap();
        let second = f.lifecycle.issue_at("s1", "c-cs", "a1", in_2025()).await.unwrap();
        assert!(second.identifier.starts_with("2025-CS-0002-"));
    }

    #[tokio::test]
    async fn revoke_unknown_or_malformed() {
        let f = fixture().await;
        assert_eq!(
            f.lifecycle.revoke("2025-CS-0042-ABCDEF", "a1", None).await,
            Err(CertError::NotFound("2025-CS-0042-ABCDEF".into()))
        );
        assert!(matches!(
            f.lifecycle.revoke("2025-cs-0042-ABCDEF", "a1", None).await,
            Err(CertError::InvalidFormat(_))
        ));
    }

    #[tokio::test]
    async fn suspended_certificate_cannot_be_revoked_or_resuspended() {
        let f = fixture().await;
        let cert = f.lifecycle.issue_at("s1", "c-cs", "a1", in_2025()).await.unwrap();
        let suspended = f
            .lifecycle
            .suspend(&cert.identifier, "a1", "under review")
            .await
            .unwrap();
        assert_eq!(suspended.status, CertificateStatus::Suspended);
        assert_eq!(suspended.notes.as_deref(), Some("under review"));
        assert!(suspended.revocation.is_none());

        assert!(matches!(
            f.lifecycle.revoke(&cert.identifier, "a1", None).await,
            Err(CertError::InvalidTransition { .. })
        ));
        assert!(matches!(
            f.lifecycle.suspend(&cert.identifier, "a1", "again").await,
            Err(CertError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_references_are_rejected_before_allocation() {
        let f = fixture().await;
        assert!(matches!(
            f.lifecycle.issue_at("nobody", "c-cs", "a1", in_2025()).await,
            Err(CertError::UnknownReference { kind: "student", .. })
        ));
        assert!(matches!(
            f.lifecycle.issue_at("s1", "c-cs", "not-admin", in_2025()).await,
            Err(CertError::UnknownReference { kind: "admin", .. })
        ));
        let cert = f.lifecycle.issue_at("s2", "c-cs", "a1", in_2025()).await.unwrap();
        assert_eq!(cert.sequence, 1);
    }

    #[tokio::test]
    async fn offline_store_fails_issuance_without_side_effects() {
        let f = fixture().await;
        f.store.set_online(false);
        let err = f
            .lifecycle
            .issue_at("s1", "c-cs", "a1", in_2025())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(f.audit.transitions().await.is_empty());
    }

    #[tokio::test]
    async fn get_reports_missing_certificates() {
        let f = fixture().await;
        let cert = f.lifecycle.issue_at("s1", "c-cs", "a1", in_2025()).await.unwrap();
        assert_eq!(f.lifecycle.get(&cert.identifier).await.unwrap(), cert);
        assert!(matches!(
            f.lifecycle.get("2025-CS-0099-ABCDEF").await,
            Err(CertError::NotFound(_))
        ));
    }
}
