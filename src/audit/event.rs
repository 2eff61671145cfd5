use crate::pki::Certificate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleKind {
    CertificateIssued,
    CertificateRevoked,
    CertificateSuspended,
}

/// Before/after snapshot of a lifecycle transition, handed to the audit
/// collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: LifecycleKind,
    pub identifier: String,
    pub actor: String,
    pub before: Option<Certificate>,
    pub after: Certificate,
    pub timestamp: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn issued(cert: &Certificate) -> Self {
        Self {
            kind: LifecycleKind::CertificateIssued,
            identifier: cert.identifier.clone(),
            actor: cert.issuer_ref.clone(),
            before: None,
            after: cert.clone(),
            timestamp: cert.issued_at,
        }
    }

    pub fn changed(
        kind: LifecycleKind,
        actor: &str,
        before: Certificate,
        after: Certificate,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            identifier: after.identifier.clone(),
            actor: actor.to_string(),
            before: Some(before),
            after,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationAttempt {
    pub identifier: String,
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
    pub reason: String,
}

impl VerificationAttempt {
    pub fn new(identifier: &str, valid: bool, reason: impl Into<String>) -> Self {
        Self {
            identifier: identifier.to_string(),
            timestamp: Utc::now(),
            valid,
            reason: reason.into(),
        }
    }
}
