use super::certificate::{Certificate, CertificateStatus};
use crate::audit::{AuditSink, VerificationAttempt};
use crate::config::EngineConfig;
use crate::crypto::{Pepper, compute_digest, digest};
use crate::directory::Directory;
use crate::error::{CertError, Result};
use crate::identifier::parse;
use crate::store::{CertificateStore, bounded};
use log::{debug, info, warn};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationReason {
    InvalidFormat,
    NotFound,
    NotActive(CertificateStatus),
    /// Well-formed, on record, active, but the digest does not match. This
    /// is the forgery signal.
    AuthenticityUnverified,
    Authentic,
}

impl fmt::Display for VerificationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationReason::InvalidFormat => f.write_str("invalid format"),
            VerificationReason::NotFound => f.write_str("not found"),
            VerificationReason::NotActive(status) => write!(f, "certificate is {status}"),
            VerificationReason::AuthenticityUnverified => {
                f.write_str("authenticity could not be verified")
            }
            VerificationReason::Authentic => f.write_str("valid and authentic"),
        }
    }
}

impl Serialize for VerificationReason {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationOutcome {
    pub identifier: String,
    pub valid: bool,
    /// Returned whenever the record was found, so callers can show
    /// revocation details.
    pub certificate: Option<Certificate>,
    pub reason: VerificationReason,
}

impl VerificationOutcome {
    fn new(identifier: &str, reason: VerificationReason, certificate: Option<Certificate>) -> Self {
        Self {
            identifier: identifier.to_string(),
            valid: reason == VerificationReason::Authentic,
            certificate,
            reason,
        }
    }

    /// Maps a negative outcome onto the error taxonomy.
    pub fn into_result(self) -> Result<Certificate> {
        match (self.reason, self.certificate) {
            (VerificationReason::Authentic, Some(cert)) => Ok(cert),
            (VerificationReason::NotActive(status), _) => Err(CertError::NotActive {
                identifier: self.identifier,
                status,
            }),
            (VerificationReason::AuthenticityUnverified, _) => {
                Err(CertError::AuthenticityMismatch(self.identifier))
            }
            (VerificationReason::InvalidFormat, _) => Err(CertError::InvalidFormat(self.identifier)),
            (VerificationReason::NotFound, _) | (VerificationReason::Authentic, None) => {
                Err(CertError::NotFound(self.identifier))
            }
        }
    }
}

/// Answers "is this identifier authentic and currently valid?". Read-only;
/// any number of calls may run at once.
pub struct VerificationService {
    store: Arc<dyn CertificateStore>,
    directory: Arc<dyn Directory>,
    audit: Arc<dyn AuditSink>,
    pepper: Pepper,
    store_timeout: Duration,
}

impl VerificationService {
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

    /// `Err` only when a collaborator cannot answer; every verdict about the
    /// identifier itself is an `Ok` outcome.
    pub async fn verify(&self, identifier: &str) -> Result<VerificationOutcome> {
        let outcome = self.evaluate(identifier).await?;

        let attempt =
            VerificationAttempt::new(identifier, outcome.valid, outcome.reason.to_string());
        if let Err(e) = self.audit.record_verification(&attempt).await {
            warn!("audit sink rejected verification of {:?}: {}", identifier, e);
        }
        Ok(outcome)
    }

    async fn evaluate(&self, identifier: &str) -> Result<VerificationOutcome> {
        let Some(parsed) = parse(identifier) else {
            debug!("verification rejected malformed identifier {:?}", identifier);
            return Ok(VerificationOutcome::new(
                identifier,
                VerificationReason::InvalidFormat,
                None,
            ));
        };

        // Keyed by base so that a wrong digest on a real base is reported as
        // an authenticity failure rather than a typo.
        let base = parsed.base();
        let Some(cert) = bounded(self.store_timeout, self.store.find_by_base(&base)).await? else {
            debug!("verification found no certificate {}", identifier);
            return Ok(VerificationOutcome::new(
                identifier,
                VerificationReason::NotFound,
                None,
            ));
        };

        // Nothing about the stored record, including its status, is returned
        // unless the caller already holds its exact identifier.
        if !digest::matches(&cert.digest, &parsed.digest) {
            warn!(
                "AUTHENTICITY MISMATCH for {}: digest does not match the certificate on record",
                identifier
            );
            return Ok(VerificationOutcome::new(
                identifier,
                VerificationReason::AuthenticityUnverified,
                None,
            ));
        }

        if cert.status != CertificateStatus::Active {
            info!("verification of {} refused: status {}", identifier, cert.status);
            return Ok(VerificationOutcome::new(
                identifier,
                VerificationReason::NotActive(cert.status),
                Some(cert),
            ));
        }

        let identity = match bounded(
            self.store_timeout,
            self.directory.student_identity(&cert.student_ref),
        )
        .await
        {
            Ok(identity) => identity,
            Err(CertError::UnknownReference { kind, id }) => {
                warn!(
                    "cannot verify {}: {} {} is no longer in the directory",
                    identifier, kind, id
                );
                return Ok(VerificationOutcome::new(
                    identifier,
                    VerificationReason::AuthenticityUnverified,
                    Some(cert),
                ));
            }
            Err(e) => return Err(e),
        };
        let expected = compute_digest(&identity, &base, &self.pepper);

        if !digest::matches(&expected, &parsed.digest) {
            warn!(
                "AUTHENTICITY MISMATCH for {} (student {}): possible forged or altered identifier",
                identifier, cert.student_ref
            );
            return Ok(VerificationOutcome::new(
                identifier,
                VerificationReason::AuthenticityUnverified,
                Some(cert),
            ));
        }

        debug!("verified {}", identifier);
        Ok(VerificationOutcome::new(
            identifier,
            VerificationReason::Authentic,
            Some(cert),
        ))
    }
}
