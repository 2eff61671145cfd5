pub mod certificate;
pub mod lifecycle;
pub mod verification;

pub use certificate::{
    Certificate, CertificateStatus, DEFAULT_REVOCATION_REASON, IssueRequest, Revocation,
};
pub use lifecycle::CertificateLifecycle;
pub use verification::{VerificationOutcome, VerificationReason, VerificationService};

use crate::audit::AuditSink;
use crate::config::EngineConfig;
use crate::directory::Directory;
use crate::store::CertificateStore;
use std::sync::Arc;

/// Lifecycle and verification wired to the same collaborators.
pub struct CertificateEngine {
    pub lifecycle: CertificateLifecycle,
    pub verifier: VerificationService,
}

impl CertificateEngine {
    pub fn new(
        config: &EngineConfig,
        store: Arc<dyn CertificateStore>,
        directory: Arc<dyn Directory>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            lifecycle: CertificateLifecycle::new(
                config,
                store.clone(),
                directory.clone(),
                audit.clone(),
            ),
            verifier: VerificationService::new(config, store, directory, audit),
        }
    }
}
