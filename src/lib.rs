//! Certificate identifiers of the form `YYYY-CC-NNNN-VVVVVV`: issuance with
//! per-(year, course) sequences, lifecycle transitions, and verification of
//! the keyed digest suffix.

pub mod audit;
pub mod config;
pub mod crypto;
pub mod directory;
pub mod error;
pub mod identifier;
pub mod metrics;
pub mod pki;
pub mod store;

pub use audit::{AuditSink, LogAuditSink, MemoryAuditLog};
pub use config::EngineConfig;
pub use crypto::Pepper;
pub use directory::{Directory, MemoryDirectory};
pub use error::{CertError, Result};
pub use metrics::CertificateStats;
pub use pki::{
    Certificate, CertificateEngine, CertificateLifecycle, CertificateStatus, VerificationOutcome,
    VerificationReason, VerificationService,
};
pub use store::{CachingStore, CertificateStore, MemoryStore};
