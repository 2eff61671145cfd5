pub mod event;
pub mod sink;

pub use event::{LifecycleEvent, LifecycleKind, VerificationAttempt};
pub use sink::{LogAuditSink, MemoryAuditLog};

use crate::error::Result;
use async_trait::async_trait;

/// Receiver for lifecycle transitions and verification attempts. Storage of
/// the trail belongs to the implementor.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_transition(&self, event: &LifecycleEvent) -> Result<()>;
    async fn record_verification(&self, attempt: &VerificationAttempt) -> Result<()>;
}
