use super::{AuditSink, LifecycleEvent, VerificationAttempt};
use crate::error::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps the trail in memory.
#[derive(Default)]
pub struct MemoryAuditLog {
    transitions: Arc<RwLock<Vec<LifecycleEvent>>>,
    verifications: Arc<RwLock<Vec<VerificationAttempt>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn transitions(&self) -> Vec<LifecycleEvent> {
        self.transitions.read().await.clone()
    }

    pub async fn verifications(&self) -> Vec<VerificationAttempt> {
        self.verifications.read().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn record_transition(&self, event: &LifecycleEvent) -> Result<()> {
        self.transitions.write().await.push(event.clone());
        Ok(())
    }

    async fn record_verification(&self, attempt: &VerificationAttempt) -> Result<()> {
        self.verifications.write().await.push(attempt.clone());
        Ok(())
    }
}

/// Writes each record as a JSON line under the `audit` log target.
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn record_transition(&self, event: &LifecycleEvent) -> Result<()> {
        info!(target: "audit", "{}", serde_json::to_string(event)?);
        Ok(())
    }

    async fn record_verification(&self, attempt: &VerificationAttempt) -> Result<()> {
        info!(target: "audit", "{}", serde_json::to_string(attempt)?);
        Ok(())
    }
}
