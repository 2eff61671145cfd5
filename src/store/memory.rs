use super::sequence::{SequenceAllocator, SequenceKey};
use super::CertificateStore;
use crate::error::{CertError, Result};
use crate::pki::{Certificate, IssueRequest};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tokio::time::{Duration, sleep};

#[derive(Default)]
struct State {
    by_identifier: HashMap<String, Certificate>,
    // base -> identifier
    by_base: HashMap<String, String>,
    // (student_ref, course_ref) -> identifier of the active certificate
    active_by_pair: HashMap<(String, String), String>,
    sequences: SequenceAllocator,
}

impl State {
    fn index(&mut self, cert: Certificate) {
        let pair = (cert.student_ref.clone(), cert.course_ref.clone());
        if cert.is_active() {
            self.active_by_pair.insert(pair, cert.identifier.clone());
        } else if self.active_by_pair.get(&pair) == Some(&cert.identifier) {
            self.active_by_pair.remove(&pair);
        }
        self.by_base.insert(cert.base(), cert.identifier.clone());
        self.by_identifier.insert(cert.identifier.clone(), cert);
    }
}

/// Process-local store. One write lock covers the duplicate guard, sequence
/// allocation and insert.
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    online: Arc<AtomicBool>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            online: Arc::new(AtomicBool::new(true)),
            latency: None,
        }
    }

    /// Loads existing records and seeds the sequence counters from them.
    pub fn with_certificates(certs: impl IntoIterator<Item = Certificate>) -> Result<Self> {
        let mut state = State::default();
        for cert in certs {
            let key = SequenceKey::new(cert.issue_year, &cert.course_code)?;
            state.sequences.observe(key, cert.sequence);
            state.index(cert);
        }
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            ..Self::new()
        })
    }

    /// Delay applied before every operation.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.by_identifier.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn ready(&self) -> Result<()> {
        if let Some(latency) = self.latency {
            sleep(latency).await;
        }
        if !self.online.load(Ordering::SeqCst) {
            return Err(CertError::StorageUnavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CertificateStore for MemoryStore {
    async fn insert_next(
        &self,
        request: &IssueRequest,
        mint: &(dyn Fn(u32) -> Result<Certificate> + Send + Sync),
    ) -> Result<Certificate> {
        self.ready().await?;

        let mut state = self.state.write().await;
        let pair = (request.student_ref.clone(), request.course_ref.clone());
        if let Some(existing) = state.active_by_pair.get(&pair) {
            return Err(CertError::DuplicateCertificate {
                student_ref: request.student_ref.clone(),
                course_ref: request.course_ref.clone(),
                existing: existing.clone(),
            });
        }

        let sequence = state
            .sequences
            .next_sequence(request.year, &request.course_code)?;
        let cert = mint(sequence)?;
        state.index(cert.clone());
        Ok(cert)
    }

    async fn find(&self, identifier: &str) -> Result<Option<Certificate>> {
        self.ready().await?;
        Ok(self.state.read().await.by_identifier.get(identifier).cloned())
    }

    async fn find_by_base(&self, base: &str) -> Result<Option<Certificate>> {
        self.ready().await?;
        let state = self.state.read().await;
        Ok(state
            .by_base
            .get(base)
            .and_then(|id| state.by_identifier.get(id))
            .cloned())
    }

    async fn find_active(
        &self,
        student_ref: &str,
        course_ref: &str,
    ) -> Result<Option<Certificate>> {
        self.ready().await?;
        let state = self.state.read().await;
        let pair = (student_ref.to_string(), course_ref.to_string());
        Ok(state
            .active_by_pair
            .get(&pair)
            .and_then(|id| state.by_identifier.get(id))
            .cloned())
    }

    async fn transition(
        &self,
        identifier: &str,
        apply: &(dyn for<'c> Fn(&'c Certificate) -> Result<Certificate> + Send + Sync),
    ) -> Result<(Certificate, Certificate)> {
        self.ready().await?;

        let mut state = self.state.write().await;
        let before = state
            .by_identifier
            .get(identifier)
            .cloned()
            .ok_or_else(|| CertError::NotFound(identifier.to_string()))?;
        let after = apply(&before)?;
        state.index(after.clone());
        Ok((before, after))
    }

    async fn list_by_year(&self, year: i32) -> Result<Vec<Certificate>> {
        self.ready().await?;
        let state = self.state.read().await;
        let mut certs: Vec<Certificate> = state
            .by_identifier
            .values()
            .filter(|c| c.issue_year == year)
            .cloned()
            .collect();
        certs.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(certs)
    }
}
