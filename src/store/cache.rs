use super::CertificateStore;
use crate::error::Result;
use crate::identifier::codec::BASE_LEN;
use crate::pki::{Certificate, IssueRequest};
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Read-through LRU cache in front of another store, keyed by base
/// (`YYYY-CC-NNNN`) so both lookups share entries.
///
/// Only hits are cached. A miss holds the cache lock across the inner read
/// and the put; writes commit to the inner store first and then evict the
/// base. Whichever order a racing read and write land in, the entry left
/// behind is either absent or current.
pub struct CachingStore<S> {
    inner: S,
    cache: Arc<Mutex<LruCache<String, Certificate>>>,
    cache_hits: Arc<AtomicU64>,
    cache_misses: Arc<AtomicU64>,
}

impl<S: CertificateStore> CachingStore<S> {
    pub fn new(inner: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            cache_hits: Arc::new(AtomicU64::new(0)),
            cache_misses: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Percentage of lookups answered from the cache.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;

        if total == 0 {
            return 0.0;
        }

        (hits as f64 / total as f64) * 100.0
    }

    async fn evict(&self, base: &str) {
        self.cache.lock().await.pop(base);
    }

    fn record(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[async_trait]
impl<S: CertificateStore> CertificateStore for CachingStore<S> {
    async fn insert_next(
        &self,
        request: &IssueRequest,
        mint: &(dyn Fn(u32) -> Result<Certificate> + Send + Sync),
    ) -> Result<Certificate> {
        let cert = self.inner.insert_next(request, mint).await?;
        self.evict(&cert.base()).await;
        Ok(cert)
    }

    async fn find(&self, identifier: &str) -> Result<Option<Certificate>> {
        let Some(base) = identifier.get(..BASE_LEN) else {
            return self.inner.find(identifier).await;
        };

        let mut cache = self.cache.lock().await;
        if let Some(cert) = cache.get(base) {
            let hit = cert.identifier == identifier;
            self.record(hit);
            if hit {
                return Ok(Some(cert.clone()));
            }
            // same base, different digest: only the inner store can say
            return self.inner.find(identifier).await;
        }
        self.record(false);

        let found = self.inner.find(identifier).await?;
        if let Some(cert) = &found {
            cache.put(cert.base(), cert.clone());
        }
        Ok(found)
    }

    async fn find_by_base(&self, base: &str) -> Result<Option<Certificate>> {
        let mut cache = self.cache.lock().await;
        if let Some(cert) = cache.get(base) {
            self.record(true);
            return Ok(Some(cert.clone()));
        }
        self.record(false);

        let found = self.inner.find_by_base(base).await?;
        if let Some(cert) = &found {
            cache.put(cert.base(), cert.clone());
        }
        Ok(found)
    }

    async fn find_active(
        &self,
        student_ref: &str,
        course_ref: &str,
    ) -> Result<Option<Certificate>> {
        self.inner.find_active(student_ref, course_ref).await
    }

    async fn transition(
        &self,
        identifier: &str,
        apply: &(dyn for<'c> Fn(&'c Certificate) -> Result<Certificate> + Send + Sync),
    ) -> Result<(Certificate, Certificate)> {
        let (before, after) = self.inner.transition(identifier, apply).await?;
        self.evict(&after.base()).await;
        Ok((before, after))
    }

    async fn list_by_year(&self, year: i32) -> Result<Vec<Certificate>> {
        self.inner.list_by_year(year).await
    }
}
