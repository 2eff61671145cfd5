pub mod cache;
pub mod memory;
pub mod sequence;

pub use cache::CachingStore;
pub use memory::MemoryStore;
pub use sequence::{SequenceAllocator, SequenceKey};

use crate::error::{CertError, Result};
use crate::pki::{Certificate, IssueRequest};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Backing store for certificate records.
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Atomically: refuse if the pair already holds an active certificate,
    /// allocate the next sequence for `(request.year, request.course_code)`,
    /// then build the record with `mint` and insert it. Concurrent callers
    /// never observe the same sequence.
    async fn insert_next(
        &self,
        request: &IssueRequest,
        mint: &(dyn Fn(u32) -> Result<Certificate> + Send + Sync),
    ) -> Result<Certificate>;

    async fn find(&self, identifier: &str) -> Result<Option<Certificate>>;

    /// Lookup by `YYYY-CC-NNNN`. Unique because sequences never repeat
    /// within a (year, course code) pair.
    async fn find_by_base(&self, base: &str) -> Result<Option<Certificate>>;

    async fn find_active(&self, student_ref: &str, course_ref: &str)
    -> Result<Option<Certificate>>;

    /// Applies `apply` to the current record under the store's write lock and
    /// returns `(before, after)`.
    async fn transition(
        &self,
        identifier: &str,
        apply: &(dyn for<'c> Fn(&'c Certificate) -> Result<Certificate> + Send + Sync),
    ) -> Result<(Certificate, Certificate)>;

    async fn list_by_year(&self, year: i32) -> Result<Vec<Certificate>>;
}

/// Runs a store call with an upper bound on how long it may take.
pub async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(CertError::StorageUnavailable(format!(
            "store did not answer within {}ms",
            limit.as_millis()
        ))),
    }
}
