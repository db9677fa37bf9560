use std::error::Error;

pub mod implementations;
pub mod sqlite_cache;

pub use sqlite_cache::SqliteCacheSink;

/// Sink for task finalize records, consumed by resume logic.
///
/// Finalization is fire-and-forget from the engine's point of view:
/// failures are logged and never block cleanup.
#[async_trait::async_trait]
pub trait CacheSink: Send + Sync {
    async fn init(&self) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Record that the task identified by `task_hash` is finalized and that
    /// the listed tasks successfully consumed its outputs.
    async fn finalize(
        &self,
        task_hash: &str,
        consumer_hashes: &[String],
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}
