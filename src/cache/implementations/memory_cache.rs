use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

use crate::cache::CacheSink;

/// In-memory implementation of [`CacheSink`] for testing.
#[derive(Clone, Default)]
pub struct MemoryCacheSink {
    records: Arc<Mutex<HashMap<String, Vec<String>>>>,
    calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl MemoryCacheSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumer hashes recorded for a finalized task.
    pub fn get(&self, task_hash: &str) -> Option<Vec<String>> {
        self.records.lock().unwrap().get(task_hash).cloned()
    }

    /// All finalize calls made to this sink, in call order.
    pub fn finalize_calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheSink for MemoryCacheSink {
    async fn init(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        // Nothing to initialize for in-memory records
        Ok(())
    }

    async fn finalize(
        &self,
        task_hash: &str,
        consumer_hashes: &[String],
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.calls
            .lock()
            .unwrap()
            .push((task_hash.to_string(), consumer_hashes.to_vec()));
        self.records
            .lock()
            .unwrap()
            .insert(task_hash.to_string(), consumer_hashes.to_vec());
        Ok(())
    }
}
