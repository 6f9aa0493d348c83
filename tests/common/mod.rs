//! Shared fixtures for integration tests

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

use canopy_index::config::IndexingConfig;
use canopy_index::content::InMemoryContentStore;
use canopy_index::error::Result;
use canopy_index::extract::ExtractorRegistry;
use canopy_index::index::{HealthStatus, IndexMetadata, Indexer};
use canopy_index::model::IndexDocument;
use canopy_index::pipeline::{ChangeProcessor, InMemoryStampStore};

pub const ALIAS: &str = "content";

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

/// Install a test subscriber once; `RUST_LOG` controls verbosity
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Everything the pipeline asked an index to do, in order
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedOp {
    Upsert(IndexDocument),
    Delete(Vec<Uuid>),
}

/// Indexer double that records operations instead of writing an index
#[derive(Default)]
pub struct RecordingIndexer {
    ops: Mutex<Vec<RecordedOp>>,
}

impl RecordingIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<RecordedOp> {
        self.ops.lock().clone()
    }

    pub fn upserts_for(&self, key: Uuid) -> Vec<IndexDocument> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                RecordedOp::Upsert(doc) if doc.key == key => Some(doc.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn upsert_count(&self, key: Uuid) -> usize {
        self.upserts_for(key).len()
    }

    pub fn was_deleted(&self, key: Uuid) -> bool {
        self.ops
            .lock()
            .iter()
            .any(|op| matches!(op, RecordedOp::Delete(keys) if keys.contains(&key)))
    }
}

#[async_trait]
impl Indexer for RecordingIndexer {
    async fn add_or_update(&self, _alias: &str, document: &IndexDocument) -> Result<()> {
        self.ops.lock().push(RecordedOp::Upsert(document.clone()));
        Ok(())
    }

    async fn delete(&self, _alias: &str, keys: &[Uuid]) -> Result<()> {
        self.ops.lock().push(RecordedOp::Delete(keys.to_vec()));
        Ok(())
    }

    async fn reset(&self, _alias: &str) -> Result<()> {
        self.ops.lock().clear();
        Ok(())
    }

    async fn metadata(&self, _alias: &str) -> Result<IndexMetadata> {
        Ok(IndexMetadata {
            document_count: 0,
            health: HealthStatus::Healthy,
        })
    }
}

pub fn processor(
    store: &InMemoryContentStore,
    indexer: Arc<RecordingIndexer>,
) -> ChangeProcessor {
    init_tracing();
    ChangeProcessor::new(
        Arc::new(store.clone()),
        indexer,
        Arc::new(InMemoryStampStore::new()),
        Arc::new(ExtractorRegistry::with_defaults()),
        &IndexingConfig::default(),
    )
}
