//! Deferred change delivery
//!
//! Host systems hand change batches to the queue from their own write paths;
//! a background worker drains them through the [`ChangeProcessor`] so content
//! saves never wait on index IO. [`TransactionScope`] buffers batches until
//! the host transaction commits, dropping them on rollback.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::{IndexError, Result};
use crate::model::ContentChange;
use crate::pipeline::ChangeProcessor;

/// One ordered batch of changes destined for a single index
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeBatch {
    pub alias: String,
    pub changes: Vec<ContentChange>,
}

impl ChangeBatch {
    pub fn new(alias: impl Into<String>, changes: Vec<ContentChange>) -> Self {
        Self {
            alias: alias.into(),
            changes,
        }
    }
}

/// Background indexing queue. Batches are processed strictly in arrival
/// order; a failed batch is logged and dropped rather than retried, since
/// the next refresh of the same keys repairs the index.
pub struct IndexingQueue {
    sender: mpsc::UnboundedSender<ChangeBatch>,
    worker: JoinHandle<()>,
}

impl IndexingQueue {
    /// Spawn the worker on the current tokio runtime
    pub fn start(processor: Arc<ChangeProcessor>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<ChangeBatch>();
        let worker = tokio::spawn(async move {
            while let Some(batch) = receiver.recv().await {
                if let Err(e) = processor.process(&batch.alias, &batch.changes).await {
                    error!(alias = %batch.alias, error = %e, "change batch failed");
                }
            }
        });
        Self { sender, worker }
    }

    pub fn enqueue(&self, batch: ChangeBatch) -> Result<()> {
        self.sender
            .send(batch)
            .map_err(|_| IndexError::Unavailable("indexing queue stopped".to_string()))
    }

    /// Stop accepting batches and wait for the worker to drain the queue
    pub async fn shutdown(self) {
        drop(self.sender);
        let _ = self.worker.await;
    }
}

/// Buffers change batches for the duration of a host transaction.
///
/// Nothing reaches the queue until `commit`; dropping the scope (or calling
/// `rollback`) discards the buffered batches, mirroring the host rollback.
pub struct TransactionScope<'a> {
    queue: &'a IndexingQueue,
    buffered: Vec<ChangeBatch>,
    completed: bool,
}

impl<'a> TransactionScope<'a> {
    pub fn new(queue: &'a IndexingQueue) -> Self {
        Self {
            queue,
            buffered: Vec::new(),
            completed: false,
        }
    }

    pub fn push(&mut self, batch: ChangeBatch) {
        self.buffered.push(batch);
    }

    /// Release every buffered batch to the queue, in order
    pub fn commit(mut self) -> Result<()> {
        for batch in self.buffered.drain(..) {
            self.queue.enqueue(batch)?;
        }
        self.completed = true;
        Ok(())
    }

    pub fn rollback(mut self) {
        debug!(batches = self.buffered.len(), "transaction scope rolled back");
        self.buffered.clear();
        self.completed = true;
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if !self.completed && !self.buffered.is_empty() {
            debug!(
                batches = self.buffered.len(),
                "uncommitted transaction scope discarded"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexingConfig;
    use crate::content::{ContentNodeBuilder, InMemoryContentStore};
    use crate::error::Result;
    use crate::extract::ExtractorRegistry;
    use crate::index::{Indexer, IndexMetadata};
    use crate::model::IndexDocument;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    #[derive(Default)]
    struct CountingIndexer {
        upserts: AtomicUsize,
        deletes: AtomicUsize,
    }

    #[async_trait]
    impl Indexer for CountingIndexer {
        async fn add_or_update(&self, _alias: &str, _document: &IndexDocument) -> Result<()> {
            self.upserts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn delete(&self, _alias: &str, keys: &[Uuid]) -> Result<()> {
            self.deletes.fetch_add(keys.len(), Ordering::SeqCst);
            Ok(())
        }

        async fn reset(&self, _alias: &str) -> Result<()> {
            Ok(())
        }

        async fn metadata(&self, _alias: &str) -> Result<IndexMetadata> {
            unimplemented!("not used by queue tests")
        }
    }

    fn processor(
        store: &InMemoryContentStore,
        indexer: Arc<CountingIndexer>,
    ) -> Arc<ChangeProcessor> {
        Arc::new(ChangeProcessor::new(
            Arc::new(store.clone()),
            indexer,
            Arc::new(crate::pipeline::InMemoryStampStore::new()),
            Arc::new(ExtractorRegistry::with_defaults()),
            &IndexingConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_queue_drains_batches_in_order() {
        let store = InMemoryContentStore::new();
        let node = ContentNodeBuilder::new(Uuid::new_v4(), "page").build();
        store.insert(node.clone());

        let indexer = Arc::new(CountingIndexer::default());
        let queue = IndexingQueue::start(processor(&store, indexer.clone()));

        queue
            .enqueue(ChangeBatch::new(
                "content",
                vec![ContentChange::refresh(node.key)],
            ))
            .unwrap();
        queue.shutdown().await;

        assert_eq!(indexer.upserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rolled_back_scope_reaches_nothing() {
        let store = InMemoryContentStore::new();
        let indexer = Arc::new(CountingIndexer::default());
        let queue = IndexingQueue::start(processor(&store, indexer.clone()));

        let mut scope = TransactionScope::new(&queue);
        scope.push(ChangeBatch::new(
            "content",
            vec![ContentChange::refresh(Uuid::new_v4())],
        ));
        scope.rollback();

        queue.shutdown().await;
        assert_eq!(indexer.upserts.load(Ordering::SeqCst), 0);
        assert_eq!(indexer.deletes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_committed_scope_releases_batches() {
        let store = InMemoryContentStore::new();
        let node = ContentNodeBuilder::new(Uuid::new_v4(), "page").build();
        store.insert(node.clone());

        let indexer = Arc::new(CountingIndexer::default());
        let queue = IndexingQueue::start(processor(&store, indexer.clone()));

        let mut scope = TransactionScope::new(&queue);
        scope.push(ChangeBatch::new(
            "content",
            vec![ContentChange::refresh(node.key)],
        ));
        scope.commit().unwrap();

        queue.shutdown().await;
        assert_eq!(indexer.upserts.load(Ordering::SeqCst), 1);
    }
}
