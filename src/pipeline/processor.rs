//! Change processing and the descendant cascade

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::IndexingConfig;
use crate::content::{ContentNode, ContentStore};
use crate::error::Result;
use crate::extract::{ExtractorRegistry, FieldCollector};
use crate::index::Indexer;
use crate::model::{ChangeImpact, ChangeStamp, ContentChange, IndexDocument};
use crate::pipeline::StampStore;
use crate::resolve::VariationResolver;

/// Result of reindexing one node
struct NodeOutcome {
    /// The node still has at least one routable variation
    routable: bool,
    /// The variation set differs from the stamped one
    changed: bool,
}

/// Turns content changes into index writes, cascading over descendants when a
/// node's routable variation set changed shape
pub struct ChangeProcessor {
    content: Arc<dyn ContentStore>,
    resolver: VariationResolver,
    collector: FieldCollector,
    indexer: Arc<dyn Indexer>,
    stamps: Arc<dyn StampStore>,
    page_size: usize,
}

impl ChangeProcessor {
    pub fn new(
        content: Arc<dyn ContentStore>,
        indexer: Arc<dyn Indexer>,
        stamps: Arc<dyn StampStore>,
        registry: Arc<ExtractorRegistry>,
        config: &IndexingConfig,
    ) -> Self {
        Self {
            resolver: VariationResolver::new(content.clone()),
            collector: FieldCollector::new(registry),
            content,
            indexer,
            stamps,
            page_size: config.descendant_page_size,
        }
    }

    /// Process one deduplicated change batch in order.
    ///
    /// Removals are buffered and flushed before any refresh runs, so a
    /// removal followed by a refresh of a former descendant cannot resurrect
    /// documents under a deleted subtree.
    pub async fn process(&self, alias: &str, changes: &[ContentChange]) -> Result<()> {
        let mut pending_removals: Vec<Uuid> = Vec::new();

        for change in changes {
            match change.impact {
                ChangeImpact::Remove => {
                    pending_removals.push(change.key);
                    self.stamps.remove(alias, &change.key).await?;
                }
                ChangeImpact::Refresh | ChangeImpact::RefreshWithDescendants => {
                    self.flush_removals(alias, &mut pending_removals).await?;
                    let force = change.impact == ChangeImpact::RefreshWithDescendants;
                    self.refresh(alias, &change.key, force).await?;
                }
            }
        }

        self.flush_removals(alias, &mut pending_removals).await
    }

    async fn flush_removals(&self, alias: &str, pending: &mut Vec<Uuid>) -> Result<()> {
        if pending.is_empty() {
            return Ok(());
        }
        debug!(alias = %alias, count = pending.len(), "flushing removals");
        self.indexer.delete(alias, pending).await?;
        pending.clear();
        Ok(())
    }

    async fn refresh(&self, alias: &str, key: &Uuid, force_cascade: bool) -> Result<()> {
        let Some(node) = self.content.get(key).await? else {
            // The host already forgot the node; mirror that in the index
            info!(alias = %alias, key = %key, "node missing, removed from index");
            self.indexer.delete(alias, &[*key]).await?;
            self.stamps.remove(alias, key).await?;
            return Ok(());
        };

        let outcome = self.reindex_node(alias, &node).await?;
        if outcome.routable && (force_cascade || outcome.changed) {
            self.cascade(alias, &node).await?;
        }
        Ok(())
    }

    /// Reindex one node unconditionally. The returned outcome carries the
    /// stamp diff; the caller decides whether to cascade.
    async fn reindex_node(&self, alias: &str, node: &ContentNode) -> Result<NodeOutcome> {
        let variations = self.resolver.resolve(node).await;

        if variations.is_empty() {
            let previous = self.stamps.get(alias, &node.key).await?;
            self.indexer.delete(alias, &[node.key]).await?;
            self.stamps.remove(alias, &node.key).await?;
            debug!(alias = %alias, key = %node.key, "node unroutable, removed");
            return Ok(NodeOutcome {
                routable: false,
                changed: previous.is_some(),
            });
        }

        let stamp = ChangeStamp::from_variations(&variations)?;
        let changed = match self.stamps.get(alias, &node.key).await? {
            Some(previous) => !previous.covers(&variations),
            None => true,
        };

        let fields = self.collector.collect(node, &variations, node.published);
        let document = IndexDocument {
            key: node.key,
            object_kind: node.object_kind,
            path: node.path_keys(),
            variations: variations.into_iter().collect(),
            fields,
            protection: node.protection.clone(),
        };

        self.indexer.add_or_update(alias, &document).await?;
        self.stamps.put(alias, &node.key, &stamp).await?;

        Ok(NodeOutcome {
            routable: true,
            changed,
        })
    }

    /// Reindex every descendant of `root` in bounded, path-ordered pages.
    ///
    /// A descendant that turns out unroutable has its whole subtree skipped;
    /// path ordering makes the subtree a contiguous run, so a single prefix
    /// suffices. Returns the number of documents written.
    async fn cascade(&self, alias: &str, root: &ContentNode) -> Result<usize> {
        let mut written = 0;
        let mut after: Option<String> = None;
        let mut skip_prefix: Option<String> = None;

        loop {
            let page = self
                .content
                .descendants(&root.key, after.as_deref(), self.page_size)
                .await?;
            let full_page = page.len() == self.page_size;

            for node in &page {
                after = Some(node.path.clone());

                if let Some(prefix) = &skip_prefix {
                    if node.path.starts_with(prefix.as_str()) {
                        continue;
                    }
                    skip_prefix = None;
                }

                match self.reindex_node(alias, node).await {
                    Ok(outcome) => {
                        if outcome.routable {
                            written += 1;
                        } else {
                            skip_prefix = Some(format!("{}/", node.path));
                        }
                    }
                    Err(error) => {
                        // One broken node must not wedge the whole cascade;
                        // treat it like a removal and move on
                        warn!(
                            alias = %alias,
                            key = %node.key,
                            error = %error,
                            "reindex failed during cascade, node removed"
                        );
                        self.indexer.delete(alias, &[node.key]).await?;
                        self.stamps.remove(alias, &node.key).await?;
                        skip_prefix = Some(format!("{}/", node.path));
                    }
                }
            }

            if !full_page {
                break;
            }
        }

        Ok(written)
    }

    /// Reindex the whole tree (used by full rebuilds). Returns the number of
    /// documents written.
    pub async fn reindex_all(&self, alias: &str) -> Result<usize> {
        let mut written = 0;
        for root in self.content.roots().await? {
            let outcome = self.reindex_node(alias, &root).await?;
            if outcome.routable {
                written += 1;
                written += self.cascade(alias, &root).await?;
            }
        }
        info!(alias = %alias, written = written, "full reindex finished");
        Ok(written)
    }
}
