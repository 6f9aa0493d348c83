//! Alias-level index service
//!
//! Resolves aliases to physical slots, enforces per-index object-kind scope
//! and drives the rebuild lifecycle. All reads go to the active slot; while a
//! rebuild is repopulating the shadow slot, incremental writes go there so
//! the swapped index is not stale.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::IndexingConfig;
use crate::error::{IndexError, Result};
use crate::index::engine::TantivyEngine;
use crate::index::slots::{RebuildSlotManager, SlotSuffix};
use crate::index::traits::{Indexer, Searcher};
use crate::index::{HealthStatus, IndexDefinition, IndexMetadata};
use crate::model::IndexDocument;
use crate::query::{SearchRequest, SearchResponse};

pub struct IndexService {
    engine: Arc<TantivyEngine>,
    definitions: DashMap<String, Arc<IndexDefinition>>,
    slots: RebuildSlotManager,
}

impl IndexService {
    /// Open all registered indexes, deriving the active slot per alias from
    /// which physical copy holds documents. An empty pair starts on slot A.
    pub fn new(config: &IndexingConfig, definitions: Vec<IndexDefinition>) -> Result<Self> {
        let engine = Arc::new(TantivyEngine::new(config));
        let registry = DashMap::new();
        let slots = RebuildSlotManager::new();

        for definition in definitions {
            let alias = definition.alias.clone();
            let a = RebuildSlotManager::physical_name(&alias, SlotSuffix::A);
            let b = RebuildSlotManager::physical_name(&alias, SlotSuffix::B);

            let active = if engine.probe_non_empty(&definition, &a)? {
                SlotSuffix::A
            } else if engine.probe_non_empty(&definition, &b)? {
                SlotSuffix::B
            } else {
                SlotSuffix::A
            };

            info!(alias = %alias, active = %active, "index registered");
            slots.register(&alias, active);
            registry.insert(alias, Arc::new(definition));
        }

        Ok(Self {
            engine,
            definitions: registry,
            slots,
        })
    }

    pub fn definition(&self, alias: &str) -> Result<Arc<IndexDefinition>> {
        self.definitions
            .get(alias)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| IndexError::UnknownIndex(alias.to_string()))
    }

    pub fn aliases(&self) -> Vec<String> {
        self.definitions
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn is_rebuilding(&self, alias: &str) -> Result<bool> {
        self.slots.is_rebuilding(alias)
    }

    /// Physical name currently serving reads; used by tests and diagnostics
    pub fn active_index_name(&self, alias: &str) -> Result<String> {
        self.slots.active_index_name(alias)
    }

    /// Begin a rebuild: clear the shadow slot and direct incremental writes
    /// to it. Returns `false` when a rebuild is already running.
    pub async fn start_rebuild(&self, alias: &str) -> Result<bool> {
        let definition = self.definition(alias)?;
        let Some(shadow) = self.slots.try_start(alias)? else {
            return Ok(false);
        };
        if let Err(e) = self.engine.reset(&definition, &shadow).await {
            self.slots.cancel(alias)?;
            return Err(e);
        }
        info!(alias = %alias, shadow = %shadow, "rebuild started");
        Ok(true)
    }

    /// Finish a rebuild. The shadow is probed before the swap; an empty
    /// shadow cancels the swap and the old active slot keeps serving.
    pub async fn complete_rebuild(&self, alias: &str) -> Result<bool> {
        let definition = self.definition(alias)?;
        let shadow = self.slots.shadow_index_name(alias)?;
        let healthy = self.engine.probe_non_empty(&definition, &shadow)?;
        self.slots.complete(alias, healthy)
    }

    pub fn cancel_rebuild(&self, alias: &str) -> Result<()> {
        self.slots.cancel(alias)
    }
}

#[async_trait]
impl Indexer for IndexService {
    async fn add_or_update(&self, alias: &str, document: &IndexDocument) -> Result<()> {
        let definition = self.definition(alias)?;
        document.validate()?;
        if document.object_kind != definition.object_kind {
            debug!(
                alias = %alias,
                key = %document.key,
                kind = %document.object_kind,
                "document kind outside index scope, skipped"
            );
            return Ok(());
        }

        let physical = self.slots.write_index_name(alias)?;
        self.engine.upsert(&definition, &physical, document).await?;
        debug!(alias = %alias, key = %document.key, "document upserted");
        Ok(())
    }

    async fn delete(&self, alias: &str, keys: &[Uuid]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let definition = self.definition(alias)?;
        let physical = self.slots.write_index_name(alias)?;
        self.engine.delete(&definition, &physical, keys).await?;
        debug!(alias = %alias, count = keys.len(), "documents deleted");
        Ok(())
    }

    async fn reset(&self, alias: &str) -> Result<()> {
        let definition = self.definition(alias)?;
        let physical = self.slots.write_index_name(alias)?;
        self.engine.reset(&definition, &physical).await
    }

    async fn metadata(&self, alias: &str) -> Result<IndexMetadata> {
        let definition = self.definition(alias)?;
        let physical = self.slots.active_index_name(alias)?;

        match self.engine.count(&definition, &physical) {
            Ok(document_count) => {
                let health = if self.slots.is_rebuilding(alias)? {
                    HealthStatus::Rebuilding
                } else {
                    HealthStatus::Healthy
                };
                Ok(IndexMetadata {
                    document_count,
                    health,
                })
            }
            Err(e) => {
                warn!(alias = %alias, error = %e, "index unavailable");
                Ok(IndexMetadata {
                    document_count: 0,
                    health: HealthStatus::Unavailable,
                })
            }
        }
    }
}

#[async_trait]
impl Searcher for IndexService {
    async fn search(&self, alias: &str, request: &SearchRequest) -> Result<SearchResponse> {
        let definition = self.definition(alias)?;
        let physical = self.slots.active_index_name(alias)?;
        self.engine.search(&definition, &physical, request)
    }
}
