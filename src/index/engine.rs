//! Physical tantivy index management
//!
//! The engine works at the level of physical index names (`alias__a`,
//! `alias__b`); alias resolution and slot logic live in [`IndexService`].
//!
//! [`IndexService`]: crate::index::IndexService

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tantivy::collector::Count;
use tantivy::query::AllQuery;
use tantivy::schema::Facet;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::config::IndexingConfig;
use crate::error::{IndexError, Result};
use crate::index::schema::{IndexSchema, SENTINEL_NONE};
use crate::index::IndexDefinition;
use crate::model::{IndexDocument, Variation};
use crate::query::{SearchRequest, SearchResponse};

/// One open physical index
pub(crate) struct IndexHandle {
    pub index: Index,
    pub schema: IndexSchema,
    pub writer: RwLock<IndexWriter>,
    pub reader: IndexReader,
}

/// Manages the physical tantivy indexes under one base directory
pub struct TantivyEngine {
    base_path: PathBuf,
    writer_heap_size: usize,
    max_results: usize,
    handles: DashMap<String, Arc<IndexHandle>>,
}

impl TantivyEngine {
    pub fn new(config: &IndexingConfig) -> Self {
        Self {
            base_path: config.index_path.clone(),
            writer_heap_size: config.writer_heap_size,
            max_results: config.max_results,
            handles: DashMap::new(),
        }
    }

    fn index_dir(&self, physical: &str) -> PathBuf {
        self.base_path.join(physical)
    }

    fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    /// Open or create the physical index, caching the handle
    pub(crate) fn handle(
        &self,
        definition: &IndexDefinition,
        physical: &str,
    ) -> Result<Arc<IndexHandle>> {
        if let Some(handle) = self.handles.get(physical) {
            return Ok(handle.clone());
        }

        let path = self.index_dir(physical);
        std::fs::create_dir_all(&path).map_err(|e| {
            IndexError::Unavailable(format!("failed to create index directory: {}", e))
        })?;

        let schema = IndexSchema::build(definition);
        let index = if Self::index_exists(&path) {
            Index::open_in_dir(&path)
                .map_err(|e| IndexError::Unavailable(format!("failed to open index: {}", e)))?
        } else {
            Index::create_in_dir(&path, schema.schema.clone())
                .map_err(|e| IndexError::Unavailable(format!("failed to create index: {}", e)))?
        };

        let writer = index
            .writer(self.writer_heap_size)
            .map_err(|e| IndexError::Unavailable(format!("failed to create writer: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e: tantivy::TantivyError| {
                IndexError::Unavailable(format!("failed to create reader: {}", e))
            })?;

        let handle = Arc::new(IndexHandle {
            index,
            schema,
            writer: RwLock::new(writer),
            reader,
        });
        self.handles.insert(physical.to_string(), handle.clone());
        Ok(handle)
    }

    /// Whether the physical slot holds any documents (startup probing)
    pub(crate) fn probe_non_empty(
        &self,
        definition: &IndexDefinition,
        physical: &str,
    ) -> Result<bool> {
        if !Self::index_exists(&self.index_dir(physical)) {
            return Ok(false);
        }
        Ok(self.count(definition, physical)? > 0)
    }

    pub(crate) fn count(&self, definition: &IndexDefinition, physical: &str) -> Result<u64> {
        let handle = self.handle(definition, physical)?;
        let searcher = handle.reader.searcher();
        let count = searcher.search(&AllQuery, &Count)?;
        Ok(count as u64)
    }

    /// Replace all variation entries for the document's key
    pub(crate) async fn upsert(
        &self,
        definition: &IndexDefinition,
        physical: &str,
        document: &IndexDocument,
    ) -> Result<()> {
        let handle = self.handle(definition, physical)?;
        let schema = &handle.schema;

        let mut writer = handle.writer.write().await;
        writer.delete_term(Term::from_field_text(
            schema.key,
            &document.key.to_string(),
        ));

        for variation in &document.variations {
            writer.add_document(self.variation_doc(schema, document, variation))?;
        }

        writer.commit()?;
        drop(writer);
        handle.reader.reload()?;
        Ok(())
    }

    fn variation_doc(
        &self,
        schema: &IndexSchema,
        document: &IndexDocument,
        variation: &Variation,
    ) -> TantivyDocument {
        let culture = variation.culture.as_deref().unwrap_or(SENTINEL_NONE);
        let segment = variation.segment.as_deref().unwrap_or(SENTINEL_NONE);

        let mut doc = TantivyDocument::new();
        doc.add_text(
            schema.doc_id,
            format!("{}|{}|{}", document.key, culture, segment),
        );
        doc.add_text(schema.key, document.key.to_string());
        doc.add_text(schema.kind, document.object_kind.to_string());
        doc.add_text(schema.culture, culture);
        doc.add_text(schema.segment, segment);

        for ancestor in &document.path {
            doc.add_text(schema.ancestors, ancestor.to_string());
        }

        match &document.protection {
            None => doc.add_text(schema.protection, SENTINEL_NONE),
            Some(protection) => {
                for principal in &protection.principals {
                    doc.add_text(schema.protection, format!("p:{}", principal));
                }
                for group in &protection.groups {
                    doc.add_text(schema.protection, format!("g:{}", group));
                }
            }
        }

        for field in &document.fields {
            if !field.applies_to(variation) {
                continue;
            }
            let Some(columns) = schema.columns(&field.name) else {
                debug!(field = %field.name, "field not declared on index, dropped");
                continue;
            };

            let value = &field.value;
            if let Some(column) = columns.text_r1 {
                for text in &value.texts_r1 {
                    doc.add_text(column, text);
                }
            }
            if let Some(column) = columns.text_r2 {
                for text in &value.texts_r2 {
                    doc.add_text(column, text);
                }
            }
            if let Some(column) = columns.text_r3 {
                for text in &value.texts_r3 {
                    doc.add_text(column, text);
                }
            }
            if let Some(column) = columns.text {
                for text in &value.texts {
                    doc.add_text(column, text);
                }
            }
            if let Some(column) = columns.keyword {
                for keyword in &value.keywords {
                    doc.add_text(column, keyword);
                    doc.add_facet(schema.facets, Facet::from_path([&field.name, keyword]));
                }
            }
            if let Some(column) = columns.integer {
                for integer in &value.integers {
                    doc.add_i64(column, *integer);
                    let path = integer.to_string();
                    doc.add_facet(
                        schema.facets,
                        Facet::from_path([field.name.as_str(), path.as_str()]),
                    );
                }
            }
            if let Some(column) = columns.decimal {
                for decimal in &value.decimals {
                    doc.add_f64(column, *decimal);
                    let path = decimal.to_string();
                    doc.add_facet(
                        schema.facets,
                        Facet::from_path([field.name.as_str(), path.as_str()]),
                    );
                }
            }
            if let Some(column) = columns.datetime {
                for timestamp in &value.timestamps {
                    doc.add_date(
                        column,
                        tantivy::DateTime::from_timestamp_secs(timestamp.timestamp()),
                    );
                    let path = timestamp.timestamp().to_string();
                    doc.add_facet(
                        schema.facets,
                        Facet::from_path([field.name.as_str(), path.as_str()]),
                    );
                }
            }
        }

        doc
    }

    /// Remove the given keys and every document whose path includes them
    pub(crate) async fn delete(
        &self,
        definition: &IndexDefinition,
        physical: &str,
        keys: &[Uuid],
    ) -> Result<()> {
        let handle = self.handle(definition, physical)?;
        let schema = &handle.schema;

        let mut writer = handle.writer.write().await;
        for key in keys {
            // The ancestors column includes the document's own key, so this
            // removes the key and its indexed descendants in one term delete
            writer.delete_term(Term::from_field_text(schema.ancestors, &key.to_string()));
        }
        writer.commit()?;
        drop(writer);
        handle.reader.reload()?;
        Ok(())
    }

    pub(crate) async fn reset(
        &self,
        definition: &IndexDefinition,
        physical: &str,
    ) -> Result<()> {
        let handle = self.handle(definition, physical)?;
        let mut writer = handle.writer.write().await;
        writer.delete_all_documents()?;
        writer.commit()?;
        drop(writer);
        handle.reader.reload()?;
        Ok(())
    }

    pub(crate) fn search(
        &self,
        definition: &IndexDefinition,
        physical: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse> {
        let handle = self.handle(definition, physical)?;
        crate::index::search::execute(&handle, request, self.max_results)
    }
}
