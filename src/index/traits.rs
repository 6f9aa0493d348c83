//! Write-side and read-side index contracts

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::index::IndexMetadata;
use crate::model::IndexDocument;
use crate::query::{SearchRequest, SearchResponse};

/// Write-side contract: upsert or delete documents within a named index
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Upsert one document by key; replaces all of its variation entries
    async fn add_or_update(&self, alias: &str, document: &IndexDocument) -> Result<()>;

    /// Remove the given keys and all of their indexed descendants
    async fn delete(&self, alias: &str, keys: &[Uuid]) -> Result<()>;

    /// Clear the index fully
    async fn reset(&self, alias: &str) -> Result<()>;

    /// Document count and health for the index
    async fn metadata(&self, alias: &str) -> Result<IndexMetadata>;
}

/// Read-side contract: execute a query-model request against a named index
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, alias: &str, request: &SearchRequest) -> Result<SearchResponse>;
}
