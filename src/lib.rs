//! Variation-aware incremental search indexing for hierarchical content
//!
//! The crate keeps a search index in step with a hierarchical content tree
//! where publication varies by culture and segment:
//!
//! - [`resolve`] computes the routable variation set for a node from its own
//!   publish state and its whole ancestor chain
//! - [`extract`] turns stored property values into typed index fields
//! - [`pipeline`] processes change notifications, diffing variation stamps to
//!   decide when a change must cascade over descendants
//! - [`index`] translates the engine-agnostic query model to tantivy and
//!   manages the paired physical slots behind each index alias
//! - [`queue`] defers index writes out of host write paths
//!
//! ```no_run
//! use std::sync::Arc;
//! use canopy_index::config::IndexingConfig;
//! use canopy_index::content::InMemoryContentStore;
//! use canopy_index::extract::ExtractorRegistry;
//! use canopy_index::index::{FieldDefinition, FieldKind, IndexDefinition, IndexService};
//! use canopy_index::model::ObjectKind;
//! use canopy_index::pipeline::{ChangeProcessor, InMemoryStampStore};
//!
//! # fn main() -> canopy_index::error::Result<()> {
//! let config = IndexingConfig::default();
//! let definition = IndexDefinition::new("content", ObjectKind::Document)
//!     .with_field(FieldDefinition::new("title", FieldKind::Text));
//!
//! let service = Arc::new(IndexService::new(&config, vec![definition])?);
//! let processor = ChangeProcessor::new(
//!     Arc::new(InMemoryContentStore::new()),
//!     service.clone(),
//!     Arc::new(InMemoryStampStore::new()),
//!     Arc::new(ExtractorRegistry::with_defaults()),
//!     &config,
//! );
//! # let _ = processor;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod extract;
pub mod index;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod queue;
pub mod resolve;

pub use config::IndexingConfig;
pub use error::{IndexError, Result};
pub use index::{
    FieldDefinition, FieldKind, HealthStatus, IndexDefinition, IndexMetadata, IndexService,
    Indexer, Searcher,
};
pub use model::{
    AccessContext, ChangeImpact, ChangeStamp, ContentChange, IndexDocument, IndexField,
    ObjectKind, Protection, Variation,
};
pub use pipeline::{ChangeProcessor, RebuildCoordinator, StampStore};
pub use query::{
    Direction, FacetResult, FacetSpec, FacetValue, Filter, NumericRange, RangeBucket, SearchHit,
    SearchRequest, SearchResponse, SortField, Sorter,
};
pub use queue::{ChangeBatch, IndexingQueue, TransactionScope};
pub use resolve::VariationResolver;
