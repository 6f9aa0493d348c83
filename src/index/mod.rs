//! Index write/read contracts and the tantivy-backed implementation
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 IndexService                     │
//! │  alias registry · slot resolution · rebuild ctl  │
//! ├─────────────────────────────────────────────────┤
//! │               RebuildSlotManager                 │
//! │  per-alias active/shadow state, atomic swap      │
//! ├─────────────────────────────────────────────────┤
//! │                 TantivyEngine                    │
//! │  physical indexes, schema, query translation     │
//! └─────────────────────────────────────────────────┘
//! ```

mod engine;
mod schema;
mod search;
mod service;
mod slots;
mod traits;

pub use engine::TantivyEngine;
pub use service::IndexService;
pub use slots::{RebuildSlotManager, SlotSuffix};
pub use traits::{Indexer, Searcher};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ObjectKind;

/// Value kind a declared field accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Tiered full text
    Text,
    /// Exact-match tokens, facetable
    Keyword,
    Integer,
    Decimal,
    DateTime,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldKind::Text => "text",
            FieldKind::Keyword => "keyword",
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "decimal",
            FieldKind::DateTime => "datetime",
        };
        write!(f, "{}", s)
    }
}

/// One field the index is told to accept at registration time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub kinds: Vec<FieldKind>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kinds: vec![kind],
        }
    }

    pub fn with_kinds(name: impl Into<String>, kinds: Vec<FieldKind>) -> Self {
        Self {
            name: name.into(),
            kinds,
        }
    }
}

/// Static registration of one index: alias, object-kind scope and the fields
/// the engine is told to accept. Created at startup, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub alias: String,
    pub object_kind: ObjectKind,
    pub fields: Vec<FieldDefinition>,
}

impl IndexDefinition {
    pub fn new(alias: impl Into<String>, object_kind: ObjectKind) -> Self {
        Self {
            alias: alias.into(),
            object_kind,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Index health as reported through metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Rebuilding,
    Unavailable,
}

/// Metadata for one registered index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub document_count: u64,
    pub health: HealthStatus,
}
