//! Field extraction from content properties
//!
//! Per-editor extraction logic lives behind [`FieldExtractor`] capability
//! objects selected by the property's editor discriminator. Custom
//! registrations take priority over built-ins; within each group the first
//! extractor claiming an editor wins.

mod builtin;
mod collector;

pub use builtin::{
    DateTimeExtractor, DecimalExtractor, IntegerExtractor, RichTextExtractor, TagsExtractor,
    TextExtractor,
};
pub use collector::FieldCollector;

use std::sync::Arc;

use crate::content::Property;
use crate::model::IndexField;

/// Maps one content property (for one variation) to zero or more fields
pub trait FieldExtractor: Send + Sync {
    /// Whether this extractor handles the given editor discriminator
    fn supports(&self, editor: &str) -> bool;

    /// Extract fields for the property values matching the given variation.
    ///
    /// When `published` is set, only values belonging to the published version
    /// may be considered.
    fn extract(
        &self,
        property: &Property,
        culture: Option<&str>,
        segment: Option<&str>,
        published: bool,
    ) -> Vec<IndexField>;
}

/// Registry of extractors, custom registrations first
pub struct ExtractorRegistry {
    custom: Vec<Arc<dyn FieldExtractor>>,
    built_in: Vec<Arc<dyn FieldExtractor>>,
}

impl ExtractorRegistry {
    /// An empty registry with no extractors at all
    pub fn empty() -> Self {
        Self {
            custom: Vec::new(),
            built_in: Vec::new(),
        }
    }

    /// A registry with the built-in extractor set
    pub fn with_defaults() -> Self {
        Self {
            custom: Vec::new(),
            built_in: vec![
                Arc::new(TextExtractor),
                Arc::new(RichTextExtractor),
                Arc::new(TagsExtractor),
                Arc::new(IntegerExtractor),
                Arc::new(DecimalExtractor),
                Arc::new(DateTimeExtractor),
            ],
        }
    }

    /// Register a custom extractor, taking priority over built-ins
    pub fn register(&mut self, extractor: Arc<dyn FieldExtractor>) {
        self.custom.push(extractor);
    }

    /// First-match-wins lookup for an editor discriminator
    pub fn find(&self, editor: &str) -> Option<&Arc<dyn FieldExtractor>> {
        self.custom
            .iter()
            .chain(self.built_in.iter())
            .find(|extractor| extractor.supports(editor))
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
