//! Field collection across a node's routable variation set

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::content::ContentNode;
use crate::extract::ExtractorRegistry;
use crate::model::{FieldValue, IndexField, Variation};

/// Reserved field carrying the node name at the highest text tier
pub const NAME_FIELD: &str = "name";

/// Gathers index fields for a node across its routable variations
pub struct FieldCollector {
    registry: Arc<ExtractorRegistry>,
}

impl FieldCollector {
    pub fn new(registry: Arc<ExtractorRegistry>) -> Self {
        Self { registry }
    }

    /// Collect fields for `node`, restricted to the given variation set.
    ///
    /// Fields whose explicit (culture, segment) does not correspond to a
    /// still-routable variation are dropped: a value can be present on a
    /// variant that lost routability through an ancestor.
    pub fn collect(
        &self,
        node: &ContentNode,
        variations: &BTreeSet<Variation>,
        published: bool,
    ) -> Vec<IndexField> {
        let mut fields = vec![IndexField::new(
            NAME_FIELD,
            FieldValue {
                texts_r1: vec![node.name.clone()],
                ..Default::default()
            },
        )];

        // Extraction runs per distinct pair, invariant values included
        let mut pairs: BTreeSet<(Option<String>, Option<String>)> =
            std::iter::once((None, None)).collect();
        for variation in variations {
            pairs.insert((variation.culture.clone(), variation.segment.clone()));
        }

        for property in &node.properties {
            let Some(extractor) = self.registry.find(&property.editor) else {
                debug!(
                    alias = %property.alias,
                    editor = %property.editor,
                    "no extractor for editor, property skipped"
                );
                continue;
            };

            for (culture, segment) in &pairs {
                let extracted = extractor.extract(
                    property,
                    culture.as_deref(),
                    segment.as_deref(),
                    published,
                );
                fields.extend(
                    extracted
                        .into_iter()
                        .filter(|field| !field.value.is_empty()),
                );
            }
        }

        // Drop fields addressing variations that are no longer routable
        fields.retain(|field| {
            (field.culture.is_none() && field.segment.is_none())
                || variations
                    .iter()
                    .any(|v| v.matches(field.culture.as_deref(), field.segment.as_deref()))
        });

        fields
    }
}
