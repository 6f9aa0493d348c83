//! Routable-variation resolution
//!
//! Computes, for a content node, the set of (culture, segment) pairs that are
//! currently routable given the node's own published state and its ancestor
//! chain. An unpublished or unresolvable ancestor blocks all descendants.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::content::{ContentNode, ContentStore};
use crate::model::Variation;

/// Resolves the routable variation set for content nodes
pub struct VariationResolver {
    content: Arc<dyn ContentStore>,
}

impl VariationResolver {
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        Self { content }
    }

    /// The set of variations currently routable for `node`.
    ///
    /// Never fails: an ancestor that cannot be resolved is treated as
    /// unpublished, so a node with broken ancestry yields the empty set
    /// rather than ending up indexed.
    pub async fn resolve(&self, node: &ContentNode) -> BTreeSet<Variation> {
        if !node.published || node.trashed {
            return BTreeSet::new();
        }

        let cultures = match self.surviving_cultures(node).await {
            Some(cultures) if !cultures.is_empty() => cultures,
            _ => return BTreeSet::new(),
        };

        self.expand_segments(node, cultures)
    }

    /// Candidate cultures after intersecting with the whole ancestor chain,
    /// or `None` when an ancestor blocks routing entirely.
    async fn surviving_cultures(&self, node: &ContentNode) -> Option<BTreeSet<Option<String>>> {
        let mut candidates: BTreeSet<Option<String>> = if node.vary_by_culture {
            node.published_cultures
                .iter()
                .map(|c| Some(c.clone()))
                .collect()
        } else {
            std::iter::once(None).collect()
        };

        let mut current = node.parent;
        while let Some(parent_key) = current {
            let ancestor = match self.lookup(&parent_key).await {
                Some(ancestor) => ancestor,
                None => {
                    warn!(
                        key = %node.key,
                        ancestor = %parent_key,
                        "ancestor could not be resolved, treating node as unroutable"
                    );
                    return None;
                }
            };

            if !ancestor.published || ancestor.trashed {
                return None;
            }

            // A culture is only routable if published all the way up the tree
            if node.vary_by_culture && ancestor.vary_by_culture {
                candidates.retain(|culture| match culture {
                    Some(c) => ancestor.published_cultures.iter().any(|pc| pc == c),
                    None => true,
                });
                if candidates.is_empty() {
                    return None;
                }
            }

            current = ancestor.parent;
        }

        Some(candidates)
    }

    async fn lookup(&self, key: &Uuid) -> Option<ContentNode> {
        match self.content.get(key).await {
            Ok(found) => found,
            Err(error) => {
                warn!(key = %key, error = %error, "ancestor lookup failed");
                None
            }
        }
    }

    /// Segments are not independently publishable; they are discovered
    /// empirically from the node's own stored property values.
    fn expand_segments(
        &self,
        node: &ContentNode,
        cultures: BTreeSet<Option<String>>,
    ) -> BTreeSet<Variation> {
        if !node.varies_by_segment() {
            return cultures
                .into_iter()
                .map(|culture| Variation::new(culture, None))
                .collect();
        }

        let mut variations = BTreeSet::new();
        for culture in cultures {
            // The null segment always routes; discovered segments add to it
            variations.insert(Variation::new(culture.clone(), None));

            for property in &node.properties {
                for value in &property.values {
                    if value.culture == culture {
                        if let Some(segment) = &value.segment {
                            variations
                                .insert(Variation::new(culture.clone(), Some(segment.clone())));
                        }
                    }
                }
            }
        }
        variations
    }
}
