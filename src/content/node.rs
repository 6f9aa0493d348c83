//! Content node shape as seen by the indexing core

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{ObjectKind, Protection};

/// A single stored property value, scoped to a (culture, segment) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub culture: Option<String>,
    pub segment: Option<String>,
    /// Whether this value belongs to the published version of the node
    pub published: bool,
    pub value: String,
}

impl PropertyValue {
    pub fn invariant(value: impl Into<String>) -> Self {
        Self {
            culture: None,
            segment: None,
            published: true,
            value: value.into(),
        }
    }

    pub fn for_culture(culture: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            culture: Some(culture.into()),
            segment: None,
            published: true,
            value: value.into(),
        }
    }

    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }
}

/// A content property: an alias, the editor discriminator that decides which
/// extractor handles it, and its stored values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub alias: String,
    pub editor: String,
    pub values: Vec<PropertyValue>,
}

impl Property {
    pub fn new(alias: impl Into<String>, editor: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            editor: editor.into(),
            values: Vec::new(),
        }
    }

    pub fn with_values(mut self, values: Vec<PropertyValue>) -> Self {
        self.values = values;
        self
    }
}

/// A content node as the pipeline sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    pub key: Uuid,
    pub parent: Option<Uuid>,
    /// Slash-separated key path from root to this node, e.g. `/a/b/c`.
    /// Lexicographic ordering of paths puts every ancestor before its
    /// descendants, which is what cascades rely on.
    pub path: String,
    pub name: String,
    pub object_kind: ObjectKind,
    pub published: bool,
    pub trashed: bool,
    pub vary_by_culture: bool,
    /// Cultures this node is published in (meaningful when `vary_by_culture`)
    pub published_cultures: Vec<String>,
    pub properties: Vec<Property>,
    pub protection: Option<Protection>,
}

impl ContentNode {
    /// Keys along the path, root first
    pub fn path_keys(&self) -> Vec<Uuid> {
        self.path
            .split('/')
            .filter(|s| !s.is_empty())
            .filter_map(|s| Uuid::parse_str(s).ok())
            .collect()
    }

    /// Whether any stored property value carries a segment tag
    pub fn varies_by_segment(&self) -> bool {
        self.properties
            .iter()
            .any(|p| p.values.iter().any(|v| v.segment.is_some()))
    }
}

/// Builder used by hosts and tests to assemble nodes
pub struct ContentNodeBuilder {
    node: ContentNode,
}

impl ContentNodeBuilder {
    pub fn new(key: Uuid, name: impl Into<String>) -> Self {
        Self {
            node: ContentNode {
                key,
                parent: None,
                path: format!("/{}", key),
                name: name.into(),
                object_kind: ObjectKind::Document,
                published: true,
                trashed: false,
                vary_by_culture: false,
                published_cultures: Vec::new(),
                properties: Vec::new(),
                protection: None,
            },
        }
    }

    pub fn under(mut self, parent: &ContentNode) -> Self {
        self.node.parent = Some(parent.key);
        self.node.path = format!("{}/{}", parent.path, self.node.key);
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.node.published = false;
        self
    }

    pub fn trashed(mut self) -> Self {
        self.node.trashed = true;
        self
    }

    pub fn cultures(mut self, cultures: &[&str]) -> Self {
        self.node.vary_by_culture = true;
        self.node.published_cultures = cultures.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn property(mut self, property: Property) -> Self {
        self.node.properties.push(property);
        self
    }

    pub fn protection(mut self, protection: Protection) -> Self {
        self.node.protection = Some(protection);
        self
    }

    pub fn build(self) -> ContentNode {
        self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_keys_follow_the_builder_chain() {
        let root = ContentNodeBuilder::new(Uuid::new_v4(), "root").build();
        let child = ContentNodeBuilder::new(Uuid::new_v4(), "child")
            .under(&root)
            .build();

        assert_eq!(child.path_keys(), vec![root.key, child.key]);
        assert!(child.path.starts_with(&root.path));
    }

    #[test]
    fn test_segment_variance_is_discovered_from_values() {
        let key = Uuid::new_v4();
        let plain = ContentNodeBuilder::new(key, "plain")
            .property(
                Property::new("title", "textbox")
                    .with_values(vec![PropertyValue::invariant("hello")]),
            )
            .build();
        assert!(!plain.varies_by_segment());

        let segmented = ContentNodeBuilder::new(key, "segmented")
            .property(Property::new("title", "textbox").with_values(vec![
                PropertyValue::invariant("hello"),
                PropertyValue::invariant("hi").with_segment("mobile"),
            ]))
            .build();
        assert!(segmented.varies_by_segment());
    }
}
