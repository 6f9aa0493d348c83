//! The document unit stored per index

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{IndexError, Result};
use crate::model::{IndexField, Variation};

/// The kind of content object an index is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Document,
    Media,
    Member,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectKind::Document => "document",
            ObjectKind::Media => "media",
            ObjectKind::Member => "member",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ObjectKind {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "document" => Ok(ObjectKind::Document),
            "media" => Ok(ObjectKind::Media),
            "member" => Ok(ObjectKind::Member),
            other => Err(IndexError::Serialization(format!(
                "unknown object kind '{}'",
                other
            ))),
        }
    }
}

/// Access-protection descriptor attached to a protected document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Protection {
    pub principals: Vec<Uuid>,
    pub groups: Vec<Uuid>,
}

/// The requesting principal on the read side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessContext {
    pub principal: Uuid,
    pub groups: Vec<Uuid>,
}

impl AccessContext {
    pub fn new(principal: Uuid) -> Self {
        Self {
            principal,
            groups: Vec::new(),
        }
    }

    pub fn with_groups(mut self, groups: Vec<Uuid>) -> Self {
        self.groups = groups;
        self
    }
}

/// The unit stored per index: one logical content node with all of its
/// currently-routable variations and their fields.
///
/// Invariant: every field's (culture, segment) either is (None, None) or
/// exactly matches one member of `variations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub key: Uuid,
    pub object_kind: ObjectKind,
    /// Ancestor keys from root down to (and including) this node
    pub path: Vec<Uuid>,
    pub variations: Vec<Variation>,
    pub fields: Vec<IndexField>,
    pub protection: Option<Protection>,
}

impl IndexDocument {
    /// Verify the document/variation invariant
    pub fn validate(&self) -> Result<()> {
        if self.variations.is_empty() {
            return Err(IndexError::InvalidDocument(format!(
                "document {} has no variations",
                self.key
            )));
        }
        if self.path.last() != Some(&self.key) {
            return Err(IndexError::InvalidDocument(format!(
                "document {} path does not end at its own key",
                self.key
            )));
        }
        for field in &self.fields {
            if field.value.is_empty() {
                return Err(IndexError::InvalidDocument(format!(
                    "document {} field '{}' has an empty value",
                    self.key, field.name
                )));
            }
            if !self.variations.iter().any(|v| field.applies_to(v)) {
                return Err(IndexError::InvalidDocument(format!(
                    "document {} field '{}' targets variation ({:?}, {:?}) which is not routable",
                    self.key, field.name, field.culture, field.segment
                )));
            }
        }
        Ok(())
    }
}
