//! Change events and the variation change stamp

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::error::Result;
use crate::model::Variation;

/// How a content change affects the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeImpact {
    /// Reindex the node itself
    Refresh,
    /// Reindex the node and everything below it
    RefreshWithDescendants,
    /// Remove the node (and, per the indexer contract, its descendants)
    Remove,
}

/// A single deduplicated change notification from the host content system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentChange {
    pub key: Uuid,
    pub impact: ChangeImpact,
    pub publish_state_affected: bool,
}

impl ContentChange {
    pub fn refresh(key: Uuid) -> Self {
        Self {
            key,
            impact: ChangeImpact::Refresh,
            publish_state_affected: false,
        }
    }

    pub fn refresh_with_descendants(key: Uuid) -> Self {
        Self {
            key,
            impact: ChangeImpact::RefreshWithDescendants,
            publish_state_affected: false,
        }
    }

    pub fn remove(key: Uuid) -> Self {
        Self {
            key,
            impact: ChangeImpact::Remove,
            publish_state_affected: true,
        }
    }
}

/// Opaque fingerprint of the variation set last written for a key.
///
/// Callers never interpret the encoding; comparison happens structurally on
/// the decoded set, so two stamps over the same variations always agree
/// regardless of the order they were produced in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStamp(Vec<u8>);

impl ChangeStamp {
    pub fn from_variations(variations: &BTreeSet<Variation>) -> Result<Self> {
        // BTreeSet iteration is sorted, so the encoding is canonical
        let ordered: Vec<&Variation> = variations.iter().collect();
        Ok(Self(bincode::serialize(&ordered)?))
    }

    /// Decode the variation set this stamp was written for
    pub fn variations(&self) -> Result<BTreeSet<Variation>> {
        let ordered: Vec<Variation> = bincode::deserialize(&self.0)?;
        Ok(ordered.into_iter().collect())
    }

    /// Structural comparison against a freshly computed variation set
    pub fn covers(&self, variations: &BTreeSet<Variation>) -> bool {
        match self.variations() {
            Ok(decoded) => &decoded == variations,
            // An undecodable stamp must never suppress a cascade
            Err(_) => false,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}
