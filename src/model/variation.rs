//! Culture/segment variation pairs

use serde::{Deserialize, Serialize};

/// One independently-routable rendering of a content node.
///
/// A `None` culture means the node does not vary by culture; same for segment.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Variation {
    pub culture: Option<String>,
    pub segment: Option<String>,
}

impl Variation {
    /// The invariant variation (no culture, no segment)
    pub fn invariant() -> Self {
        Self::default()
    }

    /// A culture-only variation
    pub fn culture(culture: impl Into<String>) -> Self {
        Self {
            culture: Some(culture.into()),
            segment: None,
        }
    }

    pub fn new(culture: Option<String>, segment: Option<String>) -> Self {
        Self { culture, segment }
    }

    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }

    /// Whether this variation matches the given culture/segment pair
    pub fn matches(&self, culture: Option<&str>, segment: Option<&str>) -> bool {
        self.culture.as_deref() == culture && self.segment.as_deref() == segment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_invariant_matches_null_pair() {
        let variation = Variation::invariant();
        assert!(variation.matches(None, None));
        assert!(!variation.matches(Some("en-us"), None));
    }

    #[test]
    fn test_set_membership_is_order_independent() {
        let mut a = BTreeSet::new();
        a.insert(Variation::culture("en-us"));
        a.insert(Variation::culture("da-dk"));

        let mut b = BTreeSet::new();
        b.insert(Variation::culture("da-dk"));
        b.insert(Variation::culture("en-us"));

        assert_eq!(a, b);
    }
}
