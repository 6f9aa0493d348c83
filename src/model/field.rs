//! Typed field value containers shared by the pipeline and the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Variation;

/// Union of typed value arrays for a single index field.
///
/// Text comes in three relevance tiers (`texts_r1` is weighted highest, e.g.
/// headings) plus one unweighted tier. Keywords are exact-match tokens. An
/// empty `FieldValue` is invalid and must not be emitted by extractors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub texts_r1: Vec<String>,
    pub texts_r2: Vec<String>,
    pub texts_r3: Vec<String>,
    pub texts: Vec<String>,
    pub keywords: Vec<String>,
    pub integers: Vec<i64>,
    pub decimals: Vec<f64>,
    pub timestamps: Vec<DateTime<Utc>>,
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        self.texts_r1.is_empty()
            && self.texts_r2.is_empty()
            && self.texts_r3.is_empty()
            && self.texts.is_empty()
            && self.keywords.is_empty()
            && self.integers.is_empty()
            && self.decimals.is_empty()
            && self.timestamps.is_empty()
    }

    pub fn texts(texts: Vec<String>) -> Self {
        Self {
            texts,
            ..Default::default()
        }
    }

    pub fn keywords(keywords: Vec<String>) -> Self {
        Self {
            keywords,
            ..Default::default()
        }
    }

    pub fn integers(integers: Vec<i64>) -> Self {
        Self {
            integers,
            ..Default::default()
        }
    }

    pub fn decimals(decimals: Vec<f64>) -> Self {
        Self {
            decimals,
            ..Default::default()
        }
    }

    pub fn timestamps(timestamps: Vec<DateTime<Utc>>) -> Self {
        Self {
            timestamps,
            ..Default::default()
        }
    }
}

/// A named, optionally variation-scoped value on a document.
///
/// A field whose culture/segment is `None` applies to every variation of the
/// owning document; an explicit culture/segment applies only to the matching
/// variation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexField {
    pub name: String,
    pub value: FieldValue,
    pub culture: Option<String>,
    pub segment: Option<String>,
}

impl IndexField {
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
            culture: None,
            segment: None,
        }
    }

    pub fn with_variation(
        mut self,
        culture: Option<String>,
        segment: Option<String>,
    ) -> Self {
        self.culture = culture;
        self.segment = segment;
        self
    }

    /// Whether this field applies to the given variation
    pub fn applies_to(&self, variation: &Variation) -> bool {
        (self.culture.is_none() && self.segment.is_none())
            || variation.matches(self.culture.as_deref(), self.segment.as_deref())
    }
}
