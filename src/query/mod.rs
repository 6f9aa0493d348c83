//! Engine-agnostic query model
//!
//! Filters, facets and sorters are expressed over logical field names only;
//! engine-specific naming conventions never leak to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::model::{AccessContext, ObjectKind};

/// A single closed or half-open `[min, max]` interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> NumericRange<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn between(min: T, max: T) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

/// A labelled range bucket for range facets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeBucket<T> {
    pub key: String,
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> RangeBucket<T> {
    pub fn new(key: impl Into<String>, min: Option<T>, max: Option<T>) -> Self {
        Self {
            key: key.into(),
            min,
            max,
        }
    }
}

/// Filter variants over logical field names.
///
/// Match-any semantics within one filter: a document matches when any of the
/// filter's values (or intervals) match. Negation applies to the combined
/// result, so multi-interval range filters are OR-combined before negation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    Keyword {
        field: String,
        values: Vec<String>,
        negate: bool,
    },
    /// Token-prefix match against the field's analyzed text: a value matches
    /// when some token of the field starts with it. Not a substring match.
    Text {
        field: String,
        values: Vec<String>,
        negate: bool,
    },
    IntegerExact {
        field: String,
        values: Vec<i64>,
        negate: bool,
    },
    IntegerRange {
        field: String,
        ranges: Vec<NumericRange<i64>>,
        negate: bool,
    },
    DecimalExact {
        field: String,
        values: Vec<f64>,
        negate: bool,
    },
    DecimalRange {
        field: String,
        ranges: Vec<NumericRange<f64>>,
        negate: bool,
    },
    DateTimeExact {
        field: String,
        values: Vec<DateTime<Utc>>,
        negate: bool,
    },
    DateTimeRange {
        field: String,
        ranges: Vec<NumericRange<DateTime<Utc>>>,
        negate: bool,
    },
}

impl Filter {
    pub fn field(&self) -> &str {
        match self {
            Filter::Keyword { field, .. }
            | Filter::Text { field, .. }
            | Filter::IntegerExact { field, .. }
            | Filter::IntegerRange { field, .. }
            | Filter::DecimalExact { field, .. }
            | Filter::DecimalRange { field, .. }
            | Filter::DateTimeExact { field, .. }
            | Filter::DateTimeRange { field, .. } => field,
        }
    }

    pub fn keyword(field: impl Into<String>, values: Vec<String>) -> Self {
        Filter::Keyword {
            field: field.into(),
            values,
            negate: false,
        }
    }

    pub fn integer_range(field: impl Into<String>, ranges: Vec<NumericRange<i64>>) -> Self {
        Filter::IntegerRange {
            field: field.into(),
            ranges,
            negate: false,
        }
    }
}

/// Facet variants mirroring the filter value kinds, computing counts only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FacetSpec {
    Keyword {
        field: String,
    },
    IntegerExact {
        field: String,
    },
    DecimalExact {
        field: String,
    },
    DateTimeExact {
        field: String,
    },
    IntegerRange {
        field: String,
        ranges: Vec<RangeBucket<i64>>,
    },
    DecimalRange {
        field: String,
        ranges: Vec<RangeBucket<f64>>,
    },
    DateTimeRange {
        field: String,
        ranges: Vec<RangeBucket<DateTime<Utc>>>,
    },
}

impl FacetSpec {
    pub fn field(&self) -> &str {
        match self {
            FacetSpec::Keyword { field }
            | FacetSpec::IntegerExact { field }
            | FacetSpec::DecimalExact { field }
            | FacetSpec::DateTimeExact { field }
            | FacetSpec::IntegerRange { field, .. }
            | FacetSpec::DecimalRange { field, .. }
            | FacetSpec::DateTimeRange { field, .. } => field,
        }
    }
}

/// Merge facets requested more than once for the same field.
///
/// Engines that key aggregation state by field would otherwise silently let
/// the last request win; range definitions are concatenated instead
/// (first occurrence of each bucket key is kept).
pub fn merge_facets(facets: &[FacetSpec]) -> Vec<FacetSpec> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, FacetSpec> = HashMap::new();

    for facet in facets {
        let field = facet.field().to_string();
        match merged.get_mut(&field) {
            None => {
                order.push(field.clone());
                merged.insert(field, facet.clone());
            }
            Some(existing) => match (existing, facet) {
                (
                    FacetSpec::IntegerRange { ranges, .. },
                    FacetSpec::IntegerRange { ranges: more, .. },
                ) => {
                    for bucket in more {
                        if !ranges.iter().any(|r| r.key == bucket.key) {
                            ranges.push(bucket.clone());
                        }
                    }
                }
                (
                    FacetSpec::DecimalRange { ranges, .. },
                    FacetSpec::DecimalRange { ranges: more, .. },
                ) => {
                    for bucket in more {
                        if !ranges.iter().any(|r| r.key == bucket.key) {
                            ranges.push(bucket.clone());
                        }
                    }
                }
                (
                    FacetSpec::DateTimeRange { ranges, .. },
                    FacetSpec::DateTimeRange { ranges: more, .. },
                ) => {
                    for bucket in more {
                        if !ranges.iter().any(|r| r.key == bucket.key) {
                            ranges.push(bucket.clone());
                        }
                    }
                }
                // Exact facets for the same field collapse to one
                _ => {}
            },
        }
    }

    order
        .into_iter()
        .filter_map(|field| merged.remove(&field))
        .collect()
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

/// What to sort by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    /// Relevance score; only meaningful combined with query text
    Score,
    Text(String),
    Keyword(String),
    Integer(String),
    Decimal(String),
    DateTime(String),
}

/// One sort criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sorter {
    pub field: SortField,
    pub direction: Direction,
}

impl Sorter {
    pub fn score() -> Self {
        Self {
            field: SortField::Score,
            direction: Direction::Descending,
        }
    }

    pub fn by(field: SortField, direction: Direction) -> Self {
        Self { field, direction }
    }
}

/// An engine-agnostic search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query_text: Option<String>,
    pub filters: Vec<Filter>,
    pub facets: Vec<FacetSpec>,
    pub sorters: Vec<Sorter>,
    /// Requested culture; `None` matches documents without culture variance
    pub culture: Option<String>,
    /// Requested segment; `None` matches the default segment
    pub segment: Option<String>,
    /// Requesting principal; omission means "unprotected documents only"
    pub access: Option<AccessContext>,
    pub skip: usize,
    pub take: usize,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self {
            query_text: None,
            filters: Vec::new(),
            facets: Vec::new(),
            sorters: Vec::new(),
            culture: None,
            segment: None,
            access: None,
            skip: 0,
            take: 20,
        }
    }

    pub fn with_query_text(mut self, text: impl Into<String>) -> Self {
        self.query_text = Some(text.into());
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_facet(mut self, facet: FacetSpec) -> Self {
        self.facets.push(facet);
        self
    }

    pub fn with_sorter(mut self, sorter: Sorter) -> Self {
        self.sorters.push(sorter);
        self
    }

    pub fn with_culture(mut self, culture: impl Into<String>) -> Self {
        self.culture = Some(culture.into());
        self
    }

    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }

    pub fn with_access(mut self, access: AccessContext) -> Self {
        self.access = Some(access);
        self
    }

    pub fn with_paging(mut self, skip: usize, take: usize) -> Self {
        self.skip = skip;
        self.take = take;
        self
    }
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// One matching document reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub key: Uuid,
    pub object_kind: ObjectKind,
    pub culture: Option<String>,
    pub segment: Option<String>,
    pub score: f32,
}

/// Count for one facet value or range bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetValue {
    pub key: String,
    pub count: u64,
}

/// Aggregated counts for one faceted field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetResult {
    pub field: String,
    pub values: Vec<FacetValue>,
}

/// Search response with hits, total and facet aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total: usize,
    pub hits: Vec<SearchHit>,
    pub facets: Vec<FacetResult>,
}
