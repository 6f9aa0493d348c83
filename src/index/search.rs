//! Translation of the engine-agnostic query model into tantivy queries
//!
//! Variation and protection scoping are mandatory clauses added to every
//! query; a request can narrow them but never opt out.

use std::ops::Bound;
use tantivy::collector::{Count, FacetCollector, TopDocs};
use tantivy::query::{
    AllQuery, BooleanQuery, FuzzyTermQuery, Occur, Query, QueryParser, RangeQuery, TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{Order, Searcher, TantivyDocument, Term};
use tracing::debug;
use uuid::Uuid;

use crate::error::{IndexError, Result};
use crate::index::engine::IndexHandle;
use crate::index::schema::{FieldColumns, IndexSchema, F_FACETS, SENTINEL_NONE};
use crate::index::FieldKind;
use crate::model::ObjectKind;
use crate::query::{
    merge_facets, Direction, FacetResult, FacetSpec, FacetValue, Filter, NumericRange,
    RangeBucket, SearchHit, SearchRequest, SearchResponse, SortField, Sorter,
};

pub(crate) fn execute(
    handle: &IndexHandle,
    request: &SearchRequest,
    max_results: usize,
) -> Result<SearchResponse> {
    let searcher = handle.reader.searcher();
    let query = build_query(handle, request, None)?;

    let total = searcher.search(&*query, &Count)?;
    let hits = collect_hits(handle, &searcher, &*query, request, max_results)?;
    let facets = compute_facets(handle, &searcher, request)?;

    Ok(SearchResponse {
        total,
        hits,
        facets,
    })
}

fn columns_for<'a>(schema: &'a IndexSchema, field: &str) -> Result<&'a FieldColumns> {
    schema.columns(field).ok_or_else(|| IndexError::UnknownField {
        field: field.to_string(),
    })
}

fn expected_kinds(columns: &FieldColumns) -> String {
    columns
        .kinds
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

/// Resolve the engine column for a (field, kind) pair; `UnknownField` when
/// the field was never declared, `FieldKindMismatch` when the kind was not
fn engine_column(schema: &IndexSchema, field: &str, kind: FieldKind) -> Result<Field> {
    let columns = columns_for(schema, field)?;
    columns
        .column(kind)
        .ok_or_else(|| IndexError::FieldKindMismatch {
            field: field.to_string(),
            expected: expected_kinds(columns),
            requested: kind.to_string(),
        })
}

fn engine_datetime(value: &chrono::DateTime<chrono::Utc>) -> tantivy::DateTime {
    tantivy::DateTime::from_timestamp_secs(value.timestamp())
}

fn included<T, U>(value: &Option<T>, convert: impl Fn(&T) -> U) -> Bound<U> {
    match value {
        Some(v) => Bound::Included(convert(v)),
        None => Bound::Unbounded,
    }
}

/// OR of exact term matches
fn any_term(terms: impl IntoIterator<Item = Term>) -> Box<dyn Query> {
    let clauses: Vec<(Occur, Box<dyn Query>)> = terms
        .into_iter()
        .map(|term| {
            (
                Occur::Should,
                Box::new(TermQuery::new(term, IndexRecordOption::Basic)) as Box<dyn Query>,
            )
        })
        .collect();
    Box::new(BooleanQuery::new(clauses))
}

fn any_text_term(field: Field, values: &[String]) -> Box<dyn Query> {
    any_term(values.iter().map(|v| Term::from_field_text(field, v)))
}

/// Mandatory variance clause: the requested value or the invariant sentinel
fn variance_clause(field: Field, requested: Option<&str>) -> Box<dyn Query> {
    let mut values = Vec::new();
    if let Some(v) = requested {
        values.push(v.to_string());
    }
    values.push(SENTINEL_NONE.to_string());
    any_text_term(field, &values)
}

/// Mandatory protection clause: unprotected documents plus whatever the
/// requesting principal and its groups unlock
fn protection_clause(schema: &IndexSchema, request: &SearchRequest) -> Box<dyn Query> {
    let mut values = vec![SENTINEL_NONE.to_string()];
    if let Some(access) = &request.access {
        values.push(format!("p:{}", access.principal));
        for group in &access.groups {
            values.push(format!("g:{}", group));
        }
    }
    any_text_term(schema.protection, &values)
}

/// Build the full query for a request. `exclude_field` drops every filter on
/// that field, which is how the two-phase facet evaluation widens counts.
fn build_query(
    handle: &IndexHandle,
    request: &SearchRequest,
    exclude_field: Option<&str>,
) -> Result<Box<dyn Query>> {
    let schema = &handle.schema;
    let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

    if let Some(text) = request.query_text.as_deref() {
        if !text.trim().is_empty() {
            let tiers = schema.all_text_tiers();
            if !tiers.is_empty() {
                let mut parser = QueryParser::for_index(
                    &handle.index,
                    tiers.iter().map(|(field, _)| *field).collect(),
                );
                for (field, boost) in &tiers {
                    parser.set_field_boost(*field, *boost);
                }
                clauses.push((Occur::Must, parser.parse_query(text)?));
            }
        }
    }

    clauses.push((
        Occur::Must,
        variance_clause(schema.culture, request.culture.as_deref()),
    ));
    clauses.push((
        Occur::Must,
        variance_clause(schema.segment, request.segment.as_deref()),
    ));
    clauses.push((Occur::Must, protection_clause(schema, request)));

    for filter in &request.filters {
        if exclude_field == Some(filter.field()) {
            continue;
        }
        let (positive, negate) = filter_query(schema, filter)?;
        if negate {
            // Negation over the whole filter, after its values are OR-combined
            clauses.push((
                Occur::Must,
                Box::new(BooleanQuery::new(vec![
                    (Occur::Must, Box::new(AllQuery) as Box<dyn Query>),
                    (Occur::MustNot, positive),
                ])),
            ));
        } else {
            clauses.push((Occur::Must, positive));
        }
    }

    if clauses.is_empty() {
        return Ok(Box::new(AllQuery));
    }
    Ok(Box::new(BooleanQuery::new(clauses)))
}

/// Positive (un-negated) query for one filter, plus its negate flag
fn filter_query(schema: &IndexSchema, filter: &Filter) -> Result<(Box<dyn Query>, bool)> {
    match filter {
        Filter::Keyword {
            field,
            values,
            negate,
        } => {
            let column = engine_column(schema, field, FieldKind::Keyword)?;
            Ok((any_text_term(column, values), *negate))
        }
        Filter::Text {
            field,
            values,
            negate,
        } => {
            let columns = columns_for(schema, field)?;
            if !columns.has_kind(FieldKind::Text) {
                return Err(IndexError::FieldKindMismatch {
                    field: field.to_string(),
                    expected: expected_kinds(columns),
                    requested: FieldKind::Text.to_string(),
                });
            }
            // Token prefix match across all tiers of the field
            let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
            for (tier, _) in columns.text_tiers() {
                for value in values {
                    let term = Term::from_field_text(tier, &value.to_lowercase());
                    clauses.push((
                        Occur::Should,
                        Box::new(FuzzyTermQuery::new_prefix(term, 0, false)),
                    ));
                }
            }
            Ok((Box::new(BooleanQuery::new(clauses)), *negate))
        }
        Filter::IntegerExact {
            field,
            values,
            negate,
        } => {
            let column = engine_column(schema, field, FieldKind::Integer)?;
            Ok((
                any_term(values.iter().map(|v| Term::from_field_i64(column, *v))),
                *negate,
            ))
        }
        Filter::IntegerRange {
            field,
            ranges,
            negate,
        } => {
            engine_column(schema, field, FieldKind::Integer)?;
            let name = IndexSchema::column_name(field, FieldKind::Integer);
            Ok((
                any_range(ranges, |range| {
                    Box::new(RangeQuery::new_i64_bounds(
                        name.clone(),
                        included(&range.min, |v| *v),
                        included(&range.max, |v| *v),
                    ))
                }),
                *negate,
            ))
        }
        Filter::DecimalExact {
            field,
            values,
            negate,
        } => {
            let column = engine_column(schema, field, FieldKind::Decimal)?;
            Ok((
                any_term(values.iter().map(|v| Term::from_field_f64(column, *v))),
                *negate,
            ))
        }
        Filter::DecimalRange {
            field,
            ranges,
            negate,
        } => {
            engine_column(schema, field, FieldKind::Decimal)?;
            let name = IndexSchema::column_name(field, FieldKind::Decimal);
            Ok((
                any_range(ranges, |range| {
                    Box::new(RangeQuery::new_f64_bounds(
                        name.clone(),
                        included(&range.min, |v| *v),
                        included(&range.max, |v| *v),
                    ))
                }),
                *negate,
            ))
        }
        Filter::DateTimeExact {
            field,
            values,
            negate,
        } => {
            let column = engine_column(schema, field, FieldKind::DateTime)?;
            Ok((
                any_term(
                    values
                        .iter()
                        .map(|v| Term::from_field_date(column, engine_datetime(v))),
                ),
                *negate,
            ))
        }
        Filter::DateTimeRange {
            field,
            ranges,
            negate,
        } => {
            engine_column(schema, field, FieldKind::DateTime)?;
            let name = IndexSchema::column_name(field, FieldKind::DateTime);
            Ok((
                any_range(ranges, |range| {
                    Box::new(RangeQuery::new_date_bounds(
                        name.clone(),
                        included(&range.min, engine_datetime),
                        included(&range.max, engine_datetime),
                    ))
                }),
                *negate,
            ))
        }
    }
}

/// OR of the filter's intervals; disjoint intervals stay disjoint
fn any_range<T>(
    ranges: &[NumericRange<T>],
    build: impl Fn(&NumericRange<T>) -> Box<dyn Query>,
) -> Box<dyn Query> {
    let clauses: Vec<(Occur, Box<dyn Query>)> = ranges
        .iter()
        .map(|range| (Occur::Should, build(range)))
        .collect();
    Box::new(BooleanQuery::new(clauses))
}

fn collect_hits(
    handle: &IndexHandle,
    searcher: &Searcher,
    query: &dyn Query,
    request: &SearchRequest,
    max_results: usize,
) -> Result<Vec<SearchHit>> {
    if request.take == 0 {
        return Ok(Vec::new());
    }
    let schema = &handle.schema;
    let skip = request.skip;
    let take = request.take;

    if request.sorters.len() > 1 {
        debug!(count = request.sorters.len(), "only the first sorter is applied");
    }

    let sorter = request
        .sorters
        .first()
        .cloned()
        .unwrap_or_else(Sorter::score);

    match (&sorter.field, sorter.direction) {
        (SortField::Score, Direction::Descending) => {
            let top = searcher.search(query, &TopDocs::with_limit(take).and_offset(skip))?;
            top.into_iter()
                .map(|(score, addr)| {
                    let doc: TantivyDocument = searcher.doc(addr)?;
                    hit_from_doc(schema, &doc, score)
                })
                .collect()
        }
        (SortField::Score, Direction::Ascending) => {
            // Relevance ascending has no native collector; over-fetch and flip
            let mut top = searcher.search(query, &TopDocs::with_limit(max_results))?;
            top.reverse();
            top.into_iter()
                .skip(skip)
                .take(take)
                .map(|(score, addr)| {
                    let doc: TantivyDocument = searcher.doc(addr)?;
                    hit_from_doc(schema, &doc, score)
                })
                .collect()
        }
        (SortField::Integer(field), direction) => {
            engine_column(schema, field, FieldKind::Integer)?;
            let name = IndexSchema::column_name(field, FieldKind::Integer);
            let collector = TopDocs::with_limit(take)
                .and_offset(skip)
                .order_by_fast_field::<i64>(&name, engine_order(direction));
            let top = searcher.search(query, &collector)?;
            top.into_iter()
                .map(|(_, addr)| {
                    let doc: TantivyDocument = searcher.doc(addr)?;
                    hit_from_doc(schema, &doc, 0.0)
                })
                .collect()
        }
        (SortField::Decimal(field), direction) => {
            engine_column(schema, field, FieldKind::Decimal)?;
            let name = IndexSchema::column_name(field, FieldKind::Decimal);
            let collector = TopDocs::with_limit(take)
                .and_offset(skip)
                .order_by_fast_field::<f64>(&name, engine_order(direction));
            let top = searcher.search(query, &collector)?;
            top.into_iter()
                .map(|(_, addr)| {
                    let doc: TantivyDocument = searcher.doc(addr)?;
                    hit_from_doc(schema, &doc, 0.0)
                })
                .collect()
        }
        (SortField::DateTime(field), direction) => {
            engine_column(schema, field, FieldKind::DateTime)?;
            let name = IndexSchema::column_name(field, FieldKind::DateTime);
            let collector = TopDocs::with_limit(take)
                .and_offset(skip)
                .order_by_fast_field::<tantivy::DateTime>(&name, engine_order(direction));
            let top = searcher.search(query, &collector)?;
            top.into_iter()
                .map(|(_, addr)| {
                    let doc: TantivyDocument = searcher.doc(addr)?;
                    hit_from_doc(schema, &doc, 0.0)
                })
                .collect()
        }
        (SortField::Text(field), direction) => {
            let column = engine_column(schema, field, FieldKind::Text)?;
            sorted_by_stored_string(schema, searcher, query, column, direction, skip, take, max_results)
        }
        (SortField::Keyword(field), direction) => {
            let column = engine_column(schema, field, FieldKind::Keyword)?;
            sorted_by_stored_string(schema, searcher, query, column, direction, skip, take, max_results)
        }
    }
}

/// String sorting reads the stored value back; bounded by `max_results`
#[allow(clippy::too_many_arguments)]
fn sorted_by_stored_string(
    schema: &IndexSchema,
    searcher: &Searcher,
    query: &dyn Query,
    column: Field,
    direction: Direction,
    skip: usize,
    take: usize,
    max_results: usize,
) -> Result<Vec<SearchHit>> {
    let top = searcher.search(query, &TopDocs::with_limit(max_results))?;
    let mut loaded: Vec<(String, f32, TantivyDocument)> = Vec::with_capacity(top.len());
    for (score, addr) in top {
        let doc: TantivyDocument = searcher.doc(addr)?;
        let sort_key = doc
            .get_first(column)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        loaded.push((sort_key, score, doc));
    }

    loaded.sort_by(|a, b| match direction {
        Direction::Ascending => a.0.cmp(&b.0),
        Direction::Descending => b.0.cmp(&a.0),
    });

    loaded
        .into_iter()
        .skip(skip)
        .take(take)
        .map(|(_, score, doc)| hit_from_doc(schema, &doc, score))
        .collect()
}

fn engine_order(direction: Direction) -> Order {
    match direction {
        Direction::Ascending => Order::Asc,
        Direction::Descending => Order::Desc,
    }
}

fn hit_from_doc(schema: &IndexSchema, doc: &TantivyDocument, score: f32) -> Result<SearchHit> {
    let key = doc
        .get_first(schema.key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| IndexError::Engine("document missing stored key".to_string()))?;
    let key = Uuid::parse_str(key)
        .map_err(|e| IndexError::Engine(format!("stored key is not a uuid: {}", e)))?;

    let object_kind: ObjectKind = doc
        .get_first(schema.kind)
        .and_then(|v| v.as_str())
        .ok_or_else(|| IndexError::Engine("document missing stored kind".to_string()))?
        .parse()?;

    let culture = doc
        .get_first(schema.culture)
        .and_then(|v| v.as_str())
        .filter(|s| *s != SENTINEL_NONE)
        .map(String::from);
    let segment = doc
        .get_first(schema.segment)
        .and_then(|v| v.as_str())
        .filter(|s| *s != SENTINEL_NONE)
        .map(String::from);

    Ok(SearchHit {
        key,
        object_kind,
        culture,
        segment,
        score,
    })
}

fn compute_facets(
    handle: &IndexHandle,
    searcher: &Searcher,
    request: &SearchRequest,
) -> Result<Vec<FacetResult>> {
    let schema = &handle.schema;
    let mut results = Vec::new();

    for facet in merge_facets(&request.facets) {
        let field = facet.field().to_string();
        engine_column(schema, &field, facet_kind(&facet))?;

        // Two-phase: a facet on an actively filtered field is counted against
        // the query with that field's own filters removed, so sibling values
        // keep their counts
        let exclude = request
            .filters
            .iter()
            .any(|f| f.field() == field)
            .then_some(field.as_str());

        let values = match &facet {
            FacetSpec::Keyword { .. }
            | FacetSpec::IntegerExact { .. }
            | FacetSpec::DecimalExact { .. }
            | FacetSpec::DateTimeExact { .. } => {
                let query = build_query(handle, request, exclude)?;
                exact_facet_counts(searcher, &*query, &field)?
            }
            FacetSpec::IntegerRange { ranges, .. } => range_facet_counts(
                handle,
                searcher,
                request,
                exclude,
                ranges,
                |range| {
                    let name = IndexSchema::column_name(&field, FieldKind::Integer);
                    Box::new(RangeQuery::new_i64_bounds(
                        name,
                        included(&range.min, |v| *v),
                        included(&range.max, |v| *v),
                    ))
                },
            )?,
            FacetSpec::DecimalRange { ranges, .. } => range_facet_counts(
                handle,
                searcher,
                request,
                exclude,
                ranges,
                |range| {
                    let name = IndexSchema::column_name(&field, FieldKind::Decimal);
                    Box::new(RangeQuery::new_f64_bounds(
                        name,
                        included(&range.min, |v| *v),
                        included(&range.max, |v| *v),
                    ))
                },
            )?,
            FacetSpec::DateTimeRange { ranges, .. } => range_facet_counts(
                handle,
                searcher,
                request,
                exclude,
                ranges,
                |range| {
                    let name = IndexSchema::column_name(&field, FieldKind::DateTime);
                    Box::new(RangeQuery::new_date_bounds(
                        name,
                        included(&range.min, engine_datetime),
                        included(&range.max, engine_datetime),
                    ))
                },
            )?,
        };

        results.push(FacetResult { field, values });
    }

    Ok(results)
}

fn facet_kind(facet: &FacetSpec) -> FieldKind {
    match facet {
        FacetSpec::Keyword { .. } => FieldKind::Keyword,
        FacetSpec::IntegerExact { .. } | FacetSpec::IntegerRange { .. } => FieldKind::Integer,
        FacetSpec::DecimalExact { .. } | FacetSpec::DecimalRange { .. } => FieldKind::Decimal,
        FacetSpec::DateTimeExact { .. } | FacetSpec::DateTimeRange { .. } => FieldKind::DateTime,
    }
}

fn exact_facet_counts(
    searcher: &Searcher,
    query: &dyn Query,
    field: &str,
) -> Result<Vec<FacetValue>> {
    let root = format!("/{}", field);
    let mut collector = FacetCollector::for_field(F_FACETS);
    collector.add_facet(root.as_str());
    let counts = searcher.search(query, &collector)?;

    let mut values: Vec<FacetValue> = counts
        .get(root.as_str())
        .map(|(facet, count)| FacetValue {
            key: facet
                .to_path()
                .last()
                .map(|s| s.to_string())
                .unwrap_or_default(),
            count,
        })
        .collect();
    values.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.key.cmp(&b.key))
    });
    Ok(values)
}

/// One `Count` search per declared bucket
fn range_facet_counts<T>(
    handle: &IndexHandle,
    searcher: &Searcher,
    request: &SearchRequest,
    exclude: Option<&str>,
    buckets: &[RangeBucket<T>],
    build: impl Fn(&NumericRange<T>) -> Box<dyn Query>,
) -> Result<Vec<FacetValue>>
where
    T: Copy,
{
    let mut values = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        let base = build_query(handle, request, exclude)?;
        let range = build(&NumericRange::new(bucket.min, bucket.max));
        let combined = BooleanQuery::new(vec![(Occur::Must, base), (Occur::Must, range)]);
        let count = searcher.search(&combined, &Count)?;
        values.push(FacetValue {
            key: bucket.key.clone(),
            count: count as u64,
        });
    }
    Ok(values)
}
