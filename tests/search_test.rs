//! End-to-end search behavior against real tantivy indexes

mod common;

use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

use canopy_index::config::{IndexingConfig, IndexingConfigBuilder};
use canopy_index::content::{ContentNodeBuilder, InMemoryContentStore};
use canopy_index::extract::ExtractorRegistry;
use canopy_index::index::{
    FieldDefinition, FieldKind, HealthStatus, IndexDefinition, IndexService, Indexer, Searcher,
};
use canopy_index::model::{
    AccessContext, FieldValue, IndexDocument, IndexField, ObjectKind, Protection, Variation,
};
use canopy_index::pipeline::{ChangeProcessor, InMemoryStampStore, RebuildCoordinator};
use canopy_index::query::{
    Direction, FacetSpec, Filter, NumericRange, SearchRequest, SortField, Sorter,
};
use common::ALIAS;

fn test_config(dir: &TempDir) -> IndexingConfig {
    common::init_tracing();
    IndexingConfigBuilder::new()
        .index_path(dir.path().join("indexes"))
        .stamp_path(dir.path().join("stamps"))
        .build()
}

fn definition() -> IndexDefinition {
    IndexDefinition::new(ALIAS, ObjectKind::Document)
        .with_field(FieldDefinition::new("name", FieldKind::Text))
        .with_field(FieldDefinition::new("title", FieldKind::Text))
        .with_field(FieldDefinition::new("topics", FieldKind::Keyword))
        .with_field(FieldDefinition::new("year", FieldKind::Integer))
}

fn service(dir: &TempDir) -> Arc<IndexService> {
    Arc::new(IndexService::new(&test_config(dir), vec![definition()]).unwrap())
}

fn doc(fields: Vec<IndexField>) -> IndexDocument {
    let key = Uuid::new_v4();
    IndexDocument {
        key,
        object_kind: ObjectKind::Document,
        path: vec![key],
        variations: vec![Variation::invariant()],
        fields,
        protection: None,
    }
}

fn titled(title: &str) -> IndexDocument {
    doc(vec![IndexField::new(
        "title",
        FieldValue::texts(vec![title.to_string()]),
    )])
}

fn with_year(year: i64) -> IndexDocument {
    doc(vec![IndexField::new("year", FieldValue::integers(vec![year]))])
}

fn with_topics(topics: &[&str]) -> IndexDocument {
    doc(vec![IndexField::new(
        "topics",
        FieldValue::keywords(topics.iter().map(|t| t.to_string()).collect()),
    )])
}

#[tokio::test]
async fn test_query_text_matches_titles() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let winter = titled("Winter jackets");
    service.add_or_update(ALIAS, &winter).await.unwrap();
    service
        .add_or_update(ALIAS, &titled("Summer shoes"))
        .await
        .unwrap();

    let response = service
        .search(ALIAS, &SearchRequest::new().with_query_text("winter"))
        .await
        .unwrap();

    assert_eq!(response.total, 1);
    assert_eq!(response.hits[0].key, winter.key);
    assert!(response.hits[0].score > 0.0);
}

#[tokio::test]
async fn test_text_filter_matches_token_prefixes_only() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let winter = titled("Winter jackets");
    service.add_or_update(ALIAS, &winter).await.unwrap();
    service
        .add_or_update(ALIAS, &titled("Summer shoes"))
        .await
        .unwrap();

    let prefix = service
        .search(
            ALIAS,
            &SearchRequest::new().with_filter(Filter::Text {
                field: "title".to_string(),
                values: vec!["wint".to_string()],
                negate: false,
            }),
        )
        .await
        .unwrap();
    assert_eq!(prefix.total, 1);
    assert_eq!(prefix.hits[0].key, winter.key);

    // A mid-token substring is not a prefix of any token
    let substring = service
        .search(
            ALIAS,
            &SearchRequest::new().with_filter(Filter::Text {
                field: "title".to_string(),
                values: vec!["acket".to_string()],
                negate: false,
            }),
        )
        .await
        .unwrap();
    assert_eq!(substring.total, 0);
}

#[tokio::test]
async fn test_culture_scoping_includes_invariant_documents() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let english = {
        let key = Uuid::new_v4();
        IndexDocument {
            key,
            object_kind: ObjectKind::Document,
            path: vec![key],
            variations: vec![Variation::culture("en-us")],
            fields: vec![IndexField::new(
                "title",
                FieldValue::texts(vec!["Hello".to_string()]),
            )
            .with_variation(Some("en-us".to_string()), None)],
            protection: None,
        }
    };
    let invariant = titled("Everywhere");
    service.add_or_update(ALIAS, &english).await.unwrap();
    service.add_or_update(ALIAS, &invariant).await.unwrap();

    let en = service
        .search(ALIAS, &SearchRequest::new().with_culture("en-us"))
        .await
        .unwrap();
    assert_eq!(en.total, 2);

    // No Danish variant exists; only the invariant document routes
    let da = service
        .search(ALIAS, &SearchRequest::new().with_culture("da-dk"))
        .await
        .unwrap();
    assert_eq!(da.total, 1);
    assert_eq!(da.hits[0].key, invariant.key);

    let none = service.search(ALIAS, &SearchRequest::new()).await.unwrap();
    assert_eq!(none.total, 1);
    assert_eq!(none.hits[0].key, invariant.key);
}

#[tokio::test]
async fn test_protected_documents_need_matching_access() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let principal = Uuid::new_v4();

    let mut secret = titled("Members only");
    secret.protection = Some(Protection {
        principals: vec![principal],
        groups: vec![],
    });
    let public = titled("Open to all");
    service.add_or_update(ALIAS, &secret).await.unwrap();
    service.add_or_update(ALIAS, &public).await.unwrap();

    // Without access context only unprotected documents match
    let anonymous = service.search(ALIAS, &SearchRequest::new()).await.unwrap();
    assert_eq!(anonymous.total, 1);
    assert_eq!(anonymous.hits[0].key, public.key);

    let member = service
        .search(
            ALIAS,
            &SearchRequest::new().with_access(AccessContext::new(principal)),
        )
        .await
        .unwrap();
    assert_eq!(member.total, 2);

    let stranger = service
        .search(
            ALIAS,
            &SearchRequest::new().with_access(AccessContext::new(Uuid::new_v4())),
        )
        .await
        .unwrap();
    assert_eq!(stranger.total, 1);
}

#[tokio::test]
async fn test_group_access_unlocks_protected_documents() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let group = Uuid::new_v4();

    let mut secret = titled("Group content");
    secret.protection = Some(Protection {
        principals: vec![],
        groups: vec![group],
    });
    service.add_or_update(ALIAS, &secret).await.unwrap();

    let member = service
        .search(
            ALIAS,
            &SearchRequest::new()
                .with_access(AccessContext::new(Uuid::new_v4()).with_groups(vec![group])),
        )
        .await
        .unwrap();
    assert_eq!(member.total, 1);
}

#[tokio::test]
async fn test_disjoint_ranges_combine_before_negation() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let old = with_year(1550);
    let middle = with_year(1700);
    let modern = with_year(1950);
    for d in [&old, &middle, &modern] {
        service.add_or_update(ALIAS, d).await.unwrap();
    }

    let ranges = vec![
        NumericRange::between(1500, 1600),
        NumericRange::between(1900, 2000),
    ];

    let inside = service
        .search(
            ALIAS,
            &SearchRequest::new().with_filter(Filter::integer_range("year", ranges.clone())),
        )
        .await
        .unwrap();
    assert_eq!(inside.total, 2);

    // Negation applies to the union, so only the gap between the intervals
    // survives
    let outside = service
        .search(
            ALIAS,
            &SearchRequest::new().with_filter(Filter::IntegerRange {
                field: "year".to_string(),
                ranges,
                negate: true,
            }),
        )
        .await
        .unwrap();
    assert_eq!(outside.total, 1);
    assert_eq!(outside.hits[0].key, middle.key);
}

#[tokio::test]
async fn test_facet_on_filtered_field_keeps_sibling_counts() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    for topics in [&["short"][..], &["short"], &["long"]] {
        service
            .add_or_update(ALIAS, &with_topics(topics))
            .await
            .unwrap();
    }

    let response = service
        .search(
            ALIAS,
            &SearchRequest::new()
                .with_filter(Filter::keyword("topics", vec!["long".to_string()]))
                .with_facet(FacetSpec::Keyword {
                    field: "topics".to_string(),
                }),
        )
        .await
        .unwrap();

    // Hits honor the filter, facet counts do not
    assert_eq!(response.total, 1);
    let facet = &response.facets[0];
    assert_eq!(facet.field, "topics");
    let count = |key: &str| {
        facet
            .values
            .iter()
            .find(|v| v.key == key)
            .map(|v| v.count)
            .unwrap_or(0)
    };
    assert_eq!(count("short"), 2);
    assert_eq!(count("long"), 1);
}

#[tokio::test]
async fn test_integer_sorting() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let years = [1950, 1550, 1700];
    let mut keys = Vec::new();
    for year in years {
        let d = with_year(year);
        keys.push((year, d.key));
        service.add_or_update(ALIAS, &d).await.unwrap();
    }
    keys.sort_by_key(|(year, _)| *year);

    let ascending = service
        .search(
            ALIAS,
            &SearchRequest::new().with_sorter(Sorter::by(
                SortField::Integer("year".to_string()),
                Direction::Ascending,
            )),
        )
        .await
        .unwrap();

    let hit_keys: Vec<Uuid> = ascending.hits.iter().map(|h| h.key).collect();
    let expected: Vec<Uuid> = keys.iter().map(|(_, k)| *k).collect();
    assert_eq!(hit_keys, expected);
}

#[tokio::test]
async fn test_undeclared_fields_are_rejected() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    service
        .add_or_update(ALIAS, &titled("anything"))
        .await
        .unwrap();

    let unknown = service
        .search(
            ALIAS,
            &SearchRequest::new().with_filter(Filter::keyword("missing", vec!["x".to_string()])),
        )
        .await;
    assert!(matches!(
        unknown,
        Err(canopy_index::IndexError::UnknownField { .. })
    ));

    let mismatch = service
        .search(
            ALIAS,
            &SearchRequest::new().with_filter(Filter::integer_range(
                "topics",
                vec![NumericRange::between(1, 2)],
            )),
        )
        .await;
    assert!(matches!(
        mismatch,
        Err(canopy_index::IndexError::FieldKindMismatch { .. })
    ));
}

#[tokio::test]
async fn test_delete_removes_descendants() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let parent_key = Uuid::new_v4();
    let parent = IndexDocument {
        key: parent_key,
        object_kind: ObjectKind::Document,
        path: vec![parent_key],
        variations: vec![Variation::invariant()],
        fields: vec![],
        protection: None,
    };
    let child_key = Uuid::new_v4();
    let child = IndexDocument {
        key: child_key,
        object_kind: ObjectKind::Document,
        path: vec![parent_key, child_key],
        variations: vec![Variation::invariant()],
        fields: vec![],
        protection: None,
    };
    let outsider = titled("untouched");

    service.add_or_update(ALIAS, &parent).await.unwrap();
    service.add_or_update(ALIAS, &child).await.unwrap();
    service.add_or_update(ALIAS, &outsider).await.unwrap();

    service.delete(ALIAS, &[parent_key]).await.unwrap();

    let response = service.search(ALIAS, &SearchRequest::new()).await.unwrap();
    assert_eq!(response.total, 1);
    assert_eq!(response.hits[0].key, outsider.key);
}

#[tokio::test]
async fn test_paging() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    for i in 0..3 {
        service
            .add_or_update(ALIAS, &with_year(i))
            .await
            .unwrap();
    }

    let first = service
        .search(ALIAS, &SearchRequest::new().with_paging(0, 2))
        .await
        .unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(first.hits.len(), 2);

    let second = service
        .search(ALIAS, &SearchRequest::new().with_paging(2, 2))
        .await
        .unwrap();
    assert_eq!(second.total, 3);
    assert_eq!(second.hits.len(), 1);
}

#[tokio::test]
async fn test_rebuild_swaps_the_active_slot() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let service = Arc::new(IndexService::new(&config, vec![definition()]).unwrap());

    let store = InMemoryContentStore::new();
    let root = ContentNodeBuilder::new(Uuid::new_v4(), "Alpha").build();
    let child = ContentNodeBuilder::new(Uuid::new_v4(), "Beta")
        .under(&root)
        .build();
    store.insert(root);
    store.insert(child);

    let stamps = Arc::new(InMemoryStampStore::new());
    let processor = Arc::new(ChangeProcessor::new(
        Arc::new(store),
        service.clone(),
        stamps.clone(),
        Arc::new(ExtractorRegistry::with_defaults()),
        &config,
    ));
    let coordinator = RebuildCoordinator::new(service.clone(), processor, stamps);

    assert_eq!(service.active_index_name(ALIAS).unwrap(), "content__a");
    assert!(coordinator.rebuild(ALIAS).await.unwrap());
    assert_eq!(service.active_index_name(ALIAS).unwrap(), "content__b");

    let response = service.search(ALIAS, &SearchRequest::new()).await.unwrap();
    assert_eq!(response.total, 2);

    let metadata = service.metadata(ALIAS).await.unwrap();
    assert_eq!(metadata.document_count, 2);
    assert_eq!(metadata.health, HealthStatus::Healthy);
}

#[tokio::test]
async fn test_empty_rebuild_keeps_the_active_slot() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let service = Arc::new(IndexService::new(&config, vec![definition()]).unwrap());

    let survivor = titled("still here");
    service.add_or_update(ALIAS, &survivor).await.unwrap();

    let stamps = Arc::new(InMemoryStampStore::new());
    let processor = Arc::new(ChangeProcessor::new(
        Arc::new(InMemoryContentStore::new()),
        service.clone(),
        stamps.clone(),
        Arc::new(ExtractorRegistry::with_defaults()),
        &config,
    ));
    let coordinator = RebuildCoordinator::new(service.clone(), processor, stamps);

    // The content tree is empty, so the shadow probes unhealthy and the old
    // slot keeps serving
    assert!(!coordinator.rebuild(ALIAS).await.unwrap());
    assert_eq!(service.active_index_name(ALIAS).unwrap(), "content__a");

    let response = service.search(ALIAS, &SearchRequest::new()).await.unwrap();
    assert_eq!(response.total, 1);
    assert_eq!(response.hits[0].key, survivor.key);
}

#[tokio::test]
async fn test_metadata_reports_rebuild_in_progress() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    service
        .add_or_update(ALIAS, &titled("content"))
        .await
        .unwrap();

    assert!(service.start_rebuild(ALIAS).await.unwrap());
    assert_eq!(
        service.metadata(ALIAS).await.unwrap().health,
        HealthStatus::Rebuilding
    );
    // A second start while running is refused
    assert!(!service.start_rebuild(ALIAS).await.unwrap());

    service.cancel_rebuild(ALIAS).unwrap();
    assert_eq!(
        service.metadata(ALIAS).await.unwrap().health,
        HealthStatus::Healthy
    );
}
