use native_query::config::Settings;
use native_query::id::SequentialIds;
use native_query::metadata::{Database, Metadata, NativePermissions, NATIVE_PARAMETERS_FEATURE};
use native_query::query::{DependentMetadataItem, NativeQuery, QueryContext};
use native_query::tag::{
    FieldReference, ParameterValuesConfig, TagId, TagKind, ValuesQueryType, ValuesSourceType,
};
use std::sync::Arc;

const POSTGRES: u64 = 1;
const MONGO: u64 = 2;
const NO_PARAMS: u64 = 3;

fn context() -> Arc<QueryContext> {
    let metadata = Metadata::new([
        Database::new(POSTGRES, "postgres")
            .with_feature(NATIVE_PARAMETERS_FEATURE)
            .with_native_permissions(NativePermissions::Write),
        Database::new(MONGO, "mongo")
            .with_feature(NATIVE_PARAMETERS_FEATURE)
            .with_table(20, "orders")
            .with_table(21, "people"),
        Database::new(NO_PARAMS, "druid"),
    ]);
    Arc::new(QueryContext::new(metadata).with_ids(SequentialIds::default()))
}

fn query_on(database: u64) -> NativeQuery {
    NativeQuery::new(context()).set_database_id(database)
}

#[test]
fn test_new_query_is_empty() {
    let q = NativeQuery::new(context());
    assert!(q.is_empty());
    assert!(!q.has_data());
    assert!(!q.can_run());
    assert_eq!(q.query_text(), "");
    assert!(q.template_tags_map().is_empty());
    assert_eq!(q.line_count(), 0);
}

#[test]
fn test_set_query_text_tracks_tags() {
    let q = query_on(POSTGRES).set_query_text("select * from t where a = {{a}} and b = {{b}}");

    assert_eq!(
        q.template_tags_map().names().collect::<Vec<_>>(),
        vec!["a", "b"]
    );
    assert!(q.template_tags().iter().all(|t| t.id.is_some()));
}

#[test]
fn test_edits_are_immutable() {
    let before = query_on(POSTGRES).set_query_text("{{a}}");
    let after = before.set_query_text("{{a}} {{b}}");

    assert_eq!(before.query_text(), "{{a}}");
    assert_eq!(before.template_tags_map().len(), 1);
    assert_eq!(after.template_tags_map().len(), 2);
}

#[test]
fn test_typing_a_tag_name_keeps_its_id() {
    let q = query_on(POSTGRES).set_query_text("where x = {{cat}}");
    let id = q.template_tags_map().get("cat").unwrap().id.clone();

    let q = q
        .set_query_text("where x = {{cate}}")
        .set_query_text("where x = {{categ}}")
        .set_query_text("where x = {{category}}");

    let tag = q.template_tags_map().get("category").unwrap();
    assert_eq!(tag.id, id);
    assert_eq!(tag.display_name, "Category");
}

#[test]
fn test_no_parameter_support_means_no_tags() {
    let q = query_on(NO_PARAMS).set_query_text("select {{a}}, {{#1}}");
    assert!(!q.supports_native_parameters());
    assert!(q.template_tags_map().is_empty());
}

#[test]
fn test_switching_to_database_without_parameters_drops_tags() {
    let q = query_on(POSTGRES).set_query_text("select {{a}}");
    assert_eq!(q.template_tags_map().len(), 1);

    let q = q.set_database_id(NO_PARAMS).set_query_text("select {{a}}");
    assert!(q.template_tags_map().is_empty());
}

#[test]
fn test_unknown_database_means_no_tags() {
    let q = query_on(99).set_query_text("select {{a}}");
    assert!(q.template_tags_map().is_empty());
    assert!(q.read_only());
}

#[test]
fn test_clearing_text_clears_tags() {
    let q = query_on(POSTGRES).set_query_text("{{a}}").set_query_text("");
    assert!(q.template_tags_map().is_empty());
    assert!(q.is_empty());
}

#[test]
fn test_permissions() {
    assert!(query_on(POSTGRES).is_editable());
    assert!(query_on(MONGO).read_only());
    assert!(NativeQuery::new(context()).read_only());
}

#[test]
fn test_set_database_id_is_noop_for_same_database() {
    let q = query_on(POSTGRES).set_query_text("{{a}}");
    assert_eq!(q.set_database_id(POSTGRES), q);
    assert_eq!(q.set_database_id(MONGO).database_id(), Some(MONGO));
}

#[test]
fn test_collection_required_for_mongo() {
    let q = query_on(MONGO).set_query_text("[{\"$match\": {}}]");
    assert!(q.requires_table());
    assert!(!q.has_data());
    assert!(!q.can_run());

    let q = q.set_default_collection();
    assert_eq!(q.collection(), Some("orders"));
    assert!(q.has_data());
    assert!(q.can_run());

    let q = q.set_collection_name("people");
    assert_eq!(q.collection(), Some("people"));
}

#[test]
fn test_default_collection_only_when_required() {
    let q = query_on(POSTGRES).set_default_collection();
    assert_eq!(q.collection(), None);
    assert!(q.has_data());
}

#[test]
fn test_table_required_engines_are_configurable() {
    let mut settings = Settings::default();
    settings.engines.table_required = vec!["postgres".to_string()];
    let metadata = Metadata::new([Database::new(POSTGRES, "postgres")]);
    let context = QueryContext::new(metadata).with_settings(settings);

    let q = NativeQuery::new(Arc::new(context)).set_database_id(POSTGRES);
    assert!(q.requires_table());
}

#[test]
fn test_can_run_requires_valid_tags() {
    let q = query_on(POSTGRES).set_query_text("select * from t where d = {{d}}");
    assert!(q.can_run());

    let mut tag = q.template_tags_map().get("d").unwrap().clone();
    tag.kind = TagKind::Dimension {
        dimension: None,
        widget_type: None,
    };
    let q = q.set_template_tag("d", tag.clone());
    assert!(!q.can_run());
    assert_eq!(q.validate_template_tags().len(), 1);

    tag.kind = TagKind::Dimension {
        dimension: Some(FieldReference::field(33)),
        widget_type: Some("category".to_string()),
    };
    let q = q.set_template_tag("d", tag);
    assert!(q.can_run());
}

#[test]
fn test_tag_views() {
    let q = query_on(POSTGRES).set_query_text(
        "select * from {{#4-orders}} where {{snippet: active}} and a = {{a}} and d = {{d}} and n = {{n}}",
    );

    let mut d = q.template_tags_map().get("d").unwrap().clone();
    d.kind = TagKind::Dimension {
        dimension: Some(FieldReference::field(12)),
        widget_type: None,
    };
    let mut n = q.template_tags_map().get("n").unwrap().clone();
    n.kind = TagKind::Number;
    let q = q.set_template_tag("d", d).set_template_tag("n", n);

    let variables: Vec<_> = q.variable_template_tags().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(variables, vec!["a", "d", "n"]);
    assert!(q.has_variable_template_tags());
    assert!(q.has_snippets());
    assert_eq!(q.referenced_question_ids(), vec![4]);
    assert_eq!(q.dimension_template_tags().len(), 1);
    assert_eq!(
        q.dependent_metadata(),
        vec![DependentMetadataItem::Field { id: 12 }]
    );
    let numbers = q.template_tags_where(|t| t.kind == TagKind::Number);
    assert_eq!(numbers.len(), 1);
}

#[test]
fn test_dependent_metadata_skips_field_names() {
    let q = query_on(POSTGRES).set_query_text("{{d}}");
    let mut d = q.template_tags_map().get("d").unwrap().clone();
    d.kind = TagKind::Dimension {
        dimension: Some(FieldReference::new(serde_json::json!(["field", "total", null]))),
        widget_type: None,
    };
    let q = q.set_template_tag("d", d);
    assert!(q.dependent_metadata().is_empty());
}

#[test]
fn test_referenced_question_ids_skip_missing_ids() {
    let q = query_on(POSTGRES).set_query_text("{{#}} {{#9}}");
    assert_eq!(q.referenced_question_ids(), vec![9]);
    assert!(!q.can_run());
}

#[test]
fn test_set_parameter_index() {
    let q = query_on(POSTGRES).set_query_text("{{a}} {{b}} {{c}}");
    let c_id = q.template_tags_map().get("c").unwrap().id.clone().unwrap();

    let reordered = q.set_parameter_index(&c_id, 0);
    assert_eq!(
        reordered.template_tags_map().names().collect::<Vec<_>>(),
        vec!["c", "a", "b"]
    );

    // order survives later edits that keep the same tags
    let edited = reordered.set_query_text("{{a}} {{b}} {{c}} -- comment");
    assert_eq!(
        edited.template_tags_map().names().collect::<Vec<_>>(),
        vec!["c", "a", "b"]
    );

    assert_eq!(q.set_parameter_index(&TagId::new("nope"), 0), q);
}

#[test]
fn test_set_template_tag_config() {
    let q = query_on(POSTGRES).set_query_text("{{state}}");
    let tag = q.template_tags_map().get("state").unwrap().clone();
    let config = ParameterValuesConfig {
        values_query_type: Some(ValuesQueryType::List),
        values_source_type: Some(ValuesSourceType::StaticList),
        values_source_config: Some(serde_json::json!({"values": ["CA", "NY"]})),
    };

    let q = q.set_template_tag_config(&tag, config.clone());

    let updated = q.template_tags_map().get("state").unwrap();
    assert_eq!(updated.config, Some(config));
    assert_eq!(updated.id, tag.id);
}

#[test]
fn test_set_template_tag_bypasses_scanning() {
    let q = query_on(POSTGRES).set_query_text("{{a}}");
    let extra = native_query::TemplateTag::new("extra", "Extra").with_id("manual");
    let q = q.set_template_tag("extra", extra);

    assert_eq!(q.template_tags_map().len(), 2);
    assert_eq!(q.query_text(), "{{a}}");

    // the next text edit brings the registry back in line with the text
    let q = q.set_query_text("{{a}} ");
    assert_eq!(q.template_tags_map().names().collect::<Vec<_>>(), vec!["a"]);
}
