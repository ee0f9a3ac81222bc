use native_query::config::Settings;
use native_query::id::SequentialIds;
use native_query::metadata::{Database, Metadata, NATIVE_PARAMETERS_FEATURE};
use native_query::query::{NativeQuery, QueryContext};
use native_query::snippet::{
    backfill_snippet_ids, rewrite_stale_snippet_references, Snippet,
};
use native_query::tag::{TagId, TagKind, TemplateTag, TemplateTags};
use std::sync::Arc;

fn context(settings: Settings) -> Arc<QueryContext> {
    let metadata = Metadata::default()
        .with_database(Database::new(1, "postgres").with_feature(NATIVE_PARAMETERS_FEATURE));
    Arc::new(
        QueryContext::new(metadata)
            .with_ids(SequentialIds::default())
            .with_settings(settings),
    )
}

fn query() -> NativeQuery {
    NativeQuery::new(context(Settings::default())).set_database_id(1)
}

fn bound_snippet(name: &str, snippet_name: &str, id: u64) -> TemplateTag {
    TemplateTag::new(name, name)
        .with_id(format!("id-{}", id).as_str())
        .with_kind(TagKind::Snippet {
            snippet_name: snippet_name.to_string(),
            snippet_id: Some(id),
        })
}

#[test]
fn test_backfill_binds_by_name() {
    let tags: TemplateTags = vec![
        TemplateTag::new("snippet: a", "A").with_kind(TagKind::snippet("a")),
        TemplateTag::new("snippet:a", "A").with_kind(TagKind::snippet("a")),
        TemplateTag::new("snippet: b", "B").with_kind(TagKind::snippet("b")),
        TemplateTag::new("x", "X"),
    ]
    .into_iter()
    .collect();
    let directory = vec![Snippet::new(10, "a"), Snippet::new(11, "c")];

    let updated = backfill_snippet_ids(&tags, &directory);

    assert_eq!(updated.get("snippet: a").unwrap().snippet_id(), Some(10));
    assert_eq!(updated.get("snippet:a").unwrap().snippet_id(), Some(10));
    assert_eq!(updated.get("snippet: b").unwrap().snippet_id(), None);
    assert_eq!(updated.get("x").unwrap().kind, TagKind::Text);
}

#[test]
fn test_rewrite_only_touches_stale_references() {
    let tags: TemplateTags = vec![
        bound_snippet("snippet: old", "old", 7),
        bound_snippet("snippet: same", "same", 8),
    ]
    .into_iter()
    .collect();
    let directory = vec![Snippet::new(7, "new"), Snippet::new(8, "same")];

    let text = rewrite_stale_snippet_references(
        "select * from t where {{snippet: old}} and {{snippet: same}}",
        &tags,
        &directory,
    );

    insta::assert_snapshot!(text, @"select * from t where {{snippet: new}} and {{snippet: same}}");
}

#[test]
fn test_rewrite_ignores_unknown_snippet_ids() {
    let tags: TemplateTags = vec![bound_snippet("snippet: gone", "gone", 99)]
        .into_iter()
        .collect();
    let text = rewrite_stale_snippet_references("{{snippet: gone}}", &tags, &Vec::<Snippet>::new());
    assert_eq!(text, "{{snippet: gone}}");
}

#[test]
fn test_snippet_rename_propagates_and_keeps_binding() {
    let directory = vec![Snippet::new(7, "old")];
    let q = query()
        .set_query_text("select * from t where {{snippet: old}}")
        .update_snippets_with_ids(&directory);
    let bound = q.template_tags_map().get("snippet: old").unwrap().clone();
    assert_eq!(bound.snippet_id(), Some(7));

    let renamed_directory = vec![Snippet::new(7, "new")];
    let q = q.update_snippet_names(&renamed_directory);

    assert_eq!(q.query_text(), "select * from t where {{snippet: new}}");
    assert_eq!(q.template_tags_map().len(), 1);
    let tag = q.template_tags_map().get("snippet: new").unwrap();
    assert_eq!(tag.snippet_id(), Some(7));
    assert_eq!(tag.snippet_name(), Some("new"));
    assert_eq!(tag.id, bound.id);
}

#[test]
fn test_two_snippet_renames_rebind_by_name() {
    let q = query()
        .set_query_text("{{snippet: a}} {{snippet: b}}")
        .update_snippets_with_ids(&vec![Snippet::new(1, "a"), Snippet::new(2, "b")]);

    let directory = vec![Snippet::new(1, "a2"), Snippet::new(2, "b2")];
    let q = q.update_snippet_names(&directory);

    assert_eq!(q.query_text(), "{{snippet: a2}} {{snippet: b2}}");
    assert_eq!(
        q.template_tags_map().get("snippet: a2").unwrap().snippet_id(),
        Some(1)
    );
    assert_eq!(
        q.template_tags_map().get("snippet: b2").unwrap().snippet_id(),
        Some(2)
    );
}

#[test]
fn test_unchanged_directory_is_a_no_op() {
    let directory = vec![Snippet::new(7, "same")];
    let q = query()
        .set_query_text("{{snippet: same}}")
        .update_snippets_with_ids(&directory);

    assert_eq!(q.update_snippet_names(&directory), q);
}

#[test]
fn test_update_snippets_with_ids_without_unbound_tags() {
    let q = query().set_query_text("{{x}}");
    let updated = q.update_snippets_with_ids(&vec![Snippet::new(1, "x")]);
    assert_eq!(updated, q);
    assert_eq!(
        updated.template_tags_map().get("x").unwrap().id,
        Some(TagId::new("tag-1"))
    );
}

#[test]
fn test_single_pass_rewrites_every_stale_reference() {
    let mut settings = Settings::default();
    settings.snippets.max_sync_passes = 1;
    let q = NativeQuery::new(context(settings))
        .set_database_id(1)
        .set_query_text("{{snippet: a}} and {{snippet: b}}")
        .update_snippets_with_ids(&vec![Snippet::new(1, "a"), Snippet::new(2, "b")]);

    let q = q.update_snippet_names(&vec![Snippet::new(1, "a2"), Snippet::new(2, "b2")]);

    assert_eq!(q.query_text(), "{{snippet: a2}} and {{snippet: b2}}");
}

#[test]
fn test_pass_cap_stops_non_converging_sync() {
    let mut settings = Settings::default();
    settings.snippets.max_sync_passes = 3;
    let q = NativeQuery::new(context(settings))
        .set_database_id(1)
        .set_query_text("{{snippet: x}}")
        .update_snippets_with_ids(&vec![Snippet::new(1, "x")]);

    // the new name closes the reference early, so every rescan sees "a" again
    let q = q.update_snippet_names(&vec![Snippet::new(1, "a}}b")]);

    assert_eq!(q.query_text(), "{{snippet: a}}b}}b}}b}}");
    assert_eq!(q.template_tags_map().len(), 1);
    assert_eq!(
        q.template_tags_map().get("snippet: a").unwrap().snippet_id(),
        Some(1)
    );
}

fn bound_query(text: &str, directory: &[Snippet]) -> NativeQuery {
    query().set_query_text(text).update_snippets_with_ids(directory)
}

#[test]
fn test_chained_renames_keep_each_binding() {
    let q = bound_query(
        "{{snippet: x}} and {{snippet: y}}",
        &[Snippet::new(1, "x"), Snippet::new(2, "y")],
    );
    let id_x = q.template_tags_map().get("snippet: x").unwrap().id.clone();
    let id_y = q.template_tags_map().get("snippet: y").unwrap().id.clone();

    let q = q.update_snippet_names(&vec![Snippet::new(1, "y"), Snippet::new(2, "z")]);

    assert_eq!(q.query_text(), "{{snippet: y}} and {{snippet: z}}");
    assert_eq!(
        q.template_tags_map().names().collect::<Vec<_>>(),
        vec!["snippet: y", "snippet: z"]
    );
    let y = q.template_tags_map().get("snippet: y").unwrap();
    assert_eq!(y.snippet_id(), Some(1));
    assert_eq!(y.id, id_x);
    let z = q.template_tags_map().get("snippet: z").unwrap();
    assert_eq!(z.snippet_id(), Some(2));
    assert_eq!(z.id, id_y);
}

#[test]
fn test_swapped_names_keep_each_binding() {
    let q = bound_query(
        "{{snippet: x}} and {{snippet: y}}",
        &[Snippet::new(1, "x"), Snippet::new(2, "y")],
    );

    let q = q.update_snippet_names(&vec![Snippet::new(1, "y"), Snippet::new(2, "x")]);

    assert_eq!(q.query_text(), "{{snippet: y}} and {{snippet: x}}");
    assert_eq!(
        q.template_tags_map().get("snippet: y").unwrap().snippet_id(),
        Some(1)
    );
    assert_eq!(
        q.template_tags_map().get("snippet: x").unwrap().snippet_id(),
        Some(2)
    );
}

#[test]
fn test_rewrite_applies_chained_renames_to_the_input_text() {
    let tags: TemplateTags = vec![
        bound_snippet("snippet: x", "x", 1),
        bound_snippet("snippet: y", "y", 2),
    ]
    .into_iter()
    .collect();
    let directory = vec![Snippet::new(1, "y"), Snippet::new(2, "z")];

    let text = rewrite_stale_snippet_references("{{snippet: x}} {{ snippet: y }}", &tags, &directory);

    insta::assert_snapshot!(text, @"{{snippet: y}} {{snippet: z}}");
}
