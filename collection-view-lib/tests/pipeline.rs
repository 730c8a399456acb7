//! Data reconciliation and update serialization.

mod common;

use std::sync::Arc;
use std::time::Duration;

use collection_view_lib::Error;
use collection_view_lib::engine::DataSet;
use collection_view_lib::error::ReconcileError;
use collection_view_lib::model::IndexPath;
use collection_view_lib::model::Row;
use collection_view_lib::model::RowKey;
use collection_view_lib::model::Value;
use collection_view_lib::pipeline::DataUpdate;
use collection_view_lib::pipeline::Pipeline;
use collection_view_lib::pipeline::PipelineState;
use collection_view_lib::pipeline::ReconcileOptions;
use common::CountingFetcher;
use common::Harness;
use common::ScriptedEngine;
use common::card_config;
use common::row;
use common::rows;

fn pipeline(engine: ScriptedEngine) -> (Pipeline, Arc<ScriptedEngine>) {
    let engine = Arc::new(engine);
    let pipeline = Pipeline::new(ReconcileOptions::new("id"), Arc::clone(&engine) as _);
    pipeline.open_render_gate();
    (pipeline, engine)
}

fn keys(pipeline: &Pipeline) -> Vec<String> {
    (0..pipeline.number_of_rows(0))
        .filter_map(|r| pipeline.identifier_for(IndexPath::new(0, r)))
        .map(|key| key.to_string())
        .collect()
}

// =============================================================================
// Reconciliation
// =============================================================================

#[tokio::test]
async fn test_initial_rows_form_one_section() {
    let (pipeline, engine) = pipeline(ScriptedEngine::new());

    let outcome = pipeline
        .update(DataUpdate::new(rows(&[(1, "a"), (2, "b")])), &())
        .await
        .unwrap();

    let report = outcome.report().unwrap();
    assert!(report.initial);
    assert!(report.layout_invalidated);
    assert_eq!(pipeline.number_of_sections(), 1);
    assert_eq!(pipeline.number_of_rows(0), 2);
    assert_eq!(keys(&pipeline), ["1", "2"]);
    assert_eq!(engine.installs(), 1);
    assert!(engine.transitions().is_empty());
}

#[tokio::test]
async fn test_reordered_identity_invalidates_layout() {
    let (pipeline, engine) = pipeline(ScriptedEngine::new());
    pipeline.update(DataUpdate::new(rows(&[(1, "a"), (2, "b")])), &()).await.unwrap();

    let outcome = pipeline
        .update(DataUpdate::new(rows(&[(2, "b2"), (1, "a")])), &())
        .await
        .unwrap();

    let report = outcome.report().unwrap();
    assert!(!report.initial);
    assert!(report.layout_invalidated);
    assert_eq!(keys(&pipeline), ["2", "1"]);
    assert_eq!(engine.transitions().len(), 1);
    assert!(engine.transitions()[0].animated);
    assert!(!pipeline.is_updating());
}

#[tokio::test]
async fn test_field_edit_keeps_layout() {
    let (pipeline, engine) = pipeline(ScriptedEngine::new());
    pipeline.update(DataUpdate::new(rows(&[(1, "a"), (2, "b")])), &()).await.unwrap();

    let outcome = pipeline
        .update(DataUpdate::new(rows(&[(1, "renamed"), (2, "b")])), &())
        .await
        .unwrap();

    assert!(!outcome.report().unwrap().layout_invalidated);
    assert!(engine.transitions().is_empty());
    let first = pipeline.row_at(IndexPath::new(0, 0)).unwrap();
    assert_eq!(first.get_string("name").unwrap(), Some("renamed"));
}

#[tokio::test]
async fn test_identical_update_is_idempotent() {
    let (pipeline, engine) = pipeline(ScriptedEngine::new());
    let data = rows(&[(1, "a"), (2, "b"), (3, "c")]);
    pipeline.update(DataUpdate::new(data.clone()), &()).await.unwrap();

    let outcome = pipeline.update(DataUpdate::new(data), &()).await.unwrap();

    assert!(!outcome.report().unwrap().layout_invalidated);
    assert!(engine.transitions().is_empty());
    assert_eq!(keys(&pipeline), ["1", "2", "3"]);
}

#[tokio::test]
async fn test_forced_update_always_transitions() {
    let (pipeline, engine) = pipeline(ScriptedEngine::new());
    let data = rows(&[(1, "a")]);
    pipeline.update(DataUpdate::new(data.clone()), &()).await.unwrap();

    let outcome = pipeline.update(DataUpdate::new(data).forced(), &()).await.unwrap();

    let report = outcome.report().unwrap();
    assert!(report.forced && report.layout_invalidated);
    assert_eq!(engine.transitions().len(), 1);
    // Forced updates do not wait for an interactive movement.
    assert_eq!(engine.movement_waits(), 1);
}

#[tokio::test]
async fn test_absent_data_clears_everything() {
    let (pipeline, engine) = pipeline(ScriptedEngine::new());
    pipeline.update(DataUpdate::new(rows(&[(1, "a"), (2, "b")])), &()).await.unwrap();

    let outcome = pipeline.update(DataUpdate::empty(), &()).await.unwrap();

    let report = outcome.report().unwrap();
    assert_eq!((report.previous_count, report.count, report.sections), (2, 0, 0));
    assert_eq!(pipeline.number_of_sections(), 0);
    assert_eq!(pipeline.row_at(IndexPath::new(0, 0)), None);
    assert_eq!(engine.seen_counts(), [(2, 0)]);
}

#[tokio::test]
async fn test_duplicate_uid_keeps_previous_data() {
    let (pipeline, _) = pipeline(ScriptedEngine::new());
    pipeline.update(DataUpdate::new(rows(&[(1, "a"), (2, "b")])), &()).await.unwrap();

    let result = pipeline
        .update(DataUpdate::new(rows(&[(3, "c"), (3, "d")])), &())
        .await;

    match result {
        Err(ReconcileError::DuplicateUid { key, first, second }) => {
            assert_eq!(key, RowKey::from("3"));
            assert_eq!((first, second), (0, 1));
        }
        other => panic!("expected duplicate uid error, got {:?}", other),
    }
    assert_eq!(keys(&pipeline), ["1", "2"]);
    assert_eq!(pipeline.state(), PipelineState::Idle);
}

#[tokio::test]
async fn test_missing_uid_rejected() {
    let (pipeline, _) = pipeline(ScriptedEngine::new());

    let result = pipeline
        .update(DataUpdate::new(vec![row(1, "a"), Row::new().set("name", "b")]), &())
        .await;

    assert!(matches!(result, Err(ReconcileError::MissingUid { index: 1, .. })));
    assert!(!pipeline.is_installed());
}

#[tokio::test]
async fn test_sort_and_sections() {
    let engine = Arc::new(ScriptedEngine::new());
    let options = ReconcileOptions::new("id")
        .with_sort("name", true)
        .with_section_field("group");
    let pipeline = Pipeline::new(options, Arc::clone(&engine) as _);
    pipeline.open_render_gate();

    let data = vec![
        row(1, "d").set("group", "x"),
        row(2, "a").set("group", "y"),
        row(3, "c").set("group", "x"),
        row(4, "b").set("group", "y"),
    ];
    pipeline.update(DataUpdate::new(data), &()).await.unwrap();

    // Sorted first, then grouped in first-seen order: y (a, b), x (c, d).
    assert_eq!(pipeline.number_of_sections(), 2);
    assert_eq!(pipeline.identifier_for(IndexPath::new(0, 0)), Some(RowKey::from("2")));
    assert_eq!(pipeline.identifier_for(IndexPath::new(0, 1)), Some(RowKey::from("4")));
    assert_eq!(pipeline.identifier_for(IndexPath::new(1, 0)), Some(RowKey::from("3")));
    assert_eq!(pipeline.index_path_for(&RowKey::from("1")), Some(IndexPath::new(1, 1)));
    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.sections()[0].identifier, Some(Value::from("y")));
}

// =============================================================================
// Serialization
// =============================================================================

#[tokio::test]
async fn test_queued_updates_coalesce_to_latest() {
    let (pipeline, engine) = pipeline(ScriptedEngine::new().with_transition_delay(Duration::from_millis(30)));
    pipeline.update(DataUpdate::new(rows(&[(1, "a"), (2, "b")])), &()).await.unwrap();

    let (first, second, third) = tokio::join!(
        pipeline.update(DataUpdate::new(rows(&[(2, "b"), (1, "a")])), &()),
        pipeline.update(DataUpdate::new(rows(&[(5, "e")])), &()),
        pipeline.update(DataUpdate::new(rows(&[(7, "g"), (8, "h")])), &()),
    );

    assert!(first.unwrap().report().is_some());
    assert!(second.unwrap().is_superseded());
    assert!(third.unwrap().report().is_some());
    assert_eq!(keys(&pipeline), ["7", "8"]);
    assert_eq!(engine.transitions().len(), 2);
}

#[tokio::test]
async fn test_slow_template_does_not_let_older_update_win() {
    let config = card_config().with_template_field("kind");
    let fetcher = CountingFetcher::new()
        .with_templates(&["Card"])
        .with_slow_template("Slow", Duration::from_millis(50));
    let harness = Harness::with_fetcher(config, fetcher, ScriptedEngine::new());
    harness.view.start().await;

    let older = vec![row(10, "old").set("kind", "Slow")];
    let newer = vec![row(20, "new").set("kind", "Card")];
    let (older, newer) = tokio::join!(
        harness.view.update_data(Some(older)),
        harness.view.update_data(Some(newer)),
    );

    assert!(older.unwrap().is_superseded());
    assert!(newer.unwrap().report().is_some());
    assert_eq!(keys(harness.view.data_set()), ["20"]);
    assert_eq!(harness.fetcher.calls("Slow"), 1);
}

#[tokio::test]
async fn test_reserved_ticket_superseded_by_later_update() {
    let (pipeline, _) = pipeline(ScriptedEngine::new());

    let early = pipeline.reserve();
    pipeline.update(DataUpdate::new(rows(&[(2, "b")])), &()).await.unwrap();
    assert!(!pipeline.is_latest(&early));

    let outcome = pipeline
        .update_reserved(early, DataUpdate::new(rows(&[(1, "a")])), &())
        .await
        .unwrap();
    assert!(outcome.is_superseded());
    assert_eq!(keys(&pipeline), ["2"]);
}

#[tokio::test]
async fn test_old_data_served_during_transition() {
    let (pipeline, engine) = pipeline(ScriptedEngine::new());
    pipeline.update(DataUpdate::new(rows(&[(1, "a")])), &()).await.unwrap();

    pipeline
        .update(DataUpdate::new(rows(&[(1, "a"), (2, "b"), (3, "c")])), &())
        .await
        .unwrap();

    assert_eq!(engine.seen_counts(), [(1, 3)]);
    assert!(!pipeline.is_using_old_data());
}

#[tokio::test]
async fn test_updates_wait_for_render_gate() {
    let engine = Arc::new(ScriptedEngine::new());
    let pipeline = Pipeline::new(ReconcileOptions::new("id"), Arc::clone(&engine) as _);

    let opener = {
        let pipeline = pipeline.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(engine.installs(), 0);
            pipeline.open_render_gate();
        }
    };
    let (outcome, ()) = tokio::join!(pipeline.update(DataUpdate::new(rows(&[(1, "a")])), &()), opener);

    assert!(outcome.unwrap().report().unwrap().initial);
    assert!(pipeline.is_render_gate_open());
}

// =============================================================================
// Through the view
// =============================================================================

#[tokio::test]
async fn test_commit_publishes_sorted_data() {
    let harness = Harness::started_with(
        card_config().with_sort("name", false),
        rows(&[(1, "a"), (2, "c"), (3, "b")]),
    )
    .await;

    let published: Vec<String> = harness
        .host
        .data_rows()
        .iter()
        .map(|r| r.value("name").to_string())
        .collect();
    assert_eq!(published, ["c", "b", "a"]);
}

#[tokio::test]
async fn test_sort_property_reorders() {
    let harness = Harness::started_with(card_config(), rows(&[(1, "b"), (2, "a")])).await;

    harness
        .view
        .property_changed("SortField", Value::from("name"))
        .await
        .unwrap();
    assert_eq!(harness.view.snapshot().key_at(IndexPath::new(0, 0)), Some(&RowKey::from("2")));

    harness
        .view
        .property_changed("SortAscending", Value::Bool(false))
        .await
        .unwrap();
    assert_eq!(harness.view.snapshot().key_at(IndexPath::new(0, 0)), Some(&RowKey::from("1")));
    assert_eq!(harness.view.config().sort_field.as_deref(), Some("name"));
}

#[tokio::test]
async fn test_data_property_replaces_rows() {
    let harness = Harness::started_with(card_config(), rows(&[(1, "a")])).await;

    let table = Value::from(collection_view_lib::model::RowTable::new(rows(&[(4, "d"), (5, "e")])));
    harness.view.property_changed("Data", table).await.unwrap();

    assert_eq!(harness.view.snapshot().len(), 2);
}

#[tokio::test]
async fn test_view_update_error_surfaces() {
    let harness = Harness::started_with(card_config(), rows(&[(1, "a")])).await;

    let result = harness.view.update_data(Some(rows(&[(2, "b"), (2, "c")]))).await;

    assert!(matches!(result, Err(Error::Reconcile(ReconcileError::DuplicateUid { .. }))));
    assert_eq!(harness.view.snapshot().len(), 1);
}
