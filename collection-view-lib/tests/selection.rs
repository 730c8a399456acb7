//! Selection and editing state across data updates.

mod common;

use collection_view_lib::Click;
use collection_view_lib::host::HostSurface;
use collection_view_lib::model::IndexPath;
use collection_view_lib::model::RowKey;
use collection_view_lib::model::Value;
use collection_view_lib::selection::SelectionMode;
use common::Harness;
use common::card_config;
use common::rows;

fn at(row: usize) -> IndexPath {
    IndexPath::new(0, row)
}

fn keys(items: &[&str]) -> Vec<RowKey> {
    items.iter().map(|k| RowKey::from(*k)).collect()
}

// =============================================================================
// Editing
// =============================================================================

#[tokio::test]
async fn test_editing_entry_dropped_when_item_disappears() {
    let harness = Harness::started_with(card_config(), rows(&[(4, "d"), (5, "e")])).await;
    assert!(harness.view.begin_editing(at(1)).unwrap());

    harness
        .view
        .update_data(Some(rows(&[(4, "d"), (6, "f")])))
        .await
        .unwrap();

    assert!(harness.view.editing_index_paths().is_empty());
}

#[tokio::test]
async fn test_editing_entry_follows_its_item() {
    let harness = Harness::started_with(card_config(), rows(&[(1, "a"), (2, "b")])).await;
    harness.view.begin_editing(at(1)).unwrap();

    harness
        .view
        .update_data(Some(rows(&[(2, "b"), (1, "a")])))
        .await
        .unwrap();

    assert_eq!(harness.view.editing_index_paths(), [at(0)]);
    assert!(harness.view.finish_editing(at(0)).unwrap());
    assert!(harness.view.editing_index_paths().is_empty());
}

#[tokio::test]
async fn test_editing_parameter_and_template() {
    let config = card_config()
        .with_editing_template("Editor")
        .with_editing_parameter("IsEditing");
    let harness = Harness::started_with(config, rows(&[(1, "a")])).await;
    let cell = harness.view.cell_for_item(at(0)).unwrap();
    harness.view.display_cell(cell);

    harness.view.begin_editing(at(0)).unwrap();

    assert_eq!(harness.runtime.created("Editor"), 1);
    assert_eq!(harness.runtime.parameter_values("Editor", "IsEditing"), [Value::Bool(true)]);
    assert_eq!(harness.view.with_cell(cell, |c| c.is_editing()), Some(true));
}

// =============================================================================
// Selection
// =============================================================================

#[tokio::test]
async fn test_single_selection_replaces_and_publishes_raw_indices() {
    let config = card_config()
        .with_selection_mode(SelectionMode::Single)
        .with_sort("name", false);
    let harness = Harness::started_with(config, rows(&[(1, "a"), (2, "b"), (3, "c")])).await;

    // Visual order is c, b, a.
    assert!(harness.view.select_item(at(0)));
    assert_eq!(harness.host.last_selection(), Some(vec![2]));

    assert!(harness.view.select_item(at(2)));
    assert_eq!(harness.view.selected_keys(), keys(&["1"]));
    assert_eq!(harness.view.selected_index_paths(), [at(2)]);
    assert_eq!(harness.host.last_selection(), Some(vec![0]));
}

#[tokio::test]
async fn test_selection_disabled_by_default() {
    let harness = Harness::started_with(card_config(), rows(&[(1, "a")])).await;

    assert!(!harness.view.select_item(at(0)));
    assert!(!harness.view.select_all());
    assert!(harness.view.selected_keys().is_empty());
}

#[tokio::test]
async fn test_has_selection_published_only_on_change() {
    let config = card_config().with_selection_mode(SelectionMode::Single);
    let harness = Harness::started_with(config, rows(&[(1, "a"), (2, "b")])).await;
    assert_eq!(harness.host.writes("HasSelectedCells"), 1);
    assert_eq!(harness.host.property("HasSelectedCells"), Some(Value::Bool(false)));

    harness.view.select_item(at(0));
    harness.view.select_item(at(1));
    assert_eq!(harness.host.writes("HasSelectedCells"), 2);
    assert_eq!(harness.host.property("SelectedCellsCount"), Some(Value::from(1usize)));

    harness.view.deselect_all();
    assert_eq!(harness.host.writes("HasSelectedCells"), 3);
    assert_eq!(harness.host.property("HasSelectedCells"), Some(Value::Bool(false)));
}

#[tokio::test]
async fn test_selection_survives_reorder_and_drops_removed_items() {
    let config = card_config().with_selection_mode(SelectionMode::Multi);
    let harness = Harness::started_with(config, rows(&[(1, "a"), (2, "b"), (3, "c")])).await;
    harness.view.select_item(at(0));
    harness.view.select_item(at(1));

    harness
        .view
        .update_data(Some(rows(&[(3, "c"), (2, "b")])))
        .await
        .unwrap();

    assert_eq!(harness.view.selected_keys(), keys(&["2"]));
    assert_eq!(harness.view.selected_index_paths(), [at(1)]);
    assert_eq!(harness.host.last_selection(), Some(vec![1]));
}

#[tokio::test]
async fn test_auto_select_first_after_commit() {
    let config = card_config().with_auto_select_first(true);
    let harness = Harness::started_with(config, rows(&[(7, "g"), (8, "h")])).await;

    assert_eq!(harness.view.selected_keys(), keys(&["7"]));
    assert_eq!(harness.host.property("HasSelectedCells"), Some(Value::Bool(true)));
    assert_eq!(harness.host.last_selection(), Some(vec![0]));

    // An existing selection is left alone.
    harness
        .view
        .update_data(Some(rows(&[(8, "h"), (7, "g")])))
        .await
        .unwrap();
    assert_eq!(harness.view.selected_keys(), keys(&["7"]));
}

#[tokio::test]
async fn test_auto_select_skips_empty_data() {
    let config = card_config().with_auto_select_first(true);
    let harness = Harness::started_with(config, Vec::new()).await;

    assert!(harness.view.selected_keys().is_empty());
}

#[tokio::test]
async fn test_select_all_and_toggle_in_multi_mode() {
    let config = card_config().with_selection_mode(SelectionMode::Multi);
    let harness = Harness::started_with(config, rows(&[(1, "a"), (2, "b"), (3, "c")])).await;

    assert!(harness.view.select_all());
    assert_eq!(harness.view.selected_keys(), keys(&["1", "2", "3"]));

    assert!(harness.view.toggle_item(at(1)));
    assert_eq!(harness.view.selected_keys(), keys(&["1", "3"]));
    assert_eq!(harness.host.last_selection(), Some(vec![0, 2]));
}

#[tokio::test]
async fn test_selection_mode_session() {
    let config = card_config().with_selection_mode(SelectionMode::Single);
    let harness = Harness::started_with(config, rows(&[(1, "a"), (2, "b")])).await;

    assert!(harness.view.begin_selection_mode());
    harness.view.select_item(at(0));
    harness.view.select_item(at(1));
    assert_eq!(harness.view.selected_keys(), keys(&["1", "2"]));

    assert!(harness.view.finish_selection_mode());
    assert!(harness.view.selected_keys().is_empty());

    // Back in single mode.
    harness.view.select_item(at(0));
    harness.view.select_item(at(1));
    assert_eq!(harness.view.selected_keys(), keys(&["2"]));
}

#[tokio::test]
async fn test_external_selection() {
    let config = card_config()
        .with_selection_mode(SelectionMode::Multi)
        .with_component_id("list");
    let harness = Harness::started_with(config, rows(&[(1, "a"), (2, "b"), (3, "c")])).await;
    let published = harness.host.selections().len();

    assert!(!harness.view.apply_external_selection("list", &[0]));
    assert!(harness.view.apply_external_selection("chart", &[0, 2, 9]));

    assert_eq!(harness.view.selected_keys(), keys(&["1", "3"]));
    assert_eq!(harness.host.selections().len(), published);
    assert_eq!(harness.host.property("SelectedCellsCount"), Some(Value::from(2usize)));
}

#[tokio::test]
async fn test_selected_parameter_follows_selection() {
    let config = card_config()
        .with_selection_mode(SelectionMode::Single)
        .with_selected_parameter("IsSelected");
    let harness = Harness::started_with(config, rows(&[(1, "a")])).await;
    let cell = harness.view.cell_for_item(at(0)).unwrap();
    harness.view.display_cell(cell);

    harness.view.select_item(at(0));
    harness.view.deselect_item(at(0));

    assert_eq!(
        harness.runtime.parameter_values("Card", "IsSelected"),
        [false, true, false].map(Value::Bool)
    );
}

// =============================================================================
// Clicks
// =============================================================================

#[tokio::test]
async fn test_click_selects_and_fires_with_event_fields() {
    let config = card_config()
        .with_selection_mode(SelectionMode::Single)
        .with_event_field("name");
    let harness = Harness::started_with(config, rows(&[(1, "a"), (2, "b")])).await;

    harness.view.item_clicked(at(1), Click::Single);

    assert_eq!(harness.view.selected_keys(), keys(&["2"]));
    assert_eq!(harness.host.property("Event:name"), Some(Value::from("b")));
    assert_eq!(harness.host.events(), ["CellWasClicked"]);

    harness.view.item_clicked(at(0), Click::Double);
    assert_eq!(harness.view.selected_keys(), keys(&["2"]));
    assert_eq!(harness.host.property("Event:name"), Some(Value::from("a")));
    assert_eq!(harness.host.events(), ["CellWasClicked", "CellWasDoubleClicked"]);
}

#[tokio::test]
async fn test_right_click_only_fires_event() {
    let config = card_config()
        .with_selection_mode(SelectionMode::Single)
        .with_event_field("name");
    let harness = Harness::started_with(config, rows(&[(1, "a"), (2, "b")])).await;

    harness.view.item_clicked(at(1), Click::Right);

    assert!(harness.view.selected_keys().is_empty());
    assert_eq!(harness.host.property("Event:name"), Some(Value::from("b")));
    assert_eq!(harness.host.events(), ["CellWasRightClicked"]);
}
