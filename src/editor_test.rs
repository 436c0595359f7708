#![allow(clippy::float_cmp)]

use std::collections::BTreeMap;

use super::*;
use crate::geo::LatLng;
use crate::map::MapSurface;
use crate::state::test_helpers::{Harness, harness};

fn loaded() -> (Harness, Editor) {
    let h = harness();
    let mut editor = Editor::new(h.ctx.clone());
    editor.load().unwrap();
    (h, editor)
}

fn scratch_feature_count(h: &Harness) -> usize {
    h.ctx.layers().store().features_of(SCRATCH_LAYER).len()
}

/// Name the open item and commit it; returns its row.
fn commit_named(editor: &mut Editor, name: &str) -> RowId {
    let row = editor.current_row().unwrap();
    editor.set_field(FormField::Name, name).unwrap();
    editor.commit_item().unwrap();
    row
}

// =============================================================
// load / unload
// =============================================================

#[test]
fn load_opens_fresh_unmaterialized_item() {
    let (h, editor) = loaded();
    assert_eq!(editor.state(), EditorState::FormView);
    assert_eq!(editor.rows().len(), 1);
    assert_eq!(editor.rows()[0].label(), NEW_ITEM_LABEL);
    assert!(editor.current_feature().is_none());
    assert!(h.ctx.layers().contains(SCRATCH_LAYER));
    assert_eq!(scratch_feature_count(&h), 0);

    let form = editor.form();
    assert!(!form.coordinates_locked());
    assert!(editor.is_tracking_center());
    assert_eq!(form.value(FormField::Name), "");
    let r: f64 = form.value(FormField::R).parse().unwrap();
    assert!((1000.0..=4000.0).contains(&r));
    assert_eq!(form.value(FormField::Lat), "45.4642");
    assert_eq!(form.value(FormField::Lng), "9.19");
}

#[test]
fn load_twice_is_rejected() {
    let (_h, mut editor) = loaded();
    assert!(matches!(editor.load(), Err(EditorError::InvalidTransition { .. })));
}

#[test]
fn actions_need_a_session() {
    let h = harness();
    let mut editor = Editor::new(h.ctx.clone());
    assert!(matches!(editor.add_item(), Err(EditorError::NotLoaded)));
    assert!(matches!(editor.refresh(None), Err(EditorError::NotLoaded)));
    assert!(matches!(editor.set_title("x"), Err(EditorError::NotLoaded)));
}

#[test]
fn unload_drops_scratch_layer_and_resets() {
    let (h, mut editor) = loaded();
    commit_named(&mut editor, "a");
    editor.set_title("My roses").unwrap();

    let unloaded = editor.unload(vec![9]);
    assert_eq!(unloaded.highlight_ids, vec![9]);
    assert_eq!(editor.state(), EditorState::Idle);
    assert!(editor.rows().is_empty());
    assert_eq!(editor.title(), "");
    assert!(editor.backup().is_none());
    assert!(!h.ctx.layers().contains(SCRATCH_LAYER));
    assert_eq!(h.ctx.layers().store().len(), 0);

    // A new session can start again.
    editor.load().unwrap();
}

// =============================================================
// save
// =============================================================

#[tokio::test]
async fn save_without_curves_fails_and_keeps_session() {
    let (h, mut editor) = loaded();
    let err = editor.save().await.unwrap_err();
    assert!(matches!(err, EditorError::Validation(ValidationError::NoCurves)));
    assert!(err.to_string().contains("no curves"));

    assert_eq!(editor.state(), EditorState::FormView);
    assert!(h.ctx.layers().contains(SCRATCH_LAYER));
    assert!(h.api.created().is_empty());
    assert_eq!(h.notifier.errors().len(), 1);
}

#[tokio::test]
async fn save_publishes_one_collection_and_unloads() {
    let (h, mut editor) = loaded();
    let lat: f64 = editor.form().value(FormField::Lat).parse().unwrap();
    let lng: f64 = editor.form().value(FormField::Lng).parse().unwrap();
    commit_named(&mut editor, "first");
    editor.set_title("Garden").unwrap();

    let id = editor.save().await.unwrap();

    let created = h.api.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].title, "Garden");
    assert_eq!(created[0].rhodoneas.len(), 1);
    assert_eq!(created[0].rhodoneas[0].name, "first");
    assert_eq!(created[0].rhodoneas[0].point.coordinates, [lng, lat]);

    assert_eq!(h.notifier.successes(), vec![SAVE_SUCCESS.to_owned()]);
    assert_eq!(editor.state(), EditorState::Idle);
    assert!(!h.ctx.layers().contains(SCRATCH_LAYER));
    assert!(!h.ctx.busy.is_active());
    assert!(id > 0);
}

#[tokio::test]
async fn save_keeps_store_order() {
    let (h, mut editor) = loaded();
    commit_named(&mut editor, "one");
    let row = editor.add_item().unwrap();
    editor.select_item(row).unwrap();
    commit_named(&mut editor, "two");

    editor.save().await.unwrap();
    let names: Vec<String> = h.api.created()[0].rhodoneas.iter().map(|r| r.name.clone()).collect();
    assert_eq!(names, vec!["one", "two"]);
}

#[tokio::test]
async fn save_rejection_is_notified_and_session_survives() {
    let (h, mut editor) = loaded();
    commit_named(&mut editor, "first");
    let fields = BTreeMap::from([("title".to_owned(), vec!["This field may not be blank.".to_owned()])]);
    h.api.fail_create(ApiError::Rejected { status: 400, fields });

    let err = editor.save().await.unwrap_err();
    assert!(matches!(err, EditorError::Remote(ApiError::Rejected { .. })));
    assert_eq!(h.notifier.errors(), vec!["title: This field may not be blank.".to_owned()]);
    assert_eq!(editor.state(), EditorState::ListView);
    assert_eq!(scratch_feature_count(&h), 1);
    assert!(!h.ctx.busy.is_active());
}

// =============================================================
// refresh / fields
// =============================================================

#[test]
fn first_field_change_materializes_the_item() {
    let (h, mut editor) = loaded();
    editor.set_field(FormField::R, "1500").unwrap();

    let feature_id = editor.current_feature().cloned().unwrap();
    assert_eq!(editor.rows()[0].feature_id.as_ref(), Some(&feature_id));
    let layers = h.ctx.layers();
    let params = layers.feature(&feature_id).unwrap().curve_params().unwrap();
    assert_eq!(params.r, 1500.0);
    assert_eq!(layers.feature(&feature_id).unwrap().geometry, generate(&params).unwrap());
}

#[test]
fn invalid_field_applies_nothing() {
    let (h, mut editor) = loaded();
    editor.set_field(FormField::N, "7").unwrap();
    let feature_id = editor.current_feature().cloned().unwrap();
    let before = h.ctx.layers().feature(&feature_id).cloned().unwrap();

    let err = editor.set_field(FormField::R, "").unwrap_err();
    assert!(matches!(err, EditorError::Validation(ValidationError::InvalidFields(ref f)) if f == &vec![FormField::R]));
    assert_eq!(h.ctx.layers().feature(&feature_id), Some(&before));
}

#[test]
fn randomize_rebuilds_geometry() {
    let (h, mut editor) = loaded();
    editor.randomize().unwrap();
    let feature_id = editor.current_feature().cloned().unwrap();
    let params = editor.form().clone().validate(false).unwrap();
    assert_eq!(h.ctx.layers().feature(&feature_id).unwrap().curve_params(), Some(params));
}

#[test]
fn commit_requires_a_name() {
    let (h, mut editor) = loaded();
    let err = editor.commit_item().unwrap_err();
    assert!(matches!(err, EditorError::Validation(ValidationError::InvalidFields(ref f)) if f == &vec![FormField::Name]));
    assert_eq!(editor.state(), EditorState::FormView);
    assert_eq!(editor.rows()[0].label(), NEW_ITEM_LABEL);
    assert_eq!(h.notifier.errors(), vec!["please correct the errors below: name".to_owned()]);
}

#[test]
fn commit_labels_row_and_returns_to_list() {
    let (_h, mut editor) = loaded();
    let row = commit_named(&mut editor, "clover");
    assert_eq!(editor.state(), EditorState::ListView);
    assert_eq!(editor.rows()[0].id, row);
    assert_eq!(editor.rows()[0].label(), "clover");
    assert!(editor.current_feature().is_none());
    assert!(!editor.is_tracking_center());
}

// =============================================================
// coordinates
// =============================================================

#[test]
fn existing_item_opens_with_locked_coordinates() {
    let (_h, mut editor) = loaded();
    let row = commit_named(&mut editor, "a");
    editor.select_item(row).unwrap();

    assert!(editor.form().coordinates_locked());
    assert!(!editor.is_tracking_center());
    let err = editor.set_field(FormField::Lat, "10").unwrap_err();
    assert!(matches!(err, EditorError::CoordinatesLocked(FormField::Lat)));
}

#[test]
fn unlocking_tracks_the_map_center() {
    let (h, mut editor) = loaded();
    let row = commit_named(&mut editor, "a");
    editor.select_item(row).unwrap();
    editor.lock_coordinates(false).unwrap();
    assert!(editor.is_tracking_center());

    h.map.pan_to(LatLng::new(46.0, 10.5));
    editor.on_center_changed().unwrap();

    let feature_id = editor.current_feature().cloned().unwrap();
    let params = h.ctx.layers().feature(&feature_id).unwrap().curve_params().unwrap();
    assert_eq!(params.center, h.map.center());

    editor.lock_coordinates(true).unwrap();
    h.map.pan_to(LatLng::new(0.0, 0.0));
    editor.on_center_changed().unwrap();
    let params = h.ctx.layers().feature(&feature_id).unwrap().curve_params().unwrap();
    assert_eq!(params.center, LatLng::new(46.0, 10.5));
}

#[test]
fn center_change_outside_form_is_ignored() {
    let (h, mut editor) = loaded();
    editor.done().unwrap();
    h.map.pan_to(LatLng::new(1.0, 1.0));
    editor.on_center_changed().unwrap();
    assert_eq!(scratch_feature_count(&h), 0);
}

// =============================================================
// discard
// =============================================================

#[test]
fn discard_restores_the_backup_exactly() {
    let (h, mut editor) = loaded();
    let row = commit_named(&mut editor, "original");
    editor.select_item(row).unwrap();
    let backup = editor.backup().cloned().unwrap();
    let feature_id = editor.current_feature().cloned().unwrap();

    editor.set_field(FormField::R, "3333").unwrap();
    editor.set_field(FormField::StrokeColor, "#000000").unwrap();
    editor.set_field(FormField::Name, "changed").unwrap();
    assert_ne!(h.ctx.layers().feature(&feature_id).unwrap().curve_params(), Some(backup.clone()));

    editor.discard().unwrap();

    assert_eq!(editor.state(), EditorState::ListView);
    let layers = h.ctx.layers();
    let feature = layers.feature(&feature_id).unwrap();
    assert_eq!(feature.curve_params(), Some(backup.clone()));
    assert_eq!(feature.geometry, generate(&backup).unwrap());
}

#[test]
fn discard_of_untouched_new_item_creates_nothing() {
    let (h, mut editor) = loaded();
    editor.discard().unwrap();
    assert_eq!(editor.state(), EditorState::ListView);
    assert_eq!(scratch_feature_count(&h), 0);
    assert!(editor.rows()[0].feature_id.is_none());
}

// =============================================================
// list operations
// =============================================================

#[test]
fn remove_item_drops_its_curve() {
    let (h, mut editor) = loaded();
    let row = commit_named(&mut editor, "gone");
    assert_eq!(scratch_feature_count(&h), 1);

    editor.remove_item(row).unwrap();
    assert!(editor.rows().is_empty());
    assert_eq!(scratch_feature_count(&h), 0);
    assert!(matches!(editor.remove_item(row), Err(EditorError::UnknownRow(_))));
}

#[test]
fn reset_list_clears_rows_curves_and_title() {
    let (h, mut editor) = loaded();
    commit_named(&mut editor, "a");
    let row = editor.add_item().unwrap();
    editor.select_item(row).unwrap();
    commit_named(&mut editor, "b");
    editor.add_item().unwrap();
    editor.set_title("t").unwrap();

    editor.reset_list().unwrap();
    assert!(editor.rows().is_empty());
    assert_eq!(editor.title(), "");
    assert_eq!(scratch_feature_count(&h), 0);
    assert!(h.ctx.layers().contains(SCRATCH_LAYER));
}

#[test]
fn list_actions_are_guarded_in_form_view() {
    let (_h, mut editor) = loaded();
    assert!(matches!(
        editor.add_item(),
        Err(EditorError::InvalidTransition { state: EditorState::FormView, .. })
    ));
    editor.done().unwrap();
    assert!(matches!(editor.commit_item(), Err(EditorError::InvalidTransition { .. })));
    assert!(matches!(editor.select_item(99), Err(EditorError::UnknownRow(99))));
}
