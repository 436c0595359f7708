//! Editor: the drawing session state machine.
//!
//! DESIGN
//! ======
//! The editor owns at most one session. A session is a scratch layer in the
//! shared `LayerManager`, a list of item rows, and a form bound to the item
//! currently open:
//!
//! ```text
//!   Idle --load--> ListView --select_item--> FormView
//!     ^               ^  |                      |
//!     |               |  +---- save (ok) ----+  |
//!     +---- unload ---+                      |  +-- commit_item / discard / done --> ListView
//!     +--------------------------------------+
//! ```
//!
//! Every transition is a method guarded on the current state; an action
//! attempted in the wrong state returns `InvalidTransition` and changes
//! nothing. A row's feature is materialized lazily, on the first refresh
//! after it is opened, so an untouched new row never reaches the layer.
//!
//! Validation happens before any geometry is touched: a failed refresh
//! leaves the current feature exactly as it was.

#[cfg(test)]
#[path = "editor_test.rs"]
mod editor_test;

use std::fmt;

use tracing::{debug, info, warn};

use crate::api::{ApiError, CollectionId, CollectionPayload, RhodoneaRecord};
use crate::curve::{CurveError, CurveParams, generate};
use crate::error::ErrorCode;
use crate::features::FeatureId;
use crate::form::{CurveForm, FormField, ValidationError};
use crate::layers::LayerError;
use crate::state::AppContext;

/// Name of the layer holding the session's curves.
pub const SCRATCH_LAYER: &str = "_drawerLayer";

/// Row label until the item is committed with a name.
pub const NEW_ITEM_LABEL: &str = "Click to edit this curve";

pub const SAVE_SUCCESS: &str = "Rhodonea successfully added!";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Idle,
    ListView,
    FormView,
}

impl fmt::Display for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::ListView => "in list view",
            Self::FormView => "in form view",
        })
    }
}

pub type RowId = u64;

/// One entry of the session list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    pub id: RowId,
    /// Set once the row's curve has been materialized on the scratch layer.
    pub feature_id: Option<FeatureId>,
    /// Committed curve name.
    pub label: Option<String>,
}

impl ItemRow {
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(NEW_ITEM_LABEL)
    }
}

/// Result of closing a session: collections the timeline should highlight.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Unloaded {
    pub highlight_ids: Vec<CollectionId>,
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Layer(#[from] LayerError),
    #[error(transparent)]
    Curve(#[from] CurveError),
    #[error(transparent)]
    Remote(#[from] ApiError),
    #[error("no drawing session is open")]
    NotLoaded,
    #[error("unknown list item {0}")]
    UnknownRow(RowId),
    #[error("coordinates are locked, unlock them to edit {0}")]
    CoordinatesLocked(FormField),
    #[error("cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: EditorState },
}

impl ErrorCode for EditorError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.error_code(),
            Self::Layer(e) => e.error_code(),
            Self::Curve(e) => e.error_code(),
            Self::Remote(e) => e.error_code(),
            Self::NotLoaded => "E_EDITOR_NOT_LOADED",
            Self::UnknownRow(_) => "E_UNKNOWN_ROW",
            Self::CoordinatesLocked(_) => "E_COORDINATES_LOCKED",
            Self::InvalidTransition { .. } => "E_INVALID_TRANSITION",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Remote(e) => e.retryable(),
            _ => false,
        }
    }
}

// =============================================================================
// EDITOR
// =============================================================================

pub struct Editor {
    ctx: AppContext,
    state: EditorState,
    form: CurveForm,
    rows: Vec<ItemRow>,
    next_row: RowId,
    current_row: Option<RowId>,
    current_feature: Option<FeatureId>,
    /// Parameters captured when the current row was opened; `discard` restores them.
    backup: Option<CurveParams>,
    tracking_center: bool,
    title: String,
}

impl Editor {
    #[must_use]
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            state: EditorState::Idle,
            form: CurveForm::new(),
            rows: Vec::new(),
            next_row: 0,
            current_row: None,
            current_feature: None,
            backup: None,
            tracking_center: false,
            title: String::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> EditorState {
        self.state
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state != EditorState::Idle
    }

    #[must_use]
    pub fn form(&self) -> &CurveForm {
        &self.form
    }

    #[must_use]
    pub fn rows(&self) -> &[ItemRow] {
        &self.rows
    }

    #[must_use]
    pub fn current_row(&self) -> Option<RowId> {
        self.current_row
    }

    #[must_use]
    pub fn current_feature(&self) -> Option<&FeatureId> {
        self.current_feature.as_ref()
    }

    #[must_use]
    pub fn backup(&self) -> Option<&CurveParams> {
        self.backup.as_ref()
    }

    #[must_use]
    pub fn is_tracking_center(&self) -> bool {
        self.tracking_center
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    // -------------------------------------------------------------------------
    // Session
    // -------------------------------------------------------------------------

    /// Open a session: create the scratch layer and open a fresh item.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` if a session is already open, or `DuplicateName`
    /// if the scratch layer name is taken.
    pub fn load(&mut self) -> Result<(), EditorError> {
        self.expect_state(EditorState::Idle, "load the editor")?;
        self.ctx.layers().add_layer(SCRATCH_LAYER)?;
        self.state = EditorState::ListView;
        info!("editor loaded");

        let row = self.add_item()?;
        self.select_item(row)
    }

    /// Close the session: drop the scratch layer with all its curves and
    /// reset the list.
    pub fn unload(&mut self, highlight_ids: Vec<CollectionId>) -> Unloaded {
        self.ctx.layers().drop_layer(SCRATCH_LAYER);
        self.rows.clear();
        self.title.clear();
        self.backup = None;
        self.go_to_list();
        self.state = EditorState::Idle;
        info!(highlight = ?highlight_ids, "editor unloaded");
        Unloaded { highlight_ids }
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), EditorError> {
        self.expect_loaded()?;
        self.title = title.into();
        Ok(())
    }

    /// Publish every curve of the session as one collection, then unload.
    ///
    /// Failures are reported through the notifier and leave the session
    /// untouched so the user can correct and retry.
    ///
    /// # Errors
    ///
    /// `NoCurves` if the scratch layer is empty, `Remote` if the service
    /// rejects the collection.
    pub async fn save(&mut self) -> Result<CollectionId, EditorError> {
        self.expect_loaded()?;
        let payload = match self.build_payload() {
            Ok(payload) => payload,
            Err(e) => {
                self.ctx.notifier.error(&e.to_string());
                return Err(e);
            }
        };

        let result = {
            let _busy = self.ctx.busy.start();
            self.ctx.api.create_collection(&payload).await
        };

        match result {
            Ok(created) => {
                info!(id = created.id, curves = payload.rhodoneas.len(), "collection saved");
                self.ctx.notifier.success(SAVE_SUCCESS);
                self.unload(vec![created.id]);
                Ok(created.id)
            }
            Err(e) => {
                warn!(error = %e, "collection save failed");
                self.ctx.notifier.error(&e.flatten());
                Err(e.into())
            }
        }
    }

    fn build_payload(&self) -> Result<CollectionPayload, EditorError> {
        let layers = self.ctx.layers();
        let features = layers
            .layer(SCRATCH_LAYER)
            .map(|layer| layer.features())
            .unwrap_or_default();
        if features.is_empty() {
            return Err(ValidationError::NoCurves.into());
        }
        let rhodoneas = features
            .iter()
            .map(|feature| {
                feature
                    .curve_params()
                    .map(|params| RhodoneaRecord::from(&params))
                    .ok_or_else(|| LayerError::MalformedFeature(feature.id.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CollectionPayload { title: self.title.clone(), rhodoneas })
    }

    // -------------------------------------------------------------------------
    // List view
    // -------------------------------------------------------------------------

    /// Append an empty row to the list.
    pub fn add_item(&mut self) -> Result<RowId, EditorError> {
        self.expect_state(EditorState::ListView, "add an item")?;
        self.next_row += 1;
        let id = self.next_row;
        self.rows.push(ItemRow { id, feature_id: None, label: None });
        debug!(row = id, "item added");
        Ok(id)
    }

    /// Open a row in the form.
    ///
    /// A row with a curve loads that curve's parameters and locks the
    /// coordinates. A new row gets random parameters, a blank name, and
    /// unlocked coordinates that follow the map center.
    pub fn select_item(&mut self, row: RowId) -> Result<(), EditorError> {
        self.expect_state(EditorState::ListView, "select an item")?;
        let feature_id = self.row(row)?.feature_id.clone();

        let backup = if let Some(feature_id) = feature_id {
            let params = self
                .ctx
                .layers()
                .layer(SCRATCH_LAYER)
                .and_then(|layer| layer.feature(&feature_id))
                .and_then(|feature| feature.curve_params())
                .ok_or_else(|| LayerError::MalformedFeature(feature_id.clone()))?;
            self.form.populate(&params);
            self.set_coordinate_lock(true);
            self.current_feature = Some(feature_id);
            params
        } else {
            self.form.set_random(&mut rand::rng());
            self.form.clear_name();
            self.set_coordinate_lock(false);
            self.current_feature = None;
            self.form.validate(false)?
        };

        self.backup = Some(backup);
        self.current_row = Some(row);
        self.state = EditorState::FormView;
        debug!(row, feature = ?self.current_feature, "item selected");
        Ok(())
    }

    /// Delete a row and its curve, if it has one.
    pub fn remove_item(&mut self, row: RowId) -> Result<(), EditorError> {
        self.expect_state(EditorState::ListView, "remove an item")?;
        let index = self
            .rows
            .iter()
            .position(|r| r.id == row)
            .ok_or(EditorError::UnknownRow(row))?;
        let removed = self.rows.remove(index);
        if let Some(feature_id) = removed.feature_id {
            if let Some(mut scratch) = self.ctx.layers().layer_mut(SCRATCH_LAYER) {
                scratch.remove_feature(&feature_id);
            }
        }
        debug!(row, "item removed");
        Ok(())
    }

    /// Remove every row with its curve and clear the title.
    pub fn reset_list(&mut self) -> Result<(), EditorError> {
        self.expect_state(EditorState::ListView, "reset the list")?;
        let ids: Vec<RowId> = self.rows.iter().map(|r| r.id).collect();
        for id in ids {
            self.remove_item(id)?;
        }
        self.title.clear();
        info!("editor list reset");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Form view
    // -------------------------------------------------------------------------

    /// Rebuild the current curve from the form, or from `override_params`.
    ///
    /// The form is always validated first; on failure nothing is applied.
    /// The first successful refresh of a new row materializes its feature.
    pub fn refresh(&mut self, override_params: Option<&CurveParams>) -> Result<(), EditorError> {
        self.expect_state(EditorState::FormView, "refresh the curve")?;
        let from_form = self.form.validate(false)?;
        let params = override_params.cloned().unwrap_or(from_form);
        let curve = generate(&params)?;

        let mut layers = self.ctx.layers();
        let mut scratch = layers
            .layer_mut(SCRATCH_LAYER)
            .ok_or_else(|| LayerError::UnknownLayer(SCRATCH_LAYER.to_owned()))?;
        if let Some(feature_id) = &self.current_feature {
            scratch.update_geometry(feature_id, curve, params.to_props())?;
            return Ok(());
        }

        let feature_id = scratch.add_geometry(curve, params.to_props());
        if let Some(row) = self.current_row.and_then(|id| self.rows.iter_mut().find(|r| r.id == id)) {
            row.feature_id = Some(feature_id.clone());
        }
        self.current_feature = Some(feature_id);
        Ok(())
    }

    /// Change one field and refresh the preview.
    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) -> Result<(), EditorError> {
        self.expect_state(EditorState::FormView, "edit a field")?;
        if field.is_coordinate() && self.form.coordinates_locked() {
            return Err(EditorError::CoordinatesLocked(field));
        }
        self.form.set(field, value);
        self.refresh(None)
    }

    /// New random shape and stroke for the current item.
    pub fn randomize(&mut self) -> Result<(), EditorError> {
        self.expect_state(EditorState::FormView, "randomize the curve")?;
        self.form.set_random(&mut rand::rng());
        self.refresh(None)
    }

    /// Lock or unlock the center coordinates. Unlocked coordinates follow
    /// the map center, starting with the current one.
    pub fn lock_coordinates(&mut self, locked: bool) -> Result<(), EditorError> {
        self.expect_state(EditorState::FormView, "lock coordinates")?;
        self.set_coordinate_lock(locked);
        if !locked && self.current_feature.is_some() {
            self.refresh(None)?;
        }
        Ok(())
    }

    /// Map center moved. Recenters the current curve while tracking.
    pub fn on_center_changed(&mut self) -> Result<(), EditorError> {
        if !self.tracking_center || self.state != EditorState::FormView {
            return Ok(());
        }
        self.form.set_center(self.ctx.map.center());
        self.refresh(None)
    }

    /// Validate with the name required, label the row and go back to the list.
    pub fn commit_item(&mut self) -> Result<(), EditorError> {
        self.expect_state(EditorState::FormView, "commit an item")?;
        let params = match self.form.validate(true) {
            Ok(params) => params,
            Err(e) => {
                self.ctx.notifier.error(&e.to_string());
                return Err(e.into());
            }
        };
        self.refresh(None)?;
        if let Some(row) = self.current_row.and_then(|id| self.rows.iter_mut().find(|r| r.id == id)) {
            row.label = Some(params.name.clone());
        }
        info!(name = %params.name, "item committed");
        self.go_to_list();
        Ok(())
    }

    /// Restore the parameters captured when the item was opened and go back
    /// to the list. A curve that was never materialized stays absent.
    pub fn discard(&mut self) -> Result<(), EditorError> {
        self.expect_state(EditorState::FormView, "discard changes")?;
        if let Some(backup) = self.backup.clone() {
            self.form.populate(&backup);
            if self.current_feature.is_some() {
                self.refresh(Some(&backup))?;
            }
        }
        debug!("item changes discarded");
        self.go_to_list();
        Ok(())
    }

    /// Leave the form without further changes.
    pub fn done(&mut self) -> Result<(), EditorError> {
        self.expect_state(EditorState::FormView, "leave the form")?;
        self.go_to_list();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn go_to_list(&mut self) {
        self.current_feature = None;
        self.current_row = None;
        self.tracking_center = false;
        if self.state == EditorState::FormView {
            self.state = EditorState::ListView;
        }
    }

    fn set_coordinate_lock(&mut self, locked: bool) {
        self.form.lock_coordinates(locked);
        self.tracking_center = !locked;
        if !locked {
            self.form.set_center(self.ctx.map.center());
        }
    }

    fn row(&self, id: RowId) -> Result<&ItemRow, EditorError> {
        self.rows
            .iter()
            .find(|r| r.id == id)
            .ok_or(EditorError::UnknownRow(id))
    }

    fn expect_state(&self, expected: EditorState, action: &'static str) -> Result<(), EditorError> {
        if self.state == expected {
            return Ok(());
        }
        if self.state == EditorState::Idle {
            return Err(EditorError::NotLoaded);
        }
        Err(EditorError::InvalidTransition { action, state: self.state })
    }

    fn expect_loaded(&self) -> Result<(), EditorError> {
        if self.is_loaded() { Ok(()) } else { Err(EditorError::NotLoaded) }
    }
}
