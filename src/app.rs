//! Top-level wiring of the editor and the timeline.
//!
//! DESIGN
//! ======
//! `Mapper` owns one `Editor` and one `Timeline`, both built from the same
//! `AppContext`. It enforces the hand-off between them: the timeline is
//! disabled for as long as an editor session is open, and re-enabled and
//! refreshed once the session closes, highlighting whatever was just saved.
//!
//! During boot the first listing is driven by the initial viewport, so an
//! unload that happens before boot completes does not trigger a second one.

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;

use tracing::{info, warn};

use crate::api::CollectionId;
use crate::config::MapperConfig;
use crate::editor::{Editor, EditorError};
use crate::error::ErrorCode;
use crate::state::AppContext;
use crate::timeline::{Timeline, TimelineError};

#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

impl ErrorCode for MapperError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Editor(e) => e.error_code(),
            Self::Timeline(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Editor(e) => e.retryable(),
            Self::Timeline(e) => e.retryable(),
        }
    }
}

pub struct Mapper {
    ctx: AppContext,
    editor: Editor,
    timeline: Timeline,
    booting: bool,
}

impl Mapper {
    #[must_use]
    pub fn new(ctx: AppContext, config: &MapperConfig) -> Self {
        Self {
            editor: Editor::new(ctx.clone()),
            timeline: Timeline::new(ctx.clone(), config.page_limit),
            ctx,
            booting: true,
        }
    }

    #[must_use]
    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    #[must_use]
    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    #[must_use]
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    #[must_use]
    pub fn is_booting(&self) -> bool {
        self.booting
    }

    /// List the collections around the initial viewport.
    ///
    /// # Errors
    ///
    /// Returns the timeline error if the first page fails; the mapper still
    /// leaves boot so later refreshes proceed normally.
    pub async fn boot(&mut self) -> Result<(), MapperError> {
        self.timeline.enable();
        let result = self.timeline.on_viewport_idle().await;
        self.booting = false;
        info!(rows = self.timeline.rows().len(), "mapper booted");
        result.map_err(Into::into)
    }

    /// Open a drawing session; the timeline pauses until it closes.
    ///
    /// # Errors
    ///
    /// Returns the editor error if the session could not be opened. The
    /// timeline resumes unless a session was already open.
    pub fn open_editor(&mut self) -> Result<(), MapperError> {
        self.timeline.disable();
        if let Err(e) = self.editor.load() {
            if !self.editor.is_loaded() {
                self.timeline.enable();
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Close the drawing session without saving.
    ///
    /// # Errors
    ///
    /// As [`Timeline::refresh`].
    pub async fn close_editor(&mut self) -> Result<(), MapperError> {
        let unloaded = self.editor.unload(Vec::new());
        self.after_unload(&unloaded.highlight_ids).await
    }

    /// Open the editor when closed, close it when open.
    ///
    /// # Errors
    ///
    /// As [`Mapper::open_editor`] and [`Mapper::close_editor`].
    pub async fn toggle_drawer(&mut self) -> Result<(), MapperError> {
        if self.editor.is_loaded() {
            self.close_editor().await
        } else {
            self.open_editor()
        }
    }

    /// Save the session and show the new collection on the timeline.
    ///
    /// A failed timeline refresh after a successful save is logged, not
    /// returned: the collection is already stored.
    ///
    /// # Errors
    ///
    /// Returns the editor error if the save fails; the session stays open.
    pub async fn save(&mut self) -> Result<CollectionId, MapperError> {
        let id = self.editor.save().await?;
        if let Err(e) = self.after_unload(&[id]).await {
            warn!(id, error = %e, "timeline refresh after save failed");
        }
        Ok(id)
    }

    /// The map stopped moving.
    ///
    /// # Errors
    ///
    /// As [`Timeline::refresh`].
    pub async fn on_viewport_idle(&mut self) -> Result<(), MapperError> {
        if !self.timeline.is_active() {
            return Ok(());
        }
        self.timeline.on_viewport_idle().await.map_err(Into::into)
    }

    /// The map center moved; forwarded to an open editor.
    ///
    /// # Errors
    ///
    /// As [`Editor::on_center_changed`].
    pub fn on_center_changed(&mut self) -> Result<(), MapperError> {
        if !self.editor.is_loaded() {
            return Ok(());
        }
        self.editor.on_center_changed().map_err(Into::into)
    }

    async fn after_unload(&mut self, highlight_ids: &[CollectionId]) -> Result<(), MapperError> {
        self.timeline.enable();
        if self.booting {
            return Ok(());
        }
        self.timeline.update_in_bbox_filter();
        self.timeline.refresh(highlight_ids).await.map_err(Into::into)
    }
}
