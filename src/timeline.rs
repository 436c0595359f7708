//! Timeline: paginated, viewport-filtered list of published collections.
//!
//! DESIGN
//! ======
//! Each row can overlay its collection on the map as a layer named
//! `Layer__{id}`. After every page the overlays are reconciled against the
//! rows: a registered overlay whose row is on screen is shown as on, and
//! one whose row is not is dropped. No overlay outlives the row that
//! accounts for it.
//!
//! The timeline is disabled while an editor session is open, so the two
//! never restructure the layer manager at the same time.
//!
//! TRADE-OFFS
//! ==========
//! Responses are applied in arrival order. A page requested for an older
//! viewport that lands after a newer one is applied as-is.

#[cfg(test)]
#[path = "timeline_test.rs"]
mod timeline_test;

use reqwest::Url;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::api::{ApiError, CollectionId, CollectionSummary, RhodoneaRecord, TimelineFilters};
use crate::curve::{CurveError, CurveParams, generate};
use crate::error::ErrorCode;
use crate::geo::Bbox;
use crate::layers::{LayerError, LayerManager};
use crate::state::AppContext;

/// Prefix of overlay layer names; the collection id follows it.
pub const OVERLAY_PREFIX: &str = "Layer__";

/// Shown in place of rows when the first page comes back empty.
pub const EMPTY_NOTICE: &str = "No layers are available in this bounding box, why don't you create the first one?";

#[must_use]
pub fn overlay_layer_name(id: CollectionId) -> String {
    format!("{OVERLAY_PREFIX}{id}")
}

/// Collection id of an overlay layer name, `None` for any other layer.
#[must_use]
pub fn overlay_id(layer_name: &str) -> Option<CollectionId> {
    layer_name.strip_prefix(OVERLAY_PREFIX)?.parse().ok()
}

// =============================================================================
// ROWS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    Off,
    /// Collection is being fetched; the toggle is disabled meanwhile.
    Pending,
    On,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineRow {
    pub id: CollectionId,
    pub title: String,
    pub created: Option<OffsetDateTime>,
    /// Overlay count as reported by the server plus local toggles.
    pub visits: u64,
    pub bbox: Option<Bbox>,
    pub toggle: ToggleState,
}

impl From<CollectionSummary> for TimelineRow {
    fn from(summary: CollectionSummary) -> Self {
        let bbox = summary.bbox();
        Self {
            id: summary.id,
            title: summary.title,
            created: summary.created,
            visits: summary.overlays_count,
            bbox,
            toggle: ToggleState::Off,
        }
    }
}

impl TimelineRow {
    #[must_use]
    pub fn layer_name(&self) -> String {
        overlay_layer_name(self.id)
    }

    /// Relative creation time ("3 hours ago"), empty when unknown.
    #[must_use]
    pub fn age_label(&self, now: OffsetDateTime) -> String {
        self.created
            .map(|created| relative_age((now - created).whole_seconds()))
            .unwrap_or_default()
    }
}

/// Humanize an age in seconds with the thresholds map UIs commonly use.
fn relative_age(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let minutes = (seconds + 30) / 60;
    let hours = (minutes + 30) / 60;
    let days = (hours + 12) / 24;
    let months = (days * 10 + 152) / 304;
    let years = (days * 100 + 18_262) / 36_525;

    if seconds < 45 {
        "a few seconds ago".to_owned()
    } else if minutes <= 1 {
        "a minute ago".to_owned()
    } else if minutes < 45 {
        format!("{minutes} minutes ago")
    } else if hours <= 1 {
        "an hour ago".to_owned()
    } else if hours < 22 {
        format!("{hours} hours ago")
    } else if days <= 1 {
        "a day ago".to_owned()
    } else if days < 26 {
        format!("{days} days ago")
    } else if months <= 1 {
        "a month ago".to_owned()
    } else if months < 11 {
        format!("{months} months ago")
    } else if years <= 1 {
        "a year ago".to_owned()
    } else {
        format!("{years} years ago")
    }
}

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error(transparent)]
    Remote(#[from] ApiError),
    #[error(transparent)]
    Layer(#[from] LayerError),
    #[error(transparent)]
    Curve(#[from] CurveError),
    #[error("collection {0} is not listed")]
    UnknownRow(CollectionId),
    #[error("collection {0} has no envelope")]
    NoEnvelope(CollectionId),
    #[error("malformed next-page link: {0}")]
    InvalidNextLink(String),
}

impl ErrorCode for TimelineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Remote(e) => e.error_code(),
            Self::Layer(e) => e.error_code(),
            Self::Curve(e) => e.error_code(),
            Self::UnknownRow(_) => "E_UNKNOWN_COLLECTION",
            Self::NoEnvelope(_) => "E_NO_ENVELOPE",
            Self::InvalidNextLink(_) => "E_INVALID_NEXT_LINK",
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
// TIMELINE
// =============================================================================

pub struct Timeline {
    ctx: AppContext,
    active: bool,
    filters: TimelineFilters,
    rows: Vec<TimelineRow>,
    /// Server link to the next page; `None` hides "load more".
    next: Option<String>,
}

impl Timeline {
    #[must_use]
    pub fn new(ctx: AppContext, page_limit: u32) -> Self {
        Self { ctx, active: true, filters: TimelineFilters::new(page_limit), rows: Vec::new(), next: None }
    }

    pub fn enable(&mut self) {
        self.active = true;
    }

    pub fn disable(&mut self) {
        self.active = false;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn filters(&self) -> &TimelineFilters {
        &self.filters
    }

    #[must_use]
    pub fn rows(&self) -> &[TimelineRow] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, id: CollectionId) -> Option<&TimelineRow> {
        self.rows.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    #[must_use]
    pub fn next_link(&self) -> Option<&str> {
        self.next.as_deref()
    }

    /// Placeholder text when there is nothing to list.
    #[must_use]
    pub fn empty_notice(&self) -> Option<&'static str> {
        self.rows.is_empty().then_some(EMPTY_NOTICE)
    }

    /// Restrict to the current map bounds and restart from the first page.
    pub fn update_in_bbox_filter(&mut self) {
        self.filters.offset = 0;
        self.filters.in_bbox = self.ctx.map.bounds();
    }

    /// Change the search text and restart from the first page.
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.filters.search = search.into();
        self.filters.offset = 0;
    }

    /// Fetch the page selected by the filters and reconcile overlays with it.
    ///
    /// The first page replaces the rows; later pages append, skipping ids
    /// already listed. Rows in `show_ids` are toggled on afterwards.
    ///
    /// # Errors
    ///
    /// Returns `Remote` if the listing fails; rows and overlays are left as
    /// they were before the call.
    pub async fn refresh(&mut self, show_ids: &[CollectionId]) -> Result<(), TimelineError> {
        if !self.active {
            debug!("timeline disabled, refresh skipped");
            return Ok(());
        }
        let result = {
            let _busy = self.ctx.busy.start();
            self.ctx.api.list_collections(&self.filters).await
        };
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "timeline page failed");
                self.ctx.notifier.error(&e.flatten());
                return Err(e.into());
            }
        };

        if self.filters.is_first_page() {
            self.rows.clear();
        }
        self.next = page.next;
        let received = page.results.len();
        for summary in page.results {
            if self.row(summary.id).is_none() {
                self.rows.push(summary.into());
            }
        }
        self.reconcile_overlays();
        info!(
            offset = self.filters.offset,
            received,
            rows = self.rows.len(),
            more = self.next.is_some(),
            "timeline page received"
        );

        for &id in show_ids {
            if self.row(id).is_none() {
                debug!(id, "highlighted collection not in page");
                continue;
            }
            if let Err(e) = self.toggle_on(id).await {
                warn!(id, error = %e, "could not show highlighted collection");
            }
        }
        Ok(())
    }

    /// Follow the server's next-page link.
    ///
    /// Returns false when there is no further page.
    ///
    /// # Errors
    ///
    /// `InvalidNextLink` if the link has no offset, otherwise as
    /// [`Timeline::refresh`].
    pub async fn load_more(&mut self) -> Result<bool, TimelineError> {
        let Some(next) = self.next.clone() else {
            return Ok(false);
        };
        let (offset, limit) = parse_next_link(&next)?;
        self.filters.offset = offset;
        if let Some(limit) = limit {
            self.filters.limit = limit;
        }
        self.refresh(&[]).await?;
        Ok(true)
    }

    /// The map stopped moving: re-filter by its bounds from the first page.
    ///
    /// # Errors
    ///
    /// As [`Timeline::refresh`].
    pub async fn on_viewport_idle(&mut self) -> Result<(), TimelineError> {
        self.update_in_bbox_filter();
        self.refresh(&[]).await
    }

    /// Overlay a listed collection on the map.
    ///
    /// The visit counter is bumped as soon as the toggle flips; if the fetch
    /// fails the counter and toggle roll back and the error is notified.
    ///
    /// # Errors
    ///
    /// `UnknownRow` if the id is not listed, `Remote` or `Curve` if the
    /// collection could not be fetched or rebuilt.
    pub async fn toggle_on(&mut self, id: CollectionId) -> Result<(), TimelineError> {
        let name = overlay_layer_name(id);
        let index = self.index_of(id)?;
        if self.ctx.layers().contains(&name) {
            self.rows[index].toggle = ToggleState::On;
            return Ok(());
        }

        self.rows[index].toggle = ToggleState::Pending;
        self.rows[index].visits += 1;

        let fetched = {
            let _busy = self.ctx.busy.start();
            self.ctx.api.fetch_collection(id).await
        };
        let built = match fetched {
            Ok(detail) => build_overlay(&mut self.ctx.layers(), &name, &detail.rhodoneas),
            Err(e) => Err(e.into()),
        };

        let row = &mut self.rows[index];
        match built {
            Ok(curves) => {
                row.toggle = ToggleState::On;
                info!(id, curves, "overlay on");
                Ok(())
            }
            Err(e) => {
                row.toggle = ToggleState::Off;
                row.visits = row.visits.saturating_sub(1);
                warn!(id, error = %e, "overlay failed");
                let message = match &e {
                    TimelineError::Remote(api) => api.flatten(),
                    other => other.to_string(),
                };
                self.ctx.notifier.error(&message);
                Err(e)
            }
        }
    }

    /// Remove a collection's overlay. Returns whether one was attached.
    pub fn toggle_off(&mut self, id: CollectionId) -> bool {
        let dropped = self.ctx.layers().drop_layer(&overlay_layer_name(id));
        if let Some(row) = self.rows.iter_mut().find(|r| r.id == id) {
            row.toggle = ToggleState::Off;
        }
        if dropped {
            info!(id, "overlay off");
        }
        dropped
    }

    /// Fit the map to a listed collection's envelope.
    ///
    /// # Errors
    ///
    /// `UnknownRow` if the id is not listed, `NoEnvelope` if the service did
    /// not report one.
    pub fn fly_to(&self, id: CollectionId) -> Result<Bbox, TimelineError> {
        let row = self.row(id).ok_or(TimelineError::UnknownRow(id))?;
        let bbox = row.bbox.ok_or(TimelineError::NoEnvelope(id))?;
        self.ctx.map.fit_bounds(bbox);
        Ok(bbox)
    }

    fn index_of(&self, id: CollectionId) -> Result<usize, TimelineError> {
        self.rows
            .iter()
            .position(|r| r.id == id)
            .ok_or(TimelineError::UnknownRow(id))
    }

    /// Show listed overlays as on; drop overlays whose row is gone.
    fn reconcile_overlays(&mut self) {
        let mut layers = self.ctx.layers();
        let overlays: Vec<String> = layers
            .layers()
            .into_iter()
            .filter(|layer| layer.name.starts_with(OVERLAY_PREFIX))
            .map(|layer| layer.name.clone())
            .collect();

        for name in overlays {
            let listed = overlay_id(&name).and_then(|id| self.rows.iter_mut().find(|r| r.id == id));
            match listed {
                Some(row) => row.toggle = ToggleState::On,
                None => {
                    layers.drop_layer(&name);
                    debug!(layer = %name, "stale overlay dropped");
                }
            }
        }
    }
}

/// Materialize a stored collection as the layer `name`.
///
/// Every curve is rebuilt before the layer is registered, so a bad record
/// leaves no half-built overlay behind. Returns the number of curves.
///
/// # Errors
///
/// `Curve` if a record cannot be sampled, `Layer` if `name` is taken.
pub fn build_overlay(layers: &mut LayerManager, name: &str, records: &[RhodoneaRecord]) -> Result<usize, TimelineError> {
    let curves = records
        .iter()
        .map(|record| {
            let params = CurveParams::from(record);
            generate(&params).map(|curve| (curve, params))
        })
        .collect::<Result<Vec<_>, _>>()?;

    layers.add_layer(name)?;
    let mut overlay = layers
        .layer_mut(name)
        .ok_or_else(|| LayerError::UnknownLayer(name.to_owned()))?;
    for (curve, params) in &curves {
        overlay.add_geometry(curve.clone(), params.to_props());
    }
    Ok(curves.len())
}

/// Offset and limit carried by a next-page link.
///
/// # Errors
///
/// `InvalidNextLink` if the link does not parse or has no numeric offset.
pub fn parse_next_link(link: &str) -> Result<(u32, Option<u32>), TimelineError> {
    let invalid = || TimelineError::InvalidNextLink(link.to_owned());
    let url = Url::parse(link)
        .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(link)))
        .map_err(|_| invalid())?;

    let mut offset = None;
    let mut limit = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "offset" => offset = Some(value.parse::<u32>().map_err(|_| invalid())?),
            "limit" => limit = Some(value.parse::<u32>().map_err(|_| invalid())?),
            _ => {}
        }
    }
    Ok((offset.ok_or_else(invalid)?, limit))
}
