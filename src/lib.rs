//! Rose-curve map layer editor.
//!
//! Users draw rhodonea curves centered on a map, group them into a named
//! collection and publish it to a layers service. Published collections are
//! listed on a timeline filtered by the current viewport and can be overlaid
//! on the map one at a time. The host (a map widget, or the bundled CLI)
//! supplies the viewport through [`map::MapSurface`] and forwards user
//! actions to [`app::Mapper`].
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`app`] | Top-level [`app::Mapper`] wiring editor and timeline hand-off |
//! | [`editor`] | Drawing session state machine |
//! | [`timeline`] | Paginated collection list and overlay reconciliation |
//! | [`form`] | Curve parameter form with validation and randomization |
//! | [`layers`] | Named layers over the shared feature store, per-feature styles |
//! | [`features`] | Feature store: curves plus their property bags |
//! | [`curve`] | Curve parameters and the rose-curve sampler |
//! | [`geo`] | Coordinates, bounding boxes and `GeoJSON` geometry |
//! | [`api`] | Layers service trait, HTTP client and wire types |
//! | [`state`] | Shared [`state::AppContext`] handed to editor and timeline |
//! | [`map`] | Map surface trait and an in-memory viewport |
//! | [`busy`] | Reference-counted busy indicator |
//! | [`notice`] | User-facing success and error notices |
//! | [`config`] | Environment-driven configuration |
//! | [`error`] | Stable error codes |

pub mod api;
pub mod app;
pub mod busy;
pub mod config;
pub mod curve;
pub mod editor;
pub mod error;
pub mod features;
pub mod form;
pub mod geo;
pub mod layers;
pub mod map;
pub mod notice;
pub mod state;
pub mod timeline;
