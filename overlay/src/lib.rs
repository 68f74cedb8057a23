//! Annotation overlay engine for scanned page images.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It places
//! numbered markers over a page image, positions their popups, routes pointer
//! and touch input, and drives the annotation editor from draft to saved
//! record. The Leptos client owns the panels (sidebar, editor form, login,
//! mobile overlay) and the timers; it feeds DOM events into the engine and
//! carries out the [`engine::Action`]s that come back.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`doc`] | Annotations, content regions and the per-page store |
//! | [`mapper`] | Original-to-display coordinate mapping |
//! | [`marker`] | Marker anchors, sizes, colors and ids |
//! | [`popup`] | Popup placement, visibility and overflow spacers |
//! | [`hit`] | Hit-testing clicks against markers and the image |
//! | [`input`] | Surfaces, swipes, resize debouncing and layout direction |
//! | [`draft`] | Editor draft state machine and validation |
//! | [`sync`] | Staging, saving and the [`sync::Backend`] seam |
//! | [`mock`] | In-process backend for demos and tests |
//! | [`format`] | Comment text to HTML |
//! | [`config`] | Viewer configuration and host inputs |
//! | [`render`] | DOM writes for overlay actions |
//! | [`consts`] | Marker and popup geometry |

pub mod config;
pub mod consts;
pub mod doc;
pub mod draft;
pub mod engine;
pub mod format;
pub mod hit;
pub mod input;
pub mod mapper;
pub mod marker;
pub mod mock;
pub mod popup;
pub mod render;
pub mod sync;
