//! Shared numeric constants for the overlay crate.
//!
//! Values that a deployment may want to tune are mirrored as defaults in
//! [`crate::config::ViewerConfig`]; the ones here are fixed by the marker and
//! popup geometry.

// ── Markers ─────────────────────────────────────────────────────

/// Diameter of a `main` marker in CSS pixels.
pub const MAIN_MARKER_PX: f64 = 100.0;

/// Diameter of a `comment` marker in CSS pixels.
pub const COMMENT_MARKER_PX: f64 = 50.0;

/// Diameter of a legacy `small` marker in CSS pixels.
pub const SMALL_MARKER_PX: f64 = 25.0;

/// Diameter used for unrecognized annotation types.
pub const DEFAULT_MARKER_PX: f64 = 50.0;

/// Marker label font size as a fraction of the diameter.
pub const MARKER_FONT_RATIO: f64 = 0.6;

/// Base color for `main` markers (crimson).
pub const MAIN_COLOR: &str = "#DC143C";

/// Base color for every other marker (blue).
pub const OTHER_COLOR: &str = "#0000FF";

// ── Popups ──────────────────────────────────────────────────────

/// Gap between a marker edge and its popup, in CSS pixels.
pub const POPUP_GAP_PX: f64 = 10.0;

/// Text length above which a desktop popup is widened.
pub const WIDE_TEXT_THRESHOLD: usize = 600;

/// Widened popup width as a fraction of the displayed image width.
pub const WIDE_POPUP_RATIO: f64 = 0.6;

/// Upper bound on waiting for embedded popup images to settle.
pub const IMAGE_WAIT_TIMEOUT_MS: u32 = 3_000;

/// Extra room added below an overflowing popup.
pub const SPACER_PADDING_PX: f64 = 50.0;

/// Delay between leaving a marker and hiding its hover popup.
pub const HOVER_GRACE_MS: u32 = 150;

// ── Layout / input ──────────────────────────────────────────────

/// Viewports at or below this width use the mobile surface.
pub const MOBILE_BREAKPOINT_PX: f64 = 768.0;

/// Minimum horizontal travel for a swipe to count as navigation.
pub const SWIPE_THRESHOLD_PX: f64 = 50.0;

/// Quiet period after the last resize before markers are rebuilt.
pub const RESIZE_DEBOUNCE_MS: u32 = 250;

/// Content-region bboxes arrive in half-resolution units.
pub const REGION_SCALE: f64 = 2.0;

/// Widths below this always stack the layout vertically.
pub const NARROW_LAYOUT_PX: f64 = 500.0;

/// Widths at or above this always lay out side by side.
pub const WIDE_LAYOUT_PX: f64 = 1024.0;
