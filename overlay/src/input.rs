//! Input model: surfaces, swipe gestures, resize debouncing, and layout.
//!
//! `Surface` captures which interaction style applies at the current viewport
//! width. `SwipeTracker` is the touch gesture tracked between touch-start and
//! touch-end. `Debouncer` hands out tokens so only the latest of a burst of
//! timer callbacks takes effect.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::consts::{NARROW_LAYOUT_PX, WIDE_LAYOUT_PX};
use crate::mapper::Point;

/// Which interaction style is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Surface {
    /// Hover/click popups plus the sidebar.
    #[default]
    Desktop,
    /// Full-screen overlay and swipe navigation.
    Mobile,
}

impl Surface {
    /// Mobile at or below `breakpoint` CSS pixels.
    #[must_use]
    pub fn for_width(width: f64, breakpoint: f64) -> Self {
        if width <= breakpoint { Self::Mobile } else { Self::Desktop }
    }

    #[must_use]
    pub fn is_mobile(self) -> bool {
        self == Self::Mobile
    }
}

/// Page navigation requested by a gesture or control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStep {
    Next,
    Prev,
}

/// Tracks one touch from start to end.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwipeTracker {
    start: Option<Point>,
}

impl SwipeTracker {
    pub fn start(&mut self, at: Point) {
        self.start = Some(at);
    }

    pub fn cancel(&mut self) {
        self.start = None;
    }

    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.start.is_some()
    }

    /// Finish the gesture. Leftward travel beyond `threshold` pages forward,
    /// rightward pages back; vertical-dominant drags are ignored.
    pub fn finish(&mut self, at: Point, threshold: f64) -> Option<PageStep> {
        let start = self.start.take()?;
        let dx = at.x - start.x;
        let dy = at.y - start.y;
        if dx.abs() <= threshold || dx.abs() <= dy.abs() {
            return None;
        }
        Some(if dx < 0.0 { PageStep::Next } else { PageStep::Prev })
    }
}

/// Token source for debounced callbacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Debouncer {
    latest: u64,
}

impl Debouncer {
    /// Start a new quiet period, superseding any earlier token.
    pub fn bump(&mut self) -> u64 {
        self.latest = self.latest.wrapping_add(1);
        self.latest
    }

    #[must_use]
    pub fn is_current(&self, token: u64) -> bool {
        token == self.latest
    }
}

/// Flex direction for the page layout container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

impl FlexDirection {
    #[must_use]
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Row => "row",
            Self::Column => "column",
        }
    }
}

/// Side-by-side only on wide windows showing an image at least 500px wide.
#[must_use]
pub fn layout_direction(window_width: f64, image_width: Option<f64>) -> FlexDirection {
    if (NARROW_LAYOUT_PX..WIDE_LAYOUT_PX).contains(&window_width) {
        return FlexDirection::Column;
    }
    if image_width.is_some_and(|w| w > 0.0 && w < NARROW_LAYOUT_PX) {
        return FlexDirection::Column;
    }
    if window_width >= WIDE_LAYOUT_PX { FlexDirection::Row } else { FlexDirection::Column }
}
