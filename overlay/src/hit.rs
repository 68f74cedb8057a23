#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::mapper::{Point, Size};
use crate::marker::MarkerView;

/// What a point on the image container lands on.
#[derive(Debug, Clone, PartialEq)]
pub enum Hit {
    /// A marker, identified by its popup id.
    Marker(String),
    /// Empty image area, in displayed-image pixels.
    Image(Point),
    /// Outside the displayed image.
    Outside,
}

/// Test `point` (displayed-image pixels) against markers first, then the image bounds.
/// Later markers sit above earlier ones.
#[must_use]
pub fn hit_test(point: Point, markers: &[MarkerView], image: Size) -> Hit {
    if let Some(marker) = markers.iter().rev().find(|m| m.contains(point)) {
        return Hit::Marker(marker.popup_id.clone());
    }
    let inside = point.x >= 0.0 && point.y >= 0.0 && point.x <= image.width && point.y <= image.height;
    if inside { Hit::Image(point) } else { Hit::Outside }
}
