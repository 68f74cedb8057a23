#[cfg(test)]
#[path = "mapper_test.rs"]
mod mapper_test;

/// A point in either original-image or displayed-image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height of an image, in pixels of whichever space it describes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Ratio between the displayed image and its natural (original) pixels.
///
/// A zero natural dimension maps that axis with scale 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageScale {
    pub natural: Size,
    pub display: Size,
}

impl ImageScale {
    #[must_use]
    pub fn new(natural: Size, display: Size) -> Self {
        Self { natural, display }
    }

    /// Horizontal display-per-original factor.
    #[must_use]
    pub fn scale_x(&self) -> f64 {
        axis_scale(self.natural.width, self.display.width)
    }

    /// Vertical display-per-original factor.
    #[must_use]
    pub fn scale_y(&self) -> f64 {
        axis_scale(self.natural.height, self.display.height)
    }

    /// Convert an original-image point to displayed pixels.
    #[must_use]
    pub fn to_display(&self, orig: Point) -> Point {
        Point {
            x: orig.x * self.scale_x(),
            y: orig.y * self.scale_y(),
        }
    }

    /// Convert a displayed point back to original-image pixels.
    #[must_use]
    pub fn to_original(&self, display: Point) -> Point {
        Point {
            x: display.x / nonzero(self.scale_x()),
            y: display.y / nonzero(self.scale_y()),
        }
    }

    /// Like [`Self::to_original`], rounded to whole source pixels for storage.
    #[must_use]
    pub fn to_original_rounded(&self, display: Point) -> Point {
        let p = self.to_original(display);
        Point { x: p.x.round(), y: p.y.round() }
    }

    /// Scale a horizontal original-space length.
    #[must_use]
    pub fn len_x(&self, orig: f64) -> f64 {
        orig * self.scale_x()
    }
}

fn axis_scale(natural: f64, display: f64) -> f64 {
    if natural == 0.0 { 1.0 } else { display / natural }
}

// A zero displayed size collapses the forward mapping; keep the inverse finite.
fn nonzero(scale: f64) -> f64 {
    if scale == 0.0 { 1.0 } else { scale }
}
