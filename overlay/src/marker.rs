//! Marker layout: one circular marker per anchored annotation.
//!
//! Markers are rebuilt from scratch on every reposition. Anchors come from the
//! annotation's target region when the region map has it, otherwise from its
//! stored coordinates; annotations with neither are skipped. Numbering and
//! fallback ids count rendered markers only, so a skipped annotation never
//! leaves a gap.

#[cfg(test)]
#[path = "marker_test.rs"]
mod marker_test;

use serde::{Deserialize, Serialize};

use crate::consts::{
    COMMENT_MARKER_PX, DEFAULT_MARKER_PX, MAIN_COLOR, MAIN_MARKER_PX, MARKER_FONT_RATIO, OTHER_COLOR,
    SMALL_MARKER_PX,
};
use crate::doc::{AnnType, Annotation, PageId, RegionMap};
use crate::mapper::{ImageScale, Point};

/// Which point of a target region a marker is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnchorPolicy {
    /// `(x1, (y0 + y1) / 2)`.
    #[default]
    RightEdgeMidpoint,
    Center,
}

/// Where an anchor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorSource {
    Region,
    Coords,
}

/// Marker diameter in CSS pixels for an annotation type.
#[must_use]
pub fn diameter(ann_type: &AnnType) -> f64 {
    match ann_type {
        AnnType::Main => MAIN_MARKER_PX,
        AnnType::Comment => COMMENT_MARKER_PX,
        AnnType::Small => SMALL_MARKER_PX,
        AnnType::General | AnnType::Other(_) => DEFAULT_MARKER_PX,
    }
}

#[must_use]
pub fn color(ann_type: &AnnType) -> &'static str {
    if *ann_type == AnnType::Main { MAIN_COLOR } else { OTHER_COLOR }
}

/// Three-stop radial fill fading from the core to a transparent edge.
#[must_use]
pub fn gradient(color: &str) -> String {
    format!("radial-gradient(circle, {color}80 0%, {color}40 50%, {color}00 100%)")
}

/// Anchor in original-image pixels.
#[must_use]
pub fn resolve_anchor(
    ann: &Annotation,
    regions: Option<&RegionMap>,
    policy: AnchorPolicy,
) -> Option<(Point, AnchorSource)> {
    let region = ann
        .target_block
        .as_deref()
        .and_then(|id| regions.and_then(|map| map.get(id)));
    if let Some(bbox) = region {
        let point = match policy {
            AnchorPolicy::RightEdgeMidpoint => bbox.right_mid(),
            AnchorPolicy::Center => bbox.center(),
        };
        return Some((point, AnchorSource::Region));
    }
    ann.coords
        .filter(|c| c.is_finite())
        .map(|c| (c.point(), AnchorSource::Coords))
}

/// A marker ready to render, in displayed-image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerView {
    /// Id of the annotation this marker stands for, when it has one.
    pub annotation_id: Option<String>,
    /// Index into the page's annotation list.
    pub index: usize,
    /// DOM id of the marker element.
    pub dom_id: String,
    /// DOM id of the paired popup; also the key for popup events.
    pub popup_id: String,
    /// One-based number shown on the marker.
    pub number: usize,
    pub ann_type: AnnType,
    /// Marker center.
    pub anchor: Point,
    pub diameter: f64,
    pub source: AnchorSource,
}

impl MarkerView {
    /// CSS `left`. The element is shifted back by half its width with a transform.
    #[must_use]
    pub fn left(&self) -> f64 {
        self.anchor.x
    }

    /// CSS `top`.
    #[must_use]
    pub fn top(&self) -> f64 {
        self.anchor.y - self.diameter / 2.0
    }

    #[must_use]
    pub fn font_size(&self) -> f64 {
        self.diameter * MARKER_FONT_RATIO
    }

    #[must_use]
    pub fn background(&self) -> String {
        gradient(color(&self.ann_type))
    }

    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        let r = self.diameter / 2.0;
        let dx = point.x - self.anchor.x;
        let dy = point.y - self.anchor.y;
        dx * dx + dy * dy <= r * r
    }
}

/// Inputs shared by every marker on a page.
#[derive(Debug, Clone, Copy)]
pub struct LayoutContext<'a> {
    pub page: PageId,
    pub regions: Option<&'a RegionMap>,
    pub scale: ImageScale,
    pub policy: AnchorPolicy,
}

/// Lay out markers for every non-general annotation that resolves to an anchor.
#[must_use]
pub fn layout(annotations: &[Annotation], ctx: &LayoutContext<'_>) -> Vec<MarkerView> {
    let slug = ctx.page.slug();
    let mut markers = Vec::new();
    for (index, ann) in annotations.iter().enumerate() {
        if !ann.ann_type.is_spatial() {
            continue;
        }
        let Some((orig, source)) = resolve_anchor(ann, ctx.regions, ctx.policy) else {
            log::debug!(
                "marker: skipping annotation {:?} on {slug}: no region or coords",
                ann.id
            );
            continue;
        };
        let number = markers.len() + 1;
        let (dom_id, popup_id) = match ann.id.as_deref() {
            Some(id) => (format!("circle-{id}"), id.to_string()),
            None => (format!("circle-{slug}-{number}"), format!("ann-{slug}-{number}")),
        };
        markers.push(MarkerView {
            annotation_id: ann.id.clone(),
            index,
            dom_id,
            popup_id,
            number,
            ann_type: ann.ann_type.clone(),
            anchor: ctx.scale.to_display(orig),
            diameter: diameter(&ann.ann_type),
            source,
        });
    }
    markers
}

/// DOM id of the marker for an annotation id.
#[must_use]
pub fn marker_dom_id(annotation_id: &str) -> String {
    format!("circle-{annotation_id}")
}
