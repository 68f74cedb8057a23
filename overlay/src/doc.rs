//! Document model: annotations, content regions, and the per-page store.
//!
//! This module defines what the overlay knows about a page: the annotation
//! records (`Annotation`, `AnnType`, `Coords`), the content-region map used to
//! anchor markers (`RegionMap`), and the page-scoped store that owns them
//! (`PageDoc`).
//!
//! Data flows into this layer from the network (JSON deserialization) and from
//! the editor (staged drafts and save reconciliation). The marker renderer
//! reads from `PageDoc` via `annotations` in document order.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::mapper::{Point, Size};

/// The kind of an annotation.
///
/// Unknown strings survive a load/save round trip as [`AnnType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnnType {
    /// Primary finding; large crimson marker.
    Main,
    /// Secondary remark; medium blue marker.
    #[default]
    Comment,
    /// Page-wide note with no anchor. At most one is shown per page.
    General,
    /// Legacy small marker. Rendered, never created.
    Small,
    /// Anything else found in loaded data.
    Other(String),
}

impl AnnType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Main => "main",
            Self::Comment => "comment",
            Self::General => "general",
            Self::Small => "small",
            Self::Other(s) => s,
        }
    }

    /// Whether annotations of this type are anchored on the image.
    #[must_use]
    pub fn is_spatial(&self) -> bool {
        !matches!(self, Self::General)
    }

    /// Whether the editor may create or stage this type.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Main | Self::Comment | Self::General)
    }
}

impl From<String> for AnnType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "main" => Self::Main,
            "comment" => Self::Comment,
            "general" => Self::General,
            "small" => Self::Small,
            _ => Self::Other(s),
        }
    }
}

impl From<AnnType> for String {
    fn from(t: AnnType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for AnnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point in original-image pixels, serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords(pub f64, pub f64);

impl Coords {
    #[must_use]
    pub fn x(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn y(self) -> f64 {
        self.1
    }

    #[must_use]
    pub fn point(self) -> Point {
        Point::new(self.0, self.1)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.0.is_finite() && self.1.is_finite()
    }

    /// Parse `[x, y]` or `x,y` as typed into the editor.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim().trim_start_matches('[').trim_end_matches(']');
        let (x, y) = trimmed.split_once(',')?;
        let (Ok(x), Ok(y)) = (x.trim().parse::<f64>(), y.trim().parse::<f64>()) else {
            return None;
        };
        let coords = Self(x, y);
        coords.is_finite().then_some(coords)
    }
}

impl From<Point> for Coords {
    fn from(p: Point) -> Self {
        Self(p.x, p.y)
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.0, self.1)
    }
}

/// An annotation as stored in the page and on the wire.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Stable identifier. Absent for records that were never saved.
    #[serde(default, deserialize_with = "opt_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Annotation kind.
    #[serde(default)]
    pub ann_type: AnnType,
    /// Raw markdown content.
    #[serde(default)]
    pub text: String,
    /// Content-region id this annotation is anchored to, if any.
    #[serde(default, deserialize_with = "opt_id", skip_serializing_if = "Option::is_none")]
    pub target_block: Option<String>,
    /// Fallback anchor in original-image pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords: Option<Coords>,
}

/// Ids arrive as strings or numbers; blank strings count as absent.
pub(crate) fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// One-based page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(u32);

impl PageId {
    /// Page numbers start at 1; zero is clamped up.
    #[must_use]
    pub fn new(number: u32) -> Self {
        Self(number.max(1))
    }

    #[must_use]
    pub fn number(self) -> u32 {
        self.0
    }

    /// Static asset stem, e.g. `page_007`.
    #[must_use]
    pub fn slug(self) -> String {
        format!("page_{:03}", self.0)
    }

    /// Backend page id, e.g. `007`.
    #[must_use]
    pub fn api_id(self) -> String {
        format!("{:03}", self.0)
    }

    #[must_use]
    pub fn image_path(self) -> String {
        format!("images/{}.png", self.slug())
    }

    #[must_use]
    pub fn annotations_path(self) -> String {
        format!("annotations/{}.json", self.slug())
    }

    #[must_use]
    pub fn regions_path(self) -> String {
        format!("text/{}.json", self.slug())
    }

    /// Next page, bounded by `last` when known.
    #[must_use]
    pub fn next(self, last: Option<u32>) -> Option<Self> {
        let n = self.0.checked_add(1)?;
        match last {
            Some(last) if n > last => None,
            _ => Some(Self(n)),
        }
    }

    #[must_use]
    pub fn prev(self) -> Option<Self> {
        (self.0 > 1).then(|| Self(self.0 - 1))
    }

    /// Accepts `page_007`, `007` or `7`.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let digits = input.trim().trim_start_matches("page_");
        let Ok(n) = digits.parse::<u32>() else {
            return None;
        };
        (n > 0).then_some(Self(n))
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug())
    }
}

/// Page data as returned by the page provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_h: Option<f64>,
    #[serde(
        default,
        rename = "serverPageSha",
        alias = "versionToken",
        skip_serializing_if = "Option::is_none"
    )]
    pub version_token: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl PagePayload {
    /// Wrap a bare annotation list (static viewer data).
    #[must_use]
    pub fn from_annotations(annotations: Vec<Annotation>) -> Self {
        Self { annotations, ..Self::default() }
    }

    /// Original image size, when the provider reports both dimensions.
    #[must_use]
    pub fn natural_size(&self) -> Option<Size> {
        match (self.orig_w, self.orig_h) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Some(Size::new(w, h)),
            _ => None,
        }
    }
}

/// A content region as delivered by the region provider, in raw units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRegion {
    #[serde(default, deserialize_with = "opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub bbox: Vec<f64>,
}

/// Axis-aligned box in original-image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    #[must_use]
    pub fn right_mid(&self) -> Point {
        Point::new(self.x1, (self.y0 + self.y1) / 2.0)
    }
}

/// Region id to bbox, already scaled into original-image pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionMap {
    regions: HashMap<String, BBox>,
}

impl RegionMap {
    /// Build from raw regions, multiplying every bbox value by `scale`.
    /// Regions without an id or a four-value bbox are dropped.
    #[must_use]
    pub fn from_raw(raw: &[RawRegion], scale: f64) -> Self {
        let mut regions = HashMap::new();
        for region in raw {
            let (Some(id), [x0, y0, x1, y1]) = (&region.id, region.bbox.as_slice()) else {
                log::debug!("region map: dropping malformed region {:?}", region.id);
                continue;
            };
            regions.insert(
                id.clone(),
                BBox { x0: x0 * scale, y0: y0 * scale, x1: x1 * scale, y1: y1 * scale },
            );
        }
        Self { regions }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&BBox> {
        self.regions.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Where the page's content regions currently stand.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Regions {
    /// Fetch not finished yet.
    #[default]
    Pending,
    Loaded(RegionMap),
    /// Fetch failed; markers fall back to stored coordinates.
    Failed,
}

/// In-memory state of the active page.
#[derive(Debug, Clone)]
pub struct PageDoc {
    pub page_id: PageId,
    /// Original image size reported by the provider, if any.
    pub natural: Option<Size>,
    /// Last version token seen from the server.
    pub version_token: Option<String>,
    pub regions: Regions,
    annotations: Vec<Annotation>,
}

impl PageDoc {
    /// Create an empty page.
    #[must_use]
    pub fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            natural: None,
            version_token: None,
            regions: Regions::Pending,
            annotations: Vec::new(),
        }
    }

    /// Build a page from provider data, replacing nothing but itself.
    #[must_use]
    pub fn from_payload(page_id: PageId, payload: PagePayload) -> Self {
        Self {
            page_id,
            natural: payload.natural_size(),
            version_token: payload.version_token,
            regions: Regions::Pending,
            annotations: payload.annotations,
        }
    }

    /// All annotations in document order.
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// The page-wide general note, if one exists.
    #[must_use]
    pub fn general(&self) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.ann_type == AnnType::General)
    }

    /// Look up an annotation by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id.as_deref() == Some(id))
    }

    /// The loaded region map, or `None` while pending or after a failure.
    #[must_use]
    pub fn region_map(&self) -> Option<&RegionMap> {
        match &self.regions {
            Regions::Loaded(map) => Some(map),
            Regions::Pending | Regions::Failed => None,
        }
    }

    /// Replace the general singleton, keeping its position when present.
    pub fn replace_general(&mut self, general: Annotation) {
        match self.annotations.iter_mut().find(|a| a.ann_type == AnnType::General) {
            Some(slot) => *slot = general,
            None => self.annotations.push(general),
        }
        let mut seen = false;
        self.annotations.retain(|a| {
            if a.ann_type != AnnType::General {
                return true;
            }
            let keep = !seen;
            seen = true;
            keep
        });
    }

    /// Update the annotation sharing `ann.id`, or append it. Returns `true`
    /// when an existing record was replaced.
    pub fn upsert(&mut self, ann: Annotation) -> bool {
        if let Some(id) = ann.id.as_deref() {
            if let Some(slot) = self.annotations.iter_mut().find(|a| a.id.as_deref() == Some(id)) {
                *slot = ann;
                return true;
            }
        }
        self.annotations.push(ann);
        false
    }

    /// Rename an annotation's id in place. Returns `false` if `old` is unknown.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        let Some(slot) = self.annotations.iter_mut().find(|a| a.id.as_deref() == Some(old)) else {
            return false;
        };
        slot.id = Some(new.to_string());
        true
    }
}
