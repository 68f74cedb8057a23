#![allow(clippy::float_cmp)]

use super::*;
use crate::doc::{AnnType, Annotation, Coords, PageId};
use crate::mapper::ImageScale;
use crate::marker::{AnchorPolicy, LayoutContext, layout};

fn markers(points: &[(&str, AnnType, f64, f64)]) -> Vec<MarkerView> {
    let anns: Vec<Annotation> = points
        .iter()
        .map(|(id, t, x, y)| Annotation {
            id: Some((*id).to_string()),
            ann_type: t.clone(),
            coords: Some(Coords(*x, *y)),
            ..Annotation::default()
        })
        .collect();
    let scale = ImageScale::new(Size::new(400.0, 400.0), Size::new(400.0, 400.0));
    layout(&anns, &LayoutContext { page: PageId::new(1), regions: None, scale, policy: AnchorPolicy::Center })
}

const IMAGE: Size = Size { width: 400.0, height: 400.0 };

#[test]
fn hit_marker_center() {
    let m = markers(&[("a", AnnType::Comment, 100.0, 100.0)]);
    assert_eq!(hit_test(Point::new(100.0, 100.0), &m, IMAGE), Hit::Marker("a".into()));
}

#[test]
fn overlapping_markers_prefer_last() {
    let m = markers(&[("under", AnnType::Main, 100.0, 100.0), ("over", AnnType::Comment, 110.0, 100.0)]);
    assert_eq!(hit_test(Point::new(105.0, 100.0), &m, IMAGE), Hit::Marker("over".into()));
}

#[test]
fn empty_image_area() {
    let m = markers(&[("a", AnnType::Comment, 100.0, 100.0)]);
    assert_eq!(hit_test(Point::new(300.0, 300.0), &m, IMAGE), Hit::Image(Point::new(300.0, 300.0)));
}

#[test]
fn outside_image_bounds() {
    assert_eq!(hit_test(Point::new(-1.0, 10.0), &[], IMAGE), Hit::Outside);
    assert_eq!(hit_test(Point::new(10.0, 401.0), &[], IMAGE), Hit::Outside);
}

#[test]
fn marker_overhanging_the_edge_still_hits() {
    let m = markers(&[("edge", AnnType::Main, 395.0, 200.0)]);
    assert_eq!(hit_test(Point::new(420.0, 200.0), &m, IMAGE), Hit::Marker("edge".into()));
}
