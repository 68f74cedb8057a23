#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;

// =============================================================
// Helpers
// =============================================================

fn ann(id: Option<&str>, ann_type: AnnType, text: &str) -> Annotation {
    Annotation {
        id: id.map(str::to_string),
        ann_type,
        text: text.to_string(),
        target_block: None,
        coords: None,
    }
}

fn page_with(annotations: Vec<Annotation>) -> PageDoc {
    PageDoc::from_payload(PageId::new(7), PagePayload::from_annotations(annotations))
}

// =============================================================
// AnnType
// =============================================================

#[test]
fn ann_type_parses_known_kinds() {
    assert_eq!(AnnType::from("main".to_string()), AnnType::Main);
    assert_eq!(AnnType::from("comment".to_string()), AnnType::Comment);
    assert_eq!(AnnType::from("general".to_string()), AnnType::General);
    assert_eq!(AnnType::from("small".to_string()), AnnType::Small);
}

#[test]
fn ann_type_keeps_unknown_strings() {
    let t = AnnType::from("sidenote".to_string());
    assert_eq!(t, AnnType::Other("sidenote".into()));
    assert_eq!(t.as_str(), "sidenote");
}

#[test]
fn only_general_is_not_spatial() {
    assert!(!AnnType::General.is_spatial());
    assert!(AnnType::Main.is_spatial());
    assert!(AnnType::Small.is_spatial());
}

#[test]
fn editable_types_are_the_three_kinds() {
    assert!(AnnType::Main.is_editable());
    assert!(AnnType::Comment.is_editable());
    assert!(AnnType::General.is_editable());
    assert!(!AnnType::Small.is_editable());
    assert!(!AnnType::Other("x".into()).is_editable());
}

// =============================================================
// Annotation serde
// =============================================================

#[test]
fn annotation_deserializes_wire_shape() {
    let json = r#"{"id":"a1","annType":"main","text":"hi","targetBlock":4,"coords":[100,200]}"#;
    let a: Annotation = serde_json::from_str(json).unwrap();
    assert_eq!(a.id.as_deref(), Some("a1"));
    assert_eq!(a.ann_type, AnnType::Main);
    assert_eq!(a.target_block.as_deref(), Some("4"));
    assert_eq!(a.coords, Some(Coords(100.0, 200.0)));
}

#[test]
fn annotation_numeric_id_becomes_string() {
    let a: Annotation = serde_json::from_str(r#"{"id":12,"annType":"comment"}"#).unwrap();
    assert_eq!(a.id.as_deref(), Some("12"));
}

#[test]
fn annotation_blank_id_is_absent() {
    let a: Annotation = serde_json::from_str(r#"{"id":"  ","annType":"comment"}"#).unwrap();
    assert!(a.id.is_none());
}

#[test]
fn annotation_missing_fields_default() {
    let a: Annotation = serde_json::from_str("{}").unwrap();
    assert!(a.id.is_none());
    assert_eq!(a.ann_type, AnnType::Comment);
    assert!(a.text.is_empty());
    assert!(a.coords.is_none());
}

#[test]
fn annotation_serializes_without_absent_fields() {
    let a = ann(None, AnnType::General, "note");
    let value = serde_json::to_value(&a).unwrap();
    assert_eq!(value["annType"], "general");
    assert!(value.get("id").is_none());
    assert!(value.get("coords").is_none());
}

// =============================================================
// Coords
// =============================================================

#[test]
fn coords_parse_bracketed() {
    assert_eq!(Coords::parse("[12, 34]"), Some(Coords(12.0, 34.0)));
}

#[test]
fn coords_parse_bare_pair() {
    assert_eq!(Coords::parse("5,6"), Some(Coords(5.0, 6.0)));
}

#[test]
fn coords_parse_rejects_garbage() {
    assert!(Coords::parse("").is_none());
    assert!(Coords::parse("[a, b]").is_none());
    assert!(Coords::parse("42").is_none());
}

#[test]
fn coords_display_matches_editor_format() {
    assert_eq!(Coords(100.0, 200.0).to_string(), "[100, 200]");
}

// =============================================================
// PageId
// =============================================================

#[test]
fn page_id_formats_slug_and_paths() {
    let p = PageId::new(7);
    assert_eq!(p.slug(), "page_007");
    assert_eq!(p.api_id(), "007");
    assert_eq!(p.image_path(), "images/page_007.png");
    assert_eq!(p.annotations_path(), "annotations/page_007.json");
    assert_eq!(p.regions_path(), "text/page_007.json");
}

#[test]
fn page_id_zero_clamps_to_one() {
    assert_eq!(PageId::new(0).number(), 1);
}

#[test]
fn page_id_prev_stops_at_first() {
    assert_eq!(PageId::new(1).prev(), None);
    assert_eq!(PageId::new(3).prev(), Some(PageId::new(2)));
}

#[test]
fn page_id_next_respects_last() {
    assert_eq!(PageId::new(4).next(Some(4)), None);
    assert_eq!(PageId::new(4).next(Some(5)), Some(PageId::new(5)));
    assert_eq!(PageId::new(4).next(None), Some(PageId::new(5)));
}

#[test]
fn page_id_parse_variants() {
    assert_eq!(PageId::parse("page_007"), Some(PageId::new(7)));
    assert_eq!(PageId::parse("012"), Some(PageId::new(12)));
    assert_eq!(PageId::parse("0"), None);
    assert_eq!(PageId::parse("x"), None);
}

// =============================================================
// PagePayload
// =============================================================

#[test]
fn payload_reads_server_sha_field() {
    let json = r#"{"pageId":"007","serverPageSha":"abc","origW":1000,"origH":1400,"annotations":[]}"#;
    let p: PagePayload = serde_json::from_str(json).unwrap();
    assert_eq!(p.version_token.as_deref(), Some("abc"));
    assert_eq!(p.natural_size(), Some(Size::new(1000.0, 1400.0)));
}

#[test]
fn payload_accepts_version_token_alias() {
    let p: PagePayload = serde_json::from_str(r#"{"versionToken":"v2"}"#).unwrap();
    assert_eq!(p.version_token.as_deref(), Some("v2"));
}

#[test]
fn payload_without_dimensions_has_no_natural_size() {
    let p = PagePayload { orig_w: Some(100.0), ..PagePayload::default() };
    assert!(p.natural_size().is_none());
}

// =============================================================
// RegionMap
// =============================================================

#[test]
fn region_map_scales_bboxes() {
    let raw = vec![RawRegion { id: Some("b1".into()), bbox: vec![10.0, 20.0, 30.0, 40.0] }];
    let map = RegionMap::from_raw(&raw, 2.0);
    let b = map.get("b1").unwrap();
    assert_eq!((b.x0, b.y0, b.x1, b.y1), (20.0, 40.0, 60.0, 80.0));
}

#[test]
fn region_map_drops_malformed_entries() {
    let raw = vec![
        RawRegion { id: None, bbox: vec![0.0, 0.0, 1.0, 1.0] },
        RawRegion { id: Some("short".into()), bbox: vec![0.0, 1.0] },
        RawRegion { id: Some("ok".into()), bbox: vec![0.0, 0.0, 1.0, 1.0] },
    ];
    let map = RegionMap::from_raw(&raw, 2.0);
    assert_eq!(map.len(), 1);
    assert!(map.get("ok").is_some());
}

#[test]
fn raw_region_accepts_numeric_id() {
    let raw: Vec<RawRegion> = serde_json::from_str(r#"[{"id":3,"bbox":[1,2,3,4]}]"#).unwrap();
    assert_eq!(raw[0].id.as_deref(), Some("3"));
}

#[test]
fn bbox_anchor_points() {
    let b = BBox { x0: 0.0, y0: 10.0, x1: 100.0, y1: 30.0 };
    assert_eq!(b.center(), Point::new(50.0, 20.0));
    assert_eq!(b.right_mid(), Point::new(100.0, 20.0));
}

// =============================================================
// PageDoc
// =============================================================

#[test]
fn page_doc_starts_with_pending_regions() {
    let page = PageDoc::new(PageId::new(1));
    assert_eq!(page.regions, Regions::Pending);
    assert!(page.region_map().is_none());
    assert!(page.is_empty());
}

#[test]
fn page_doc_finds_general() {
    let page = page_with(vec![ann(Some("a"), AnnType::Main, "m"), ann(Some("g"), AnnType::General, "g")]);
    assert_eq!(page.general().and_then(|a| a.id.as_deref()), Some("g"));
}

#[test]
fn replace_general_keeps_single_entry() {
    let mut page = page_with(vec![
        ann(Some("g1"), AnnType::General, "old"),
        ann(Some("a"), AnnType::Main, "m"),
        ann(Some("g2"), AnnType::General, "dup"),
    ]);
    page.replace_general(ann(Some("g1"), AnnType::General, "new"));
    let generals: Vec<_> = page.annotations().iter().filter(|a| a.ann_type == AnnType::General).collect();
    assert_eq!(generals.len(), 1);
    assert_eq!(generals[0].text, "new");
    assert_eq!(page.annotations()[0].text, "new");
}

#[test]
fn replace_general_appends_when_missing() {
    let mut page = page_with(vec![ann(Some("a"), AnnType::Main, "m")]);
    page.replace_general(ann(None, AnnType::General, "fresh"));
    assert_eq!(page.len(), 2);
    assert_eq!(page.general().map(|a| a.text.as_str()), Some("fresh"));
}

#[test]
fn upsert_replaces_by_id() {
    let mut page = page_with(vec![ann(Some("a"), AnnType::Main, "old")]);
    assert!(page.upsert(ann(Some("a"), AnnType::Comment, "new")));
    assert_eq!(page.len(), 1);
    assert_eq!(page.get("a").map(|a| a.text.as_str()), Some("new"));
}

#[test]
fn upsert_appends_unknown_id() {
    let mut page = page_with(vec![ann(Some("a"), AnnType::Main, "x")]);
    assert!(!page.upsert(ann(Some("b"), AnnType::Main, "y")));
    assert_eq!(page.len(), 2);
}

#[test]
fn rename_moves_identity() {
    let mut page = page_with(vec![ann(Some("local-1"), AnnType::Comment, "x")]);
    assert!(page.rename("local-1", "srv-9"));
    assert!(page.get("local-1").is_none());
    assert!(page.get("srv-9").is_some());
    assert!(!page.rename("missing", "z"));
}
