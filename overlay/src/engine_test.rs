#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use futures::executor::block_on;

use super::*;
use crate::doc::Annotation;
use crate::mock::MockBackend;
use crate::sync::{Backend, perform_submit};

// =============================================================
// Helpers
// =============================================================

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn yes(_: Prompt) -> bool {
    true
}

fn no(_: Prompt) -> bool {
    false
}

fn page_one() -> PageId {
    PageId::new(1)
}

fn ann(id: Option<&str>, ann_type: AnnType, text: &str, coords: Option<(f64, f64)>) -> Annotation {
    Annotation {
        id: id.map(str::to_string),
        ann_type,
        text: text.to_string(),
        target_block: None,
        coords: coords.map(|(x, y)| Coords(x, y)),
    }
}

fn payload(annotations: Vec<Annotation>) -> PagePayload {
    PagePayload {
        orig_w: Some(1000.0),
        orig_h: Some(1400.0),
        version_token: Some("mock-sha-1".into()),
        ..PagePayload::from_annotations(annotations)
    }
}

fn editor_config() -> ViewerConfig {
    ViewerConfig { editor: true, ..ViewerConfig::default() }
}

/// Desktop window, page 1 loaded with no regions, image shown at half size.
fn boot(config: ViewerConfig, annotations: Vec<Annotation>) -> EngineCore {
    let mut core = EngineCore::new(config);
    core.resize(1200.0);
    let ticket = core.request_page(page_one());
    core.apply_page(ticket, Ok(payload(annotations)));
    core.apply_regions(ticket, Ok(Vec::new()));
    core.image_loaded(Size::new(1000.0, 1400.0), Size::new(500.0, 700.0));
    core
}

fn boot_from(backend: &MockBackend, config: ViewerConfig) -> EngineCore {
    let mut core = EngineCore::new(config);
    core.resize(1200.0);
    let ticket = core.request_page(page_one());
    core.apply_page(ticket, block_on(backend.fetch_page(page_one())));
    core.apply_regions(ticket, block_on(backend.fetch_regions(page_one())));
    core.image_loaded(Size::new(1000.0, 1400.0), Size::new(500.0, 700.0));
    core
}

fn signed_in(core: &mut EngineCore) {
    core.set_session(Some(SessionUser { user_id: Some("u1".into()), username: "ed".into() }));
}

fn general_html(actions: &[Action]) -> Option<&str> {
    actions.iter().find_map(|a| match a {
        Action::SetGeneralComment { html } => Some(html.as_str()),
        _ => None,
    })
}

fn dom_ids(core: &EngineCore) -> Vec<String> {
    core.markers().iter().map(|m| m.dom_id.clone()).collect()
}

fn draft(core: &EngineCore) -> &Draft {
    core.editor().map(|e| e.machine.draft()).unwrap()
}

/// Editor on an empty mock page, signed in, with a staged comment.
fn staged_comment(backend: &MockBackend) -> EngineCore {
    let mut core = boot_from(backend, editor_config());
    signed_in(&mut core);
    core.editor_select_type(AnnType::Comment, &mut yes);
    core.click_image(Point::new(300.0, 500.0), &mut yes);
    core.editor_set_content("needs a citation".into());
    core.editor_stage();
    core
}

// =============================================================
// Marker rendering
// =============================================================

#[test]
fn main_marker_scales_into_display_space() {
    let core = boot(ViewerConfig::default(), vec![ann(Some("a1"), AnnType::Main, "finding", Some((100.0, 200.0)))]);
    let markers = core.markers();
    assert_eq!(markers.len(), 1);
    let m = &markers[0];
    assert!(approx_eq(m.anchor.x, 50.0) && approx_eq(m.anchor.y, 100.0));
    assert_eq!(m.diameter, 100.0);
    assert!(m.background().contains("#DC143C"));
    assert_eq!(m.dom_id, "circle-a1");
}

#[test]
fn general_annotations_never_become_markers() {
    let core = boot(
        ViewerConfig::default(),
        vec![
            ann(Some("g"), AnnType::General, "page note", None),
            ann(Some("c"), AnnType::Comment, "remark", Some((10.0, 10.0))),
        ],
    );
    assert_eq!(core.markers().len(), 1);
    assert_eq!(core.popups().len(), 1);
}

#[test]
fn unresolved_annotations_are_skipped_and_numbering_stays_dense() {
    let mut lost = ann(None, AnnType::Comment, "lost", None);
    lost.target_block = Some("missing".into());
    let core = boot(
        ViewerConfig::default(),
        vec![lost.clone(), lost, ann(None, AnnType::Comment, "found", Some((20.0, 20.0)))],
    );
    let markers = core.markers();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].number, 1);
    assert_eq!(markers[0].dom_id, "circle-page_001-1");
    assert_eq!(markers[0].popup_id, "ann-page_001-1");
}

#[test]
fn repositioning_is_stable() {
    let mut core = boot(
        ViewerConfig::default(),
        vec![
            ann(Some("a"), AnnType::Main, "x", Some((1.0, 1.0))),
            ann(None, AnnType::Comment, "y", Some((2.0, 2.0))),
        ],
    );
    let before = dom_ids(&core);
    core.reposition();
    core.reposition();
    assert_eq!(dom_ids(&core), before);
}

#[test]
fn reposition_bumps_popup_generation() {
    let mut core = boot(ViewerConfig::default(), vec![ann(Some("a"), AnnType::Main, "x", Some((1.0, 1.0)))]);
    let gen_before = core.popups().generation();
    let actions = core.reposition();
    assert_eq!(core.popups().generation(), gen_before + 1);
    assert!(actions.iter().any(|a| matches!(a, Action::MeasurePopup { popup_id, .. } if popup_id == "a")));
}

#[test]
fn regions_anchor_markers_at_right_edge() {
    let mut anchored = ann(Some("r"), AnnType::Comment, "x", Some((0.0, 0.0)));
    anchored.target_block = Some("b1".into());
    let mut core = EngineCore::new(ViewerConfig::default());
    let ticket = core.request_page(page_one());
    // Regions may land before the page data.
    core.apply_regions(ticket, Ok(vec![RawRegion { id: Some("b1".into()), bbox: vec![10.0, 20.0, 30.0, 40.0] }]));
    core.apply_page(ticket, Ok(payload(vec![anchored])));
    core.image_loaded(Size::new(1000.0, 1400.0), Size::new(1000.0, 1400.0));
    let m = &core.markers()[0];
    assert_eq!(m.source, marker::AnchorSource::Region);
    assert!(approx_eq(m.anchor.x, 60.0) && approx_eq(m.anchor.y, 60.0));
}

#[test]
fn failed_regions_fall_back_to_coords_without_image_wait() {
    let mut anchored = ann(Some("r"), AnnType::Comment, "![scan](fig.png)", Some((40.0, 40.0)));
    anchored.target_block = Some("b1".into());
    let mut core = EngineCore::new(ViewerConfig::default());
    let ticket = core.request_page(page_one());
    core.apply_page(ticket, Ok(payload(vec![anchored])));
    core.image_loaded(Size::new(1000.0, 1400.0), Size::new(500.0, 700.0));
    let actions = core.apply_regions(ticket, Err(BackendError::Network("offline".into())));
    assert_eq!(core.page().map(|p| p.regions.clone()), Some(Regions::Failed));
    let Some(Action::RenderMarkers { popups, .. }) = actions.iter().find(|a| matches!(a, Action::RenderMarkers { .. }))
    else {
        panic!("expected a render");
    };
    assert!(popups[0].has_image);
    assert!(!popups[0].wait_for_images);
}

#[test]
fn stale_page_response_is_dropped() {
    let mut core = EngineCore::new(ViewerConfig::default());
    let first = core.request_page(page_one());
    let second = core.request_page(PageId::new(2));
    assert!(core.apply_page(first, Ok(payload(vec![ann(Some("a"), AnnType::Main, "x", Some((1.0, 1.0)))]))).is_empty());
    assert!(core.page().is_some_and(PageDoc::is_empty));
    assert_eq!(core.current_page(), second.page);
}

#[test]
fn unauthenticated_page_prompts_login() {
    let mut core = EngineCore::new(editor_config());
    let ticket = core.request_page(page_one());
    let actions = core.apply_page(ticket, Err(BackendError::Unauthenticated));
    assert!(actions.contains(&Action::ShowLogin { message: None }));
    assert!(core.page().is_some());
}

#[test]
fn markers_wait_for_the_image_size() {
    let mut core = EngineCore::new(ViewerConfig::default());
    let ticket = core.request_page(page_one());
    // Static payloads carry no page dimensions.
    let actions = core.apply_page(
        ticket,
        Ok(PagePayload::from_annotations(vec![ann(Some("a"), AnnType::Main, "x", Some((800.0, 1200.0)))])),
    );
    assert!(core.markers().is_empty());
    assert!(general_html(&actions).is_some_and(|html| html.contains("<p>x</p>")));
    core.image_loaded(Size::new(1000.0, 1400.0), Size::new(500.0, 700.0));
    let m = &core.markers()[0];
    assert!(approx_eq(m.anchor.x, 400.0) && approx_eq(m.anchor.y, 600.0));
}

#[test]
fn navigation_drops_the_previous_image_scale() {
    let mut core = boot(ViewerConfig::default(), vec![]);
    let ticket = core.request_page(PageId::new(2));
    core.apply_page(ticket, Ok(payload(vec![ann(Some("b"), AnnType::Main, "x", Some((800.0, 1200.0)))])));
    assert!(core.markers().is_empty());
    core.image_loaded(Size::new(1000.0, 1400.0), Size::new(1000.0, 1400.0));
    let m = &core.markers()[0];
    assert!(approx_eq(m.anchor.x, 800.0) && approx_eq(m.anchor.y, 1200.0));
}

#[test]
fn refetching_the_same_page_keeps_the_image_scale() {
    let mut core = boot(ViewerConfig::default(), vec![]);
    let ticket = core.request_page(page_one());
    core.apply_page(ticket, Ok(payload(vec![ann(Some("a"), AnnType::Main, "x", Some((100.0, 200.0)))])));
    let m = &core.markers()[0];
    assert!(approx_eq(m.anchor.x, 50.0) && approx_eq(m.anchor.y, 100.0));
}

#[test]
fn hovered_popup_grows_spacer_once_images_settle() {
    let mut core = boot(ViewerConfig::default(), vec![ann(Some("a"), AnnType::Main, "![scan](fig.png)", Some((100.0, 200.0)))]);
    let g = core.popups().generation();
    let viewport = Viewport { height: 800.0, overlay_top: 0.0 };
    assert!(core.marker_enter("a").iter().any(|a| matches!(a, Action::ShowPopup { .. })));
    assert!(matches!(&core.popup_measured(g, "a", 40.0, 1, viewport)[..], [Action::AwaitImages { .. }]));
    assert!(matches!(&core.popup_image_settled(g, "a")[..], [Action::MeasurePopup { .. }]));
    let actions = core.popup_measured(g, "a", 900.0, 0, viewport);
    assert!(actions.contains(&Action::ShowPopup { popup_id: "a".into(), generation: g }));
    let actions = core.popup_overflow(g, "a", 1100.0, 800.0);
    assert_eq!(actions, vec![Action::SetSpacer { spacer_id: "popup-spacer-a".into(), height: 350.0 }]);
}

// =============================================================
// General comment block
// =============================================================

#[test]
fn general_block_lists_notes_then_numbered_mains() {
    let mut core = boot(
        ViewerConfig::default(),
        vec![
            ann(Some("c"), AnnType::Comment, "aside", Some((5.0, 5.0))),
            ann(Some("m"), AnnType::Main, "key finding", Some((9.0, 9.0))),
            ann(Some("g"), AnnType::General, "overall fine", None),
            ann(Some("m2"), AnnType::Main, "unplaced", None),
        ],
    );
    let actions = core.reposition();
    let html = general_html(&actions).unwrap();
    let note = html.find("overall fine").unwrap();
    let main = html.find("<strong>2.</strong>").unwrap();
    assert!(note < main);
    assert!(html.contains("unplaced"));
    assert!(!html.contains("aside"));
}

#[test]
fn empty_page_shows_no_general_label() {
    let mut core = boot(ViewerConfig::default(), vec![]);
    let actions = core.reposition();
    assert!(general_html(&actions).unwrap().contains("No general comment."));
}

// =============================================================
// Resize and layout
// =============================================================

#[test]
fn resize_switches_surface_now_and_repositions_later() {
    let mut core = boot(ViewerConfig::default(), vec![]);
    let actions = core.resize(600.0);
    assert!(core.surface().is_mobile());
    let Some(&Action::ScheduleReposition { token, delay_ms }) = actions.last() else {
        panic!("expected a scheduled reposition");
    };
    assert_eq!(delay_ms, 250);
    let newer = core.resize(610.0);
    assert!(core.resize_settled(token, Size::new(400.0, 560.0)).is_empty());
    let Some(&Action::ScheduleReposition { token: latest, .. }) = newer.last() else {
        panic!("expected a scheduled reposition");
    };
    assert!(!core.resize_settled(latest, Size::new(400.0, 560.0)).is_empty());
}

#[test]
fn wide_window_lays_out_side_by_side() {
    let mut core = boot(ViewerConfig::default(), vec![]);
    let actions = core.reposition();
    assert!(actions.contains(&Action::SetLayoutDirection(FlexDirection::Row)));
}

// =============================================================
// Viewer interaction
// =============================================================

#[test]
fn desktop_click_pins_popup_and_fills_sidebar() {
    let mut core = boot(ViewerConfig::default(), vec![ann(Some("a1"), AnnType::Main, "finding", Some((100.0, 200.0)))]);
    let actions = core.click_marker("a1", &mut no);
    assert!(actions.iter().any(|a| matches!(a, Action::ShowPopup { popup_id, .. } if popup_id == "a1")));
    let sidebar = actions.iter().find_map(|a| match a {
        Action::UpdateSidebar { title, html } => Some((title.clone(), html.clone())),
        _ => None,
    });
    let (title, html) = sidebar.unwrap();
    assert_eq!(title, "Comment 1");
    assert!(html.starts_with("<strong>1.</strong> "));
    assert!(core.popups().visibility("a1").is_some_and(|v| v.click));
}

#[test]
fn click_on_marker_area_routes_through_hit_test() {
    let mut core = boot(ViewerConfig::default(), vec![ann(Some("a1"), AnnType::Main, "finding", Some((100.0, 200.0)))]);
    core.click_image(Point::new(55.0, 100.0), &mut no);
    assert_eq!(core.popups().visible(), vec!["a1"]);
    let actions = core.click_image(Point::new(400.0, 600.0), &mut no);
    assert!(actions.contains(&Action::HidePopup { popup_id: "a1".into() }));
    assert!(core.popups().visible().is_empty());
}

#[test]
fn hover_is_ignored_on_mobile() {
    let mut core = boot(ViewerConfig::default(), vec![ann(Some("a1"), AnnType::Main, "x", Some((100.0, 200.0)))]);
    assert!(!core.marker_enter("a1").is_empty());
    core.resize(400.0);
    core.click_outside();
    assert!(core.marker_enter("a1").is_empty());
}

#[test]
fn mobile_click_opens_overlay_and_outside_click_closes_it() {
    let mut core = boot(ViewerConfig::default(), vec![ann(Some("a1"), AnnType::Main, "x", Some((100.0, 200.0)))]);
    core.resize(400.0);
    let actions = core.click_marker("a1", &mut no);
    assert!(matches!(actions.as_slice(), [Action::ShowMobileOverlay { title, .. }] if title == "Comment 1"));
    assert!(core.click_outside().contains(&Action::CloseMobileOverlay));
    assert!(!core.click_outside().contains(&Action::CloseMobileOverlay));
}

#[test]
fn overlay_jumps_to_general_comment() {
    let mut core = boot(ViewerConfig::default(), vec![]);
    assert_eq!(core.show_general_from_overlay(), vec![Action::CloseMobileOverlay, Action::ScrollToGeneral]);
}

#[test]
fn left_swipe_goes_to_next_page() {
    let mut core = boot(ViewerConfig::default(), vec![]);
    core.resize(400.0);
    core.touch_start(Point::new(300.0, 100.0));
    assert_eq!(core.touch_end(Point::new(200.0, 110.0)), vec![Action::Navigate(PageId::new(2))]);
}

#[test]
fn swipe_is_desktop_inert() {
    let mut core = boot(ViewerConfig::default(), vec![]);
    core.touch_start(Point::new(300.0, 100.0));
    assert!(core.touch_end(Point::new(100.0, 100.0)).is_empty());
}

#[test]
fn paging_respects_bounds() {
    let mut core = boot(ViewerConfig { page_count: Some(1), ..ViewerConfig::default() }, vec![]);
    assert!(core.prev_page().is_empty());
    assert!(core.next_page().is_empty());
}

// =============================================================
// Editor: drafting
// =============================================================

#[test]
fn viewer_mode_has_no_editor() {
    let mut core = boot(ViewerConfig::default(), vec![]);
    assert!(core.editor_view().is_none());
    assert_eq!(core.begin_submit(), Err(SubmitBlocked::ReadOnly));
}

#[test]
fn comment_without_coords_reports_error_and_adds_nothing() {
    let mut core = boot(editor_config(), vec![]);
    core.editor_select_type(AnnType::Comment, &mut yes);
    core.editor_set_content("no anchor yet".into());
    assert_eq!(core.editor_stage(), vec![Action::DraftChanged]);
    assert!(core.page().is_some_and(PageDoc::is_empty));
    let view = core.editor_view().unwrap();
    assert_eq!(view.coords_error.as_deref(), Some("Click the image to set coordinates"));
    assert!(!view.can_submit);
}

#[test]
fn clicking_the_image_places_the_draft_in_original_pixels() {
    let mut core = boot(editor_config(), vec![]);
    core.editor_select_type(AnnType::Comment, &mut yes);
    core.click_image(Point::new(300.0, 500.0), &mut no);
    assert_eq!(draft(&core).coords, Some(Coords(600.0, 1000.0)));
    assert_eq!(core.editor_view().unwrap().coords_text, "[600, 1000]");
}

#[test]
fn text_typed_before_placing_can_be_staged() {
    let mut core = boot(editor_config(), vec![]);
    core.editor_set_content("typed first".into());
    core.click_image(Point::new(100.0, 100.0), &mut no);
    let view = core.editor_view().unwrap();
    assert!(view.dirty);
    assert!(view.can_stage);
    assert!(!core.editor_stage().is_empty());
    assert_eq!(core.page().map(PageDoc::len), Some(1));
    assert_eq!(core.markers().len(), 1);
}

#[test]
fn editor_marker_click_loads_draft_without_popup() {
    let mut core = boot(editor_config(), vec![ann(Some("a1"), AnnType::Main, "finding", Some((100.0, 200.0)))]);
    let actions = core.click_marker("a1", &mut no);
    assert_eq!(
        actions,
        vec![Action::DraftChanged, Action::SelectMarker { dom_id: Some("circle-a1".into()) }]
    );
    assert_eq!(draft(&core).id.as_deref(), Some("a1"));
    assert!(core.popups().visible().is_empty());
}

#[test]
fn region_anchored_annotation_gets_coords_from_its_anchor() {
    let mut anchored = ann(Some("r"), AnnType::Comment, "x", None);
    anchored.target_block = Some("b1".into());
    let mut core = EngineCore::new(editor_config());
    let ticket = core.request_page(page_one());
    core.apply_page(ticket, Ok(payload(vec![anchored])));
    core.apply_regions(ticket, Ok(vec![RawRegion { id: Some("b1".into()), bbox: vec![10.0, 20.0, 30.0, 40.0] }]));
    core.image_loaded(Size::new(1000.0, 1400.0), Size::new(500.0, 700.0));
    core.click_marker("r", &mut no);
    assert_eq!(draft(&core).coords, Some(Coords(60.0, 60.0)));
    assert!(!core.editor_view().unwrap().dirty);
}

#[test]
fn typed_coordinates_are_parsed() {
    let mut core = boot(editor_config(), vec![]);
    core.editor_select_type(AnnType::Main, &mut yes);
    core.editor_set_coords_text("12, 34");
    assert_eq!(draft(&core).coords, Some(Coords(12.0, 34.0)));
    core.editor_set_coords_text("nonsense");
    assert!(draft(&core).coords.is_none());
}

#[test]
fn general_draft_hides_coordinates() {
    let mut core = boot(editor_config(), vec![]);
    core.editor_select_type(AnnType::General, &mut yes);
    assert!(!core.editor_view().unwrap().show_coords);
}

#[test]
fn general_draft_is_autofilled_on_page_load() {
    let mut core = EngineCore::new(editor_config());
    core.editor_select_type(AnnType::General, &mut yes);
    let ticket = core.request_page(page_one());
    let actions = core.apply_page(ticket, Ok(payload(vec![ann(Some("g"), AnnType::General, "page note", None)])));
    assert!(actions.contains(&Action::DraftChanged));
    assert_eq!(draft(&core).content, "page note");
    assert_eq!(core.editor_view().unwrap().mode, EditingMode::Existing);
}

#[test]
fn edited_general_draft_is_not_overwritten() {
    let mut core = EngineCore::new(editor_config());
    core.editor_select_type(AnnType::General, &mut yes);
    core.editor_set_content("my own words".into());
    let ticket = core.request_page(page_one());
    core.apply_page(ticket, Ok(payload(vec![ann(Some("g"), AnnType::General, "page note", None)])));
    assert_eq!(draft(&core).content, "my own words");
}

#[test]
fn cancel_on_new_draft_clears_selection() {
    let mut core = boot(editor_config(), vec![]);
    core.editor_select_type(AnnType::Comment, &mut yes);
    core.click_image(Point::new(300.0, 500.0), &mut no);
    let actions = core.editor_cancel();
    assert!(actions.contains(&Action::SelectMarker { dom_id: None }));
}

#[test]
fn staging_adds_preview_marker() {
    let backend = MockBackend::new().with_page(page_one(), None, vec![]);
    let core = staged_comment(&backend);
    let page = core.page().unwrap();
    assert_eq!(page.len(), 1);
    let id = draft(&core).id.clone().unwrap();
    assert!(is_placeholder(&id));
    assert_eq!(core.markers().len(), 1);
    assert!(!core.editor_view().unwrap().can_stage);
}

#[test]
fn navigation_resets_the_draft() {
    let backend = MockBackend::new().with_page(page_one(), None, vec![]);
    let mut core = staged_comment(&backend);
    core.request_page(PageId::new(2));
    assert_eq!(core.editor_view().unwrap().mode, EditingMode::None);
}

// =============================================================
// Editor: submitting
// =============================================================

#[test]
fn submit_requires_sign_in() {
    let mut core = boot(editor_config(), vec![]);
    core.editor_select_type(AnnType::Comment, &mut yes);
    core.click_image(Point::new(300.0, 500.0), &mut no);
    core.editor_set_content("x".into());
    let blocked = core.begin_submit().unwrap_err();
    assert_eq!(blocked, SubmitBlocked::LoginRequired);
    assert_eq!(core.blocked_actions(&blocked), vec![Action::ShowLogin { message: None }]);
}

#[test]
fn submit_replaces_placeholder_with_server_id() {
    let backend = MockBackend::new().with_page(page_one(), None, vec![]).signed_in("ed");
    let mut core = staged_comment(&backend);
    let placeholder = draft(&core).id.clone().unwrap();

    let request = core.begin_submit().unwrap();
    assert!(request.server_id.is_none());
    assert!(core.editor_view().unwrap().submitting);
    let result = block_on(perform_submit(&backend, &request));
    let actions = core.finish_submit(&request, result, &mut no);

    assert!(actions.contains(&Action::RemoveMarker { dom_id: format!("circle-{placeholder}") }));
    let page = core.page().unwrap();
    assert!(page.get("srv-1").is_some());
    assert!(page.get(&placeholder).is_none());
    assert_eq!(page.version_token, backend.version_token(page_one()));
    assert_eq!(draft(&core).id.as_deref(), Some("srv-1"));
    assert_eq!(dom_ids(&core), vec!["circle-srv-1".to_string()]);
    let view = core.editor_view().unwrap();
    assert!(!view.dirty && !view.submitting);
}

#[test]
fn second_submit_while_in_flight_is_blocked() {
    let backend = MockBackend::new().with_page(page_one(), None, vec![]);
    let mut core = staged_comment(&backend);
    core.begin_submit().unwrap();
    assert_eq!(core.begin_submit(), Err(SubmitBlocked::InFlight));
}

#[test]
fn declined_conflict_changes_nothing() {
    let backend = MockBackend::new().with_page(page_one(), None, vec![]).signed_in("ed");
    let mut core = staged_comment(&backend);
    backend.bump_version(page_one());
    let before = core.page().unwrap().annotations().to_vec();
    let draft_before = draft(&core).clone();

    let request = core.begin_submit().unwrap();
    let result = block_on(perform_submit(&backend, &request));
    assert_eq!(result, Err(BackendError::Conflict));
    core.finish_submit(&request, result, &mut no);

    assert_eq!(core.page().unwrap().annotations(), before.as_slice());
    assert_eq!(draft(&core), &draft_before);
    assert!(core.editor_view().unwrap().can_submit);
}

#[test]
fn accepted_conflict_discards_and_refetches() {
    let backend = MockBackend::new().with_page(page_one(), None, vec![]).signed_in("ed");
    let mut core = staged_comment(&backend);
    backend.bump_version(page_one());
    let request = core.begin_submit().unwrap();
    let result = block_on(perform_submit(&backend, &request));
    let actions = core.finish_submit(&request, result, &mut yes);
    assert!(actions.contains(&Action::RefetchPage(page_one())));
    assert_eq!(core.editor_view().unwrap().mode, EditingMode::None);
}

#[test]
fn expired_session_keeps_draft_and_prompts_login() {
    let backend = MockBackend::new().with_page(page_one(), None, vec![]).signed_in("ed");
    let mut core = staged_comment(&backend);
    backend.expire_session();
    let draft_before = draft(&core).clone();
    let request = core.begin_submit().unwrap();
    let result = block_on(perform_submit(&backend, &request));
    let actions = core.finish_submit(&request, result, &mut no);
    assert!(actions.contains(&Action::ShowLogin { message: Some("Session expired, please sign in again".into()) }));
    assert_eq!(draft(&core), &draft_before);
    assert!(core.editor_view().unwrap().username.is_none());
}

#[test]
fn other_failures_are_retryable() {
    let backend = MockBackend::new().with_page(page_one(), None, vec![]).signed_in("ed");
    backend.fail_next_save(BackendError::Status(500));
    let mut core = staged_comment(&backend);
    let request = core.begin_submit().unwrap();
    let result = block_on(perform_submit(&backend, &request));
    let actions = core.finish_submit(&request, result, &mut no);
    assert!(actions.iter().any(|a| matches!(a, Action::Notice { retryable: true, .. })));
    assert!(core.begin_submit().is_ok());
}

#[test]
fn save_result_for_another_page_is_ignored() {
    let backend = MockBackend::new().with_page(page_one(), None, vec![]).signed_in("ed");
    let mut core = staged_comment(&backend);
    let request = core.begin_submit().unwrap();
    let result = block_on(perform_submit(&backend, &request));
    core.request_page(PageId::new(2));
    assert!(core.finish_submit(&request, result, &mut no).is_empty());
    assert!(!core.editor_view().unwrap().submitting);
}
