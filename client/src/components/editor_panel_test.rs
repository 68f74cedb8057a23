use super::*;

#[test]
fn type_options_cover_editable_types() {
    for (value, _) in TYPE_OPTIONS {
        assert!(AnnType::from(value.to_string()).is_editable());
    }
    assert!(!TYPE_OPTIONS.iter().any(|(value, _)| *value == "small"));
}

#[test]
fn mode_labels_are_distinct() {
    let labels = [mode_label(EditingMode::None), mode_label(EditingMode::New), mode_label(EditingMode::Existing)];
    assert_ne!(labels[0], labels[1]);
    assert_ne!(labels[1], labels[2]);
}

#[test]
fn submit_label_tracks_in_flight_save() {
    assert_eq!(submit_label(false), "Submit");
    assert_eq!(submit_label(true), "Saving...");
}
