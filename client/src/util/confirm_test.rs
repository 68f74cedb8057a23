use super::*;

#[test]
fn prompts_use_configured_labels() {
    let labels = Labels { discard_changes: "Drop it?".into(), ..Labels::default() };
    assert_eq!(prompt_text(&labels, Prompt::DiscardChanges), "Drop it?");
    assert_eq!(prompt_text(&labels, Prompt::RefetchAfterConflict), labels.conflict_refetch);
}

#[cfg(not(feature = "csr"))]
#[test]
fn window_confirm_declines_outside_browser() {
    let labels = Labels::default();
    assert!(!WindowConfirm::new(&labels).confirm(Prompt::DiscardChanges));
}
