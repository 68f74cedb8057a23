use futures::executor::block_on;
use overlay::doc::{AnnType, Coords};

use super::*;

fn config(mock: bool) -> ViewerConfig {
    ViewerConfig { editor: true, mock, ..ViewerConfig::default() }
}

fn comment(text: &str) -> SavePayload {
    SavePayload {
        ann_type: AnnType::Comment,
        text: text.into(),
        coords: Some(Coords(120.0, 340.0)),
        expected_version: Some("mock-sha-1".into()),
    }
}

#[test]
fn mock_flag_selects_mock_backend() {
    assert!(ClientBackend::from_config(&config(true)).is_mock());
    assert!(!ClientBackend::from_config(&config(false)).is_mock());
}

#[test]
fn mock_session_starts_signed_in() {
    let backend = ClientBackend::from_config(&config(true));
    let user = block_on(backend.current_user()).unwrap();
    assert_eq!(user.map(|u| u.username).as_deref(), Some(MOCK_USER));
}

#[cfg(not(feature = "csr"))]
#[test]
fn mock_page_without_static_file_starts_empty() {
    let backend = ClientBackend::from_config(&config(true));
    let payload = block_on(backend.fetch_page(PageId::new(3))).unwrap();
    assert!(payload.annotations.is_empty());
    assert_eq!(payload.version_token.as_deref(), Some("mock-sha-1"));
}

#[cfg(not(feature = "csr"))]
#[test]
fn mock_save_survives_refetch() {
    let backend = ClientBackend::from_config(&config(true));
    let page = PageId::new(3);
    block_on(backend.fetch_page(page)).unwrap();
    let token = block_on(backend.freshness_token()).unwrap();
    let saved = block_on(backend.save(page, None, &comment("Check the margin"), &token)).unwrap();
    assert_eq!(saved.version_token.as_deref(), Some("mock-sha-2"));

    let reloaded = block_on(backend.fetch_page(page)).unwrap();
    assert_eq!(reloaded.annotations.len(), 1);
    assert_eq!(reloaded.annotations[0].text, "Check the margin");
}
