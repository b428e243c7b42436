mod common;

use common::{hidden_ad, revealing_ad, silent_ad, FakeDocument, FakeSession};
use divar_scout::error::RevealError;
use divar_scout::scrapers::{reveal_contact, RenderedPage, RevealStatus, RevealTiming};
use std::time::Duration;

const AD_URL: &str = "https://divar.ir/v/apartment/Ad1";

fn timing() -> RevealTiming {
    RevealTiming {
        control_wait: Duration::from_millis(50),
        resolution_timeout: Duration::from_millis(200),
        poll_interval: Duration::from_millis(10),
    }
}

async fn reveal(doc: FakeDocument) -> Result<RevealStatus, RevealError> {
    let session = FakeSession::new(vec![(AD_URL, doc)]);
    let page = session.page();
    page.navigate(AD_URL).await.unwrap();
    reveal_contact(&page, &timing()).await
}

#[tokio::test]
async fn phone_link_resolves_revealed() {
    let status = reveal(revealing_ad("09161112233")).await.unwrap();
    assert_eq!(status, RevealStatus::Revealed);
}

#[tokio::test]
async fn hidden_notice_resolves_hidden() {
    let status = reveal(hidden_ad()).await.unwrap();
    assert_eq!(status, RevealStatus::Hidden);
}

#[tokio::test]
async fn no_marker_within_timeout_is_a_failure_not_hidden() {
    let err = reveal(silent_ad()).await.unwrap_err();
    assert!(matches!(err, RevealError::Unresolved(d) if d == Duration::from_millis(200)));
}

#[tokio::test]
async fn missing_contact_button_fails_fast() {
    let doc = FakeDocument::new("<html><body><h1>بدون دکمه</h1></body></html>");
    let err = reveal(doc).await.unwrap_err();
    assert!(matches!(err, RevealError::ControlMissing(_)));
}
