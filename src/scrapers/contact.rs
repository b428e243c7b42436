use crate::error::RevealError;
use crate::scrapers::selectors;
use crate::scrapers::traits::RenderedPage;
use scraper::Html;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

/// Resolved outcome of the reveal interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStatus {
    Revealed,
    Hidden,
}

#[derive(Debug, Clone, Copy)]
enum RevealState {
    Idle,
    AwaitingClick,
    AwaitingResolution,
}

/// Timing knobs for the reveal interaction
#[derive(Debug, Clone, Copy)]
pub struct RevealTiming {
    /// How long to wait for the contact button to appear
    pub control_wait: Duration,
    /// Total wait for the phone link or the hidden notice
    pub resolution_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for RevealTiming {
    fn default() -> Self {
        Self {
            control_wait: Duration::from_secs(10),
            resolution_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Click the contact button and wait for the phone number or the hidden notice.
///
/// Whichever appears first wins. Anything that prevents a decision is a
/// [`RevealError`], never a silent third state.
pub async fn reveal_contact(
    page: &dyn RenderedPage,
    timing: &RevealTiming,
) -> Result<RevealStatus, RevealError> {
    log_state(RevealState::Idle);
    info!("📱 Clicking the contact info button...");

    page.wait_for(selectors::CONTACT_BUTTON, timing.control_wait)
        .await
        .map_err(|e| RevealError::ControlMissing(format!("{e:#}")))?;

    log_state(RevealState::AwaitingClick);
    page.click(selectors::CONTACT_BUTTON)
        .await
        .map_err(|e| RevealError::Click(format!("{e:#}")))?;

    log_state(RevealState::AwaitingResolution);
    let poll = async {
        loop {
            let html = page
                .content()
                .await
                .map_err(|e| RevealError::Page(format!("{e:#}")))?;

            let state = contact_state(&Html::parse_document(&html));
            if let Some(status) = state {
                return Ok::<_, RevealError>(status);
            }
            sleep(timing.poll_interval).await;
        }
    };

    let status = timeout(timing.resolution_timeout, poll)
        .await
        .map_err(|_| RevealError::Unresolved(timing.resolution_timeout))??;

    debug!(?status, "Contact reveal resolved");
    Ok(status)
}

/// Inspect a document snapshot for one of the two terminal markers.
pub fn contact_state(document: &Html) -> Option<RevealStatus> {
    let phone = selectors::parse(selectors::PHONE_LINK).ok()?;
    if document.select(&phone).next().is_some() {
        return Some(RevealStatus::Revealed);
    }

    let titles = selectors::parse(selectors::HIDDEN_NOTICE_TITLE).ok()?;
    let hidden = document.select(&titles).any(|el| {
        el.text()
            .collect::<String>()
            .contains(selectors::HIDDEN_PHONE_NOTICE)
    });

    hidden.then_some(RevealStatus::Hidden)
}

fn log_state(state: RevealState) {
    debug!(?state, "contact reveal");
}
