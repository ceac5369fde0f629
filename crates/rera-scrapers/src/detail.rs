use crate::card::CARD;
use crate::promoter::extract_promoter_details;
use crate::session::{settle, wait_for_all, BrowserSession, Locator, WindowHandle};
use rera_core::{ProjectRecord, Result};
use std::time::Duration;
use tracing::{debug, warn};

const VIEW_DETAILS: Locator = Locator::Text {
    css: "a",
    needle: "View Details",
};

/// Known containers for the in-page detail modal.
const MODAL_VARIANTS: [Locator; 4] = [
    Locator::Css(".modal-content"),
    Locator::Css(".popup-content"),
    Locator::Css(".detail-modal"),
    Locator::Css("[role='dialog']"),
];

const MODAL_CLOSE: Locator = Locator::Css(".close, .btn-close, [data-dismiss='modal']");
const DESCRIPTION: Locator = Locator::Css(".project-description, .description");
const TOTAL_AREA_LABEL: Locator = Locator::Text {
    css: "label",
    needle: "Total Area",
};

const SCROLL_SETTLE: Duration = Duration::from_secs(1);
const CLICK_SETTLE: Duration = Duration::from_secs(3);
const BACK_SETTLE: Duration = Duration::from_secs(2);
const DETAIL_SETTLE: Duration = Duration::from_secs(2);
const DISMISS_SETTLE: Duration = Duration::from_secs(1);
const MODAL_WAIT: Duration = Duration::from_secs(10);

/// What actually happened after clicking "View Details". The control does
/// not declare its behavior anywhere; the outcome is only distinguishable
/// by observing the environment after the click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    /// A new window or tab was opened.
    NewWindow(WindowHandle),
    /// The listing window itself navigated to the detail page.
    SameWindowNav(String),
    /// Neither happened: an in-page modal is assumed.
    Modal,
}

/// Pure classification over post-click observations.
pub fn classify(
    windows_before: &[WindowHandle],
    windows_after: &[WindowHandle],
    url_before: &str,
    url_after: &str,
) -> DetailOutcome {
    if windows_after.len() > windows_before.len() {
        let newest = windows_after
            .iter()
            .rev()
            .find(|w| !windows_before.contains(w))
            .copied();
        if let Some(window) = newest {
            return DetailOutcome::NewWindow(window);
        }
    }
    if url_after != url_before {
        return DetailOutcome::SameWindowNav(url_after.to_string());
    }
    DetailOutcome::Modal
}

/// Open the detail view for the card at `card_index`, run the extraction
/// path matching the observed navigation mode, and restore the listing.
/// Returns the resolved detail URL, also written to the record.
///
/// Every failure is absorbed here: whatever was gathered before the
/// failure stays on the record, stray windows are swept, and focus goes
/// back to the originating window. A bad detail view never aborts the
/// page or the run.
pub async fn enrich_record(
    session: &dyn BrowserSession,
    card_index: usize,
    record: &mut ProjectRecord,
) -> Option<String> {
    let original = match session.current_window().await {
        Ok(window) => window,
        Err(e) => {
            warn!("could not resolve originating window: {}", e);
            return None;
        }
    };

    match drive(session, card_index, record, original).await {
        Ok(detail_url) => {
            if let Some(url) = &detail_url {
                record.detail_page_url = url.clone();
            }
            detail_url
        }
        Err(e) => {
            warn!("Error getting detailed info for card {}: {}", card_index + 1, e);
            restore(session, original).await;
            None
        }
    }
}

async fn drive(
    session: &dyn BrowserSession,
    card_index: usize,
    record: &mut ProjectRecord,
    original: WindowHandle,
) -> Result<Option<String>> {
    // Detail navigation re-renders the listing, so the card list is
    // re-queried rather than reusing handles from the card extraction.
    let cards = session.find_all(&CARD).await?;
    let Some(card) = cards.get(card_index).copied() else {
        return Ok(None);
    };
    let Some(button) = session.find_in(card, &VIEW_DETAILS).await?.into_iter().next() else {
        return Ok(None);
    };

    let url_before = session.current_url().await?;
    let windows_before = session.windows().await?;

    session.scroll_into_view(button).await?;
    settle(SCROLL_SETTLE).await;
    session.click(button).await?;
    settle(CLICK_SETTLE).await;

    let windows_after = session.windows().await?;
    let url_after = session.current_url().await?;
    let outcome = classify(&windows_before, &windows_after, &url_before, &url_after);
    debug!("card {} detail outcome: {:?}", card_index + 1, outcome);

    let detail_url = match outcome {
        DetailOutcome::NewWindow(window) => {
            session.switch_to(window).await?;
            let url = session.current_url().await?;
            extract_detail_page(session, record).await;
            session.close_window(window).await?;
            session.switch_to(original).await?;
            Some(url)
        }
        DetailOutcome::SameWindowNav(url) => {
            extract_detail_page(session, record).await;
            session.back().await?;
            settle(BACK_SETTLE).await;
            Some(url)
        }
        DetailOutcome::Modal => {
            extract_modal(session, record).await;
            // The listing never left the screen; its URL is the best
            // detail URL a modal has.
            Some(url_before)
        }
    };

    Ok(detail_url)
}

/// Best-effort extraction on a full detail page (new window or same-window
/// navigation): promoter panel, free-text description, total area.
async fn extract_detail_page(session: &dyn BrowserSession, record: &mut ProjectRecord) {
    settle(DETAIL_SETTLE).await;

    for (key, value) in extract_promoter_details(session).await {
        record.insert_extra(key, value);
    }

    if let Ok(Some(element)) = session.find(&DESCRIPTION).await {
        if let Ok(text) = session.text(element).await {
            let text = text.trim();
            if !text.is_empty() {
                record.description = Some(text.to_string());
            }
        }
    }

    if let Ok(Some(label)) = session.find(&TOTAL_AREA_LABEL).await {
        if let Ok(Some(value)) = session.sibling_text(label, "*").await {
            let value = value.trim();
            if !value.is_empty() {
                record.total_area = Some(value.to_string());
            }
        }
    }
}

/// Extraction inside an in-page modal: full text as a catch-all field,
/// promoter panel if present, then dismiss so the next card starts from a
/// clean listing.
async fn extract_modal(session: &dyn BrowserSession, record: &mut ProjectRecord) {
    let mut modal = None;
    for locator in &MODAL_VARIANTS {
        if let Ok(found) = wait_for_all(session, locator, MODAL_WAIT).await {
            modal = found.into_iter().next();
            break;
        }
    }
    let Some(modal) = modal else {
        debug!("no modal container appeared after click");
        return;
    };

    if let Ok(text) = session.text(modal).await {
        record.insert_extra("modal_content", text);
    }

    for (key, value) in extract_promoter_details(session).await {
        record.insert_extra(key, value);
    }

    let closed = match session.find_in(modal, &MODAL_CLOSE).await {
        Ok(controls) => match controls.first() {
            Some(control) => session.click(*control).await.is_ok(),
            None => false,
        },
        Err(_) => false,
    };
    if !closed {
        let _ = session.press_escape().await;
    }
    settle(DISMISS_SETTLE).await;
}

/// Failure cleanup: close any window that is not the originating one and
/// put focus back where the traversal expects it.
pub async fn restore(session: &dyn BrowserSession, original: WindowHandle) {
    if let Ok(windows) = session.windows().await {
        for window in windows {
            if window != original {
                let _ = session.close_window(window).await;
            }
        }
    }
    let _ = session.switch_to(original).await;
}
