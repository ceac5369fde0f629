use crate::session::{BrowserSession, ElementHandle, Locator};
use rera_core::{ProjectRecord, Result};
use std::collections::BTreeMap;

/// One listing card per project; the site renders at most six per page.
pub const CARD: Locator = Locator::Css(".project-card");

const CARD_TITLE: Locator = Locator::Css(".card-title");
const DEVELOPER: Locator = Locator::Css("small");
const LABEL_CONTROL: Locator = Locator::Css(".label-control");
const UNITS: Locator = Locator::Css(".apartment-unit strong");
const REGISTRATION: Locator = Locator::Css(".fw-bold");
const CERTIFICATE: Locator = Locator::Css(".icon-pdf");

/// Extract the visible fields of one listing card. Per-field lookup
/// failures yield an empty string; only a missing card title disqualifies
/// the card entirely.
pub async fn extract_card(
    session: &dyn BrowserSession,
    card: ElementHandle,
) -> Result<Option<ProjectRecord>> {
    let project_name = match first_text(session, card, &CARD_TITLE).await {
        Some(title) if !title.is_empty() => title,
        _ => return Ok(None),
    };

    let developer = first_text(session, card, &DEVELOPER)
        .await
        .map(|text| text.trim_start_matches("by ").trim().to_string())
        .unwrap_or_default();

    let labels = labelled_values(session, card).await;

    let units = first_text(session, card, &UNITS).await.unwrap_or_default();
    let registration_number = first_text(session, card, &REGISTRATION)
        .await
        .unwrap_or_default();
    let certificate_link = match first_in(session, card, &CERTIFICATE).await {
        Some(link) => session
            .attribute(link, "href")
            .await
            .ok()
            .flatten()
            .unwrap_or_default(),
        None => String::new(),
    };

    Ok(Some(ProjectRecord {
        project_name,
        developer,
        address: labels.get("Address").cloned().unwrap_or_default(),
        project_type: labels.get("Project Type").cloned().unwrap_or_default(),
        started_from: labels.get("Started From").cloned().unwrap_or_default(),
        possession_by: labels.get("Possession by").cloned().unwrap_or_default(),
        units,
        registration_number,
        certificate_link,
        ..Default::default()
    }))
}

/// Read the card's generic label region by pairing each `.label-control`
/// text with its adjacent `<strong>` value. Labels without a value sibling
/// simply do not populate a key.
async fn labelled_values(
    session: &dyn BrowserSession,
    card: ElementHandle,
) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    let labels = session
        .find_in(card, &LABEL_CONTROL)
        .await
        .unwrap_or_default();
    for label in labels {
        let Some(key) = non_empty_text(session, label).await else {
            continue;
        };
        if let Ok(Some(value)) = session.sibling_text(label, "strong").await {
            values.insert(key, value.trim().to_string());
        }
    }
    values
}

async fn first_in(
    session: &dyn BrowserSession,
    parent: ElementHandle,
    locator: &Locator,
) -> Option<ElementHandle> {
    session
        .find_in(parent, locator)
        .await
        .ok()
        .and_then(|found| found.into_iter().next())
}

async fn first_text(
    session: &dyn BrowserSession,
    parent: ElementHandle,
    locator: &Locator,
) -> Option<String> {
    let element = first_in(session, parent, locator).await?;
    non_empty_text(session, element).await.or(Some(String::new()))
}

async fn non_empty_text(session: &dyn BrowserSession, element: ElementHandle) -> Option<String> {
    let text = session.text(element).await.ok()?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
