use crate::session::{settle, BrowserSession, ElementHandle, Locator};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Known renderings of the promoter tab control, most specific first.
const TAB_VARIANTS: [Locator; 3] = [
    Locator::Text {
        css: "a",
        needle: "Promoter Details",
    },
    Locator::Text {
        css: "a",
        needle: "Promoters Details",
    },
    Locator::Text {
        css: "li.nav-item a",
        needle: "Promoter",
    },
];

/// Known containers of the promoter content region.
const REGION_VARIANTS: [Locator; 3] = [
    Locator::Css(".promoter"),
    Locator::Css("div.promoter"),
    Locator::Css(".card-body"),
];

const PANEL: Locator = Locator::Css(".card-body");

const TAB_SETTLE: Duration = Duration::from_secs(3);

/// Pull promoter information out of whichever detail context is active.
/// Activates the promoter tab first when it exists and is not already
/// selected. A missing tab or region is not an error: the result is just
/// an empty mapping.
pub async fn extract_promoter_details(session: &dyn BrowserSession) -> BTreeMap<String, String> {
    if let Some(tab) = find_first(session, &TAB_VARIANTS).await {
        let class = session
            .attribute(tab, "class")
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        if !class.contains("active") && session.click(tab).await.is_ok() {
            settle(TAB_SETTLE).await;
        }
    } else {
        debug!("no promoter tab found in detail context");
    }

    extract_promoter_content(session).await
}

async fn extract_promoter_content(session: &dyn BrowserSession) -> BTreeMap<String, String> {
    let Some(region) = find_first(session, &REGION_VARIANTS).await else {
        return BTreeMap::new();
    };

    let mut data = BTreeMap::new();
    let panels = session.find_in(region, &PANEL).await.unwrap_or_default();
    for (index, panel) in panels.into_iter().enumerate() {
        let text = match session.text(panel).await {
            Ok(text) => text.trim().to_string(),
            Err(_) => continue,
        };
        if text.is_empty() {
            continue;
        }
        for (key, value) in parse_label_lines(&text) {
            data.insert(key, value);
        }
        data.insert(format!("promoter_card_{}", index + 1), text);
    }
    data
}

async fn find_first(
    session: &dyn BrowserSession,
    variants: &[Locator],
) -> Option<ElementHandle> {
    for locator in variants {
        if let Ok(Some(element)) = session.find(locator).await {
            return Some(element);
        }
    }
    None
}

/// Parse unstructured panel text into key/value pairs: only lines shaped
/// as a single-colon `label: value` count, everything else is ignored.
pub fn parse_label_lines(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.matches(':').count() != 1 {
                return None;
            }
            let (label, value) = line.split_once(':')?;
            if label.trim().is_empty() {
                return None;
            }
            Some((normalize_label(label), value.trim().to_string()))
        })
        .collect()
}

/// `"GST Number"` becomes `promoter_gst_number`; the prefix keeps promoter
/// keys from colliding with top-level record fields.
pub fn normalize_label(label: &str) -> String {
    format!("promoter_{}", label.trim().to_lowercase().replace(' ', "_"))
}
