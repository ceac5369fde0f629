use crate::chrome::ChromeSession;
use crate::session::{wait_for_all, BrowserSession, Locator, ELEMENT_WAIT};
use rera_core::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

const ARTICLE_PARAGRAPH: Locator = Locator::Css("div.mw-parser-output > p");

/// Standalone single-page fetcher, unrelated to the registry traversal:
/// renders one Wikipedia article and returns its lead paragraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiSummary {
    pub success: bool,
    pub title: String,
    pub summary: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn fetch_wikipedia_summary(title: &str, headless: bool) -> WikiSummary {
    let session = match ChromeSession::launch(headless).await {
        Ok(session) => session,
        Err(e) => {
            warn!("Error setting up browser session: {}", e);
            return WikiSummary {
                success: false,
                title: display_title(title),
                summary: String::new(),
                url: article_url(title),
                error: Some(e.to_string()),
            };
        }
    };
    let summary = fetch_with(&session, title).await;
    session.close().await;
    summary
}

/// Fetch against an already-established session (tests use this).
pub async fn fetch_with(session: &dyn BrowserSession, title: &str) -> WikiSummary {
    let url = article_url(title);
    match lead_paragraph(session, &url).await {
        Ok(summary) => WikiSummary {
            success: true,
            title: display_title(title),
            summary,
            url,
            error: None,
        },
        Err(e) => WikiSummary {
            success: false,
            title: display_title(title),
            summary: String::new(),
            url,
            error: Some(e.to_string()),
        },
    }
}

async fn lead_paragraph(session: &dyn BrowserSession, url: &str) -> Result<String> {
    session.goto(url).await?;
    let paragraphs = wait_for_all(session, &ARTICLE_PARAGRAPH, ELEMENT_WAIT).await?;
    // Articles often open with empty layout paragraphs; take the first one
    // with real text.
    for paragraph in paragraphs {
        let text = session.text(paragraph).await?;
        let text = text.trim();
        if !text.is_empty() {
            return Ok(text.to_string());
        }
    }
    Ok(String::new())
}

fn article_url(title: &str) -> String {
    format!("https://en.wikipedia.org/wiki/{}", title)
}

fn display_title(title: &str) -> String {
    title.replace('_', " ")
}
