use crate::card::{extract_card, CARD};
use crate::chrome::ChromeSession;
use crate::detail::enrich_record;
use crate::session::{settle, wait_for_all, BrowserSession, ElementHandle, Locator, ELEMENT_WAIT};
use rera_core::{
    export_records, DeveloperSearch, ExportFormat, ExportOutcome, ProjectLookup, ProjectRecord,
    Result, ScrapeResult, SummaryEnvelope,
};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

pub const DEFAULT_LISTING_URL: &str = "https://rera.odisha.gov.in/projects/project-list";

/// The registry serves a fixed six cards per listing page.
pub const CARDS_PER_PAGE: usize = 6;

const NEXT_VARIANTS: [Locator; 2] = [
    Locator::Text {
        css: "a",
        needle: "Next",
    },
    Locator::Css("a.next"),
];

const PAGE_SETTLE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    /// Render the browser window or not.
    pub headless: bool,
    /// Listing to traverse; overridable per controller, defaults to the
    /// Odisha RERA project list.
    pub listing_url: String,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            listing_url: DEFAULT_LISTING_URL.to_string(),
        }
    }
}

/// The scraping controller. Stateless between invocations: every operation
/// opens a fresh browser session, runs the traversal to completion, and
/// releases the session, so concurrent callers can each hold their own
/// controller without sharing anything.
#[derive(Debug, Clone, Default)]
pub struct ScrapeController {
    options: ScrapeOptions,
}

impl ScrapeController {
    pub fn new(options: ScrapeOptions) -> Self {
        Self { options }
    }

    /// Sole scraping entry point: traverse the listing page by page,
    /// enriching every card from its detail view. Only a failed browser
    /// launch or a first page that never renders cards produce
    /// `success = false`; later failures degrade per card or per page.
    pub async fn get_projects(&self, page_cap: Option<u32>) -> ScrapeResult {
        let started = Instant::now();
        match ChromeSession::launch(self.options.headless).await {
            Ok(session) => self.run_with(&session, page_cap).await,
            Err(e) => {
                warn!("Error setting up browser session: {}", e);
                ScrapeResult::failed(
                    "Failed to initialize browser session",
                    e.to_string(),
                    started.elapsed().as_secs_f64(),
                )
            }
        }
    }

    /// Run the traversal against an already-established session. The
    /// session is released unconditionally before this returns, stray
    /// windows first.
    pub async fn run_with(
        &self,
        session: &dyn BrowserSession,
        page_cap: Option<u32>,
    ) -> ScrapeResult {
        let started = Instant::now();
        info!("Starting project scraping...");
        let outcome = self.traverse(session, page_cap).await;
        sweep_extra_windows(session).await;
        session.close().await;

        let elapsed = started.elapsed().as_secs_f64();
        match outcome {
            Ok((records, detail_urls)) => ScrapeResult::completed(records, detail_urls, elapsed),
            Err(e) => {
                warn!("Error during scraping: {}", e);
                ScrapeResult::failed(format!("Scraping failed: {}", e), e.to_string(), elapsed)
            }
        }
    }

    async fn traverse(
        &self,
        session: &dyn BrowserSession,
        page_cap: Option<u32>,
    ) -> Result<(Vec<ProjectRecord>, Vec<String>)> {
        session.goto(&self.options.listing_url).await?;

        let mut records = Vec::new();
        let mut detail_urls = Vec::new();
        let mut page: u32 = 1;

        loop {
            match wait_for_all(session, &CARD, ELEMENT_WAIT).await {
                Ok(_) => {}
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    warn!("Page {} never rendered cards: {}", page, e);
                    break;
                }
            }

            info!("Scraping page {}...", page);
            self.scrape_page(session, &mut records, &mut detail_urls)
                .await;

            let Some(next) = find_next_control(session).await else {
                break;
            };
            if !session.is_enabled(next).await.unwrap_or(false) {
                break;
            }
            if let Err(e) = session.click(next).await {
                warn!("Next control did not accept the click: {}", e);
                break;
            }
            settle(PAGE_SETTLE).await;
            page += 1;
            if let Some(cap) = page_cap {
                if page > cap {
                    info!("Reached maximum pages limit: {}", cap);
                    break;
                }
            }
        }

        Ok((records, detail_urls))
    }

    async fn scrape_page(
        &self,
        session: &dyn BrowserSession,
        records: &mut Vec<ProjectRecord>,
        detail_urls: &mut Vec<String>,
    ) {
        for index in 0..CARDS_PER_PAGE {
            match self.scrape_card(session, index).await {
                Ok(Some((record, detail_url))) => {
                    info!(
                        "Extracted {}/{}: {}",
                        index + 1,
                        CARDS_PER_PAGE,
                        record.project_name
                    );
                    if let Some(url) = detail_url {
                        if !url.is_empty() {
                            detail_urls.push(url);
                        }
                    }
                    records.push(record);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Error extracting project {}: {}", index + 1, e);
                }
            }
        }
    }

    async fn scrape_card(
        &self,
        session: &dyn BrowserSession,
        index: usize,
    ) -> Result<Option<(ProjectRecord, Option<String>)>> {
        let cards = session.find_all(&CARD).await?;
        let Some(card) = cards.get(index).copied() else {
            return Ok(None);
        };
        let Some(mut record) = extract_card(session, card).await? else {
            return Ok(None);
        };
        let detail_url = enrich_record(session, index, &mut record).await;
        Ok(Some((record, detail_url)))
    }

    pub async fn get_project_by_registration(&self, registration_number: &str) -> ProjectLookup {
        let result = self.get_projects(None).await;
        registration_lookup(&result, registration_number)
    }

    pub async fn get_projects_by_developer(&self, developer_name: &str) -> DeveloperSearch {
        let result = self.get_projects(None).await;
        developer_search(&result, developer_name)
    }

    pub async fn get_projects_summary(&self) -> SummaryEnvelope {
        let result = self.get_projects(None).await;
        summary_envelope(&result)
    }

    /// Scrape and serialize in one step. The format is validated before
    /// the scrape even starts, so a bad format costs neither a browser
    /// launch nor any I/O.
    pub async fn export_projects(
        &self,
        format: &str,
        filename: Option<&Path>,
        page_cap: Option<u32>,
    ) -> ExportOutcome {
        if let Err(e) = format.parse::<ExportFormat>() {
            return ExportOutcome {
                success: false,
                message: e.to_string(),
                filename: None,
            };
        }
        let result = self.get_projects(page_cap).await;
        if !result.success {
            return ExportOutcome {
                success: false,
                message: "No data to export".to_string(),
                filename: None,
            };
        }
        export_records(&result, format, filename)
    }
}

/// Wrap a registration lookup in its caller-facing envelope.
pub fn registration_lookup(result: &ScrapeResult, registration_number: &str) -> ProjectLookup {
    if !result.success {
        return ProjectLookup {
            success: false,
            message: result.message.clone(),
            data: None,
        };
    }
    match result.find_by_registration(registration_number) {
        Some(project) => ProjectLookup {
            success: true,
            message: "Project found".to_string(),
            data: Some(project.clone()),
        },
        None => ProjectLookup {
            success: false,
            message: format!(
                "Project with registration number '{}' not found",
                registration_number
            ),
            data: None,
        },
    }
}

pub fn developer_search(result: &ScrapeResult, developer_name: &str) -> DeveloperSearch {
    if !result.success {
        return DeveloperSearch {
            success: false,
            message: result.message.clone(),
            data: Vec::new(),
            total_found: 0,
        };
    }
    let matches: Vec<ProjectRecord> = result
        .find_by_developer(developer_name)
        .into_iter()
        .cloned()
        .collect();
    DeveloperSearch {
        success: true,
        message: format!(
            "Found {} projects by developer '{}'",
            matches.len(),
            developer_name
        ),
        total_found: matches.len(),
        data: matches,
    }
}

pub fn summary_envelope(result: &ScrapeResult) -> SummaryEnvelope {
    if !result.success {
        return SummaryEnvelope {
            success: false,
            message: result.message.clone(),
            data: None,
        };
    }
    SummaryEnvelope {
        success: true,
        message: "Summary generated successfully".to_string(),
        data: Some(result.summary()),
    }
}

async fn find_next_control(session: &dyn BrowserSession) -> Option<ElementHandle> {
    for locator in &NEXT_VARIANTS {
        match session.find(locator).await {
            Ok(Some(element)) => return Some(element),
            Ok(None) => {}
            Err(e) => {
                warn!("Next control lookup failed: {}", e);
                return None;
            }
        }
    }
    None
}

/// Stray tabs left behind by a misbehaving detail view are swept before
/// the session is handed back.
async fn sweep_extra_windows(session: &dyn BrowserSession) {
    let Ok(original) = session.current_window().await else {
        return;
    };
    crate::detail::restore(session, original).await;
}
