use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod display;
mod export;
mod summary;

pub use display::{create_project_table, ProjectTableRow};
pub use export::{export_records, ExportFormat, ExportOutcome};
pub use summary::Summary;

pub type Result<T> = std::result::Result<T, ReraError>;

#[derive(Debug, thiserror::Error)]
pub enum ReraError {
    #[error("Browser setup error: {0}")]
    Setup(String),
    #[error("Page timeout: {0}")]
    PageTimeout(String),
    #[error("Scraping error: {0}")]
    Scraping(String),
    #[error("Export error: {0}")]
    Export(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReraError {
    /// Only browser-setup and first-page-timeout errors abort a run; every
    /// other kind is absorbed at a smaller boundary.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReraError::Setup(_) | ReraError::PageTimeout(_))
    }
}

/// One scraped registry project. Required fields fall back to an empty
/// string when their element is missing from the DOM; promoter fields and
/// raw panel dumps live in `extra`, keyed by normalized label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_name: String,
    pub developer: String,
    pub address: String,
    pub project_type: String,
    pub started_from: String,
    pub possession_by: String,
    pub units: String,
    pub registration_number: String,
    pub certificate_link: String,
    pub detail_page_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_area: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ProjectRecord {
    pub fn insert_extra(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extra.insert(key.into(), value.into());
    }
}

/// Envelope returned by every scrape run. Rebuilt fresh per invocation;
/// there is no cross-run persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub success: bool,
    pub message: String,
    pub data: Vec<ProjectRecord>,
    pub total_projects: usize,
    pub total_urls: usize,
    pub detail_urls: Vec<String>,
    pub execution_time: f64,
    pub scraped_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeResult {
    pub fn completed(data: Vec<ProjectRecord>, detail_urls: Vec<String>, execution_time: f64) -> Self {
        let message = format!("Successfully scraped {} projects", data.len());
        Self {
            success: true,
            message,
            total_projects: data.len(),
            total_urls: detail_urls.len(),
            data,
            detail_urls,
            execution_time,
            scraped_at: Utc::now(),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>, error: impl Into<String>, execution_time: f64) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Vec::new(),
            total_projects: 0,
            total_urls: 0,
            detail_urls: Vec::new(),
            execution_time,
            scraped_at: Utc::now(),
            error: Some(error.into()),
        }
    }

    /// Exact match on the registration number after trimming both sides.
    /// Records that carry no registration number never match.
    pub fn find_by_registration(&self, registration_number: &str) -> Option<&ProjectRecord> {
        let wanted = registration_number.trim();
        if wanted.is_empty() {
            return None;
        }
        self.data
            .iter()
            .find(|p| p.registration_number.trim() == wanted)
    }

    /// Case-insensitive substring match against the developer field.
    pub fn find_by_developer(&self, developer_name: &str) -> Vec<&ProjectRecord> {
        let needle = developer_name.to_lowercase();
        self.data
            .iter()
            .filter(|p| p.developer.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn summary(&self) -> Summary {
        Summary::from_records(&self.data)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectLookup {
    pub success: bool,
    pub message: String,
    pub data: Option<ProjectRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeveloperSearch {
    pub success: bool,
    pub message: String,
    pub data: Vec<ProjectRecord>,
    pub total_found: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryEnvelope {
    pub success: bool,
    pub message: String,
    pub data: Option<Summary>,
}
