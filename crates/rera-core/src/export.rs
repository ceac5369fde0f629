use crate::{ReraError, Result, ScrapeResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Fixed leading column order for the tabular formats; promoter keys and
/// other dynamic fields follow, sorted.
const CORE_COLUMNS: [&str; 12] = [
    "project_name",
    "developer",
    "address",
    "project_type",
    "started_from",
    "possession_by",
    "units",
    "registration_number",
    "certificate_link",
    "detail_page_url",
    "description",
    "total_area",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Tsv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ReraError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "tsv" => Ok(ExportFormat::Tsv),
            other => Err(ReraError::Export(format!(
                "Unsupported format '{}'. Use 'json', 'csv', or 'tsv'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOutcome {
    pub success: bool,
    pub message: String,
    pub filename: Option<String>,
}

/// Serialize the record set to a file. The format string is validated
/// before any I/O happens, so an unknown format never leaves a partial
/// file behind. A missing filename defaults to
/// `rera_projects_<timestamp>.<ext>` in the current directory.
pub fn export_records(
    result: &ScrapeResult,
    format: &str,
    filename: Option<&Path>,
) -> ExportOutcome {
    let format = match ExportFormat::from_str(format) {
        Ok(f) => f,
        Err(e) => {
            return ExportOutcome {
                success: false,
                message: e.to_string(),
                filename: None,
            }
        }
    };

    let path = filename
        .map(PathBuf::from)
        .unwrap_or_else(|| default_filename(format));

    let written = match format {
        ExportFormat::Json => write_json(result, &path),
        ExportFormat::Csv => write_delimited(result, &path, b','),
        ExportFormat::Tsv => write_delimited(result, &path, b'\t'),
    };

    match written {
        Ok(()) => {
            info!("Exported {} projects to {}", result.data.len(), path.display());
            ExportOutcome {
                success: true,
                message: format!("Data exported successfully to {}", path.display()),
                filename: Some(path.display().to_string()),
            }
        }
        Err(e) => ExportOutcome {
            success: false,
            message: format!("Export failed: {}", e),
            filename: None,
        },
    }
}

fn default_filename(format: ExportFormat) -> PathBuf {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("rera_projects_{}.{}", timestamp, format.extension()))
}

fn write_json(result: &ScrapeResult, path: &Path) -> Result<()> {
    let payload = serde_json::json!({
        "projects": result.data,
        "metadata": {
            "total_projects": result.data.len(),
            "total_urls": result.detail_urls.len(),
            "exported_at": Utc::now(),
        },
    });
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &payload)?;
    Ok(())
}

fn write_delimited(result: &ScrapeResult, path: &Path, delimiter: u8) -> Result<()> {
    // One row per record, column set = union of all keys seen.
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = result
        .data
        .iter()
        .map(|record| match serde_json::to_value(record) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(ReraError::Export("record did not serialize to an object".into())),
            Err(e) => Err(e.into()),
        })
        .collect::<Result<_>>()?;

    let seen: BTreeSet<&str> = rows.iter().flat_map(|row| row.keys().map(String::as_str)).collect();
    let mut columns: Vec<&str> = CORE_COLUMNS.iter().copied().filter(|c| seen.contains(c)).collect();
    columns.extend(seen.iter().copied().filter(|c| !CORE_COLUMNS.contains(c)));
    if columns.is_empty() {
        // Empty record set still gets a well-formed header.
        columns.extend(&CORE_COLUMNS[..10]);
    }

    let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_path(path)?;
    writer.write_record(&columns)?;
    for row in &rows {
        let values: Vec<String> = columns
            .iter()
            .map(|col| match row.get(*col) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            })
            .collect();
        writer.write_record(&values)?;
    }
    writer.flush()?;
    Ok(())
}
