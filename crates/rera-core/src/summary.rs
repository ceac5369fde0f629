use crate::ProjectRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Read-only statistics derived from one scrape. Building it is a single
/// pass over the record set and never mutates it, so repeated calls over
/// the same records yield identical histograms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_projects: usize,
    pub total_developers: usize,
    pub project_types: BTreeMap<String, usize>,
    pub locations: BTreeMap<String, usize>,
    pub top_developers: Vec<String>,
    pub scraped_at: DateTime<Utc>,
}

impl Summary {
    pub fn from_records(records: &[ProjectRecord]) -> Self {
        let mut seen_developers = HashSet::new();
        let mut top_developers = Vec::new();
        let mut project_types: BTreeMap<String, usize> = BTreeMap::new();
        let mut locations: BTreeMap<String, usize> = BTreeMap::new();

        for record in records {
            if !record.developer.is_empty() && seen_developers.insert(record.developer.clone()) {
                // First 10 distinct developers, in encounter order.
                if top_developers.len() < 10 {
                    top_developers.push(record.developer.clone());
                }
            }

            let ptype = if record.project_type.is_empty() {
                "Unknown".to_string()
            } else {
                record.project_type.clone()
            };
            *project_types.entry(ptype).or_insert(0) += 1;

            if !record.address.is_empty() {
                let location = match record.address.rsplit_once(',') {
                    Some((_, last)) => last.trim().to_string(),
                    None => "Unknown".to_string(),
                };
                *locations.entry(location).or_insert(0) += 1;
            }
        }

        Self {
            total_projects: records.len(),
            total_developers: seen_developers.len(),
            project_types,
            locations,
            top_developers,
            scraped_at: Utc::now(),
        }
    }
}
