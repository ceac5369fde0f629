use tabled::settings::{object::Columns, Modify, Style, Width};
use tabled::{Table, Tabled};

use crate::ProjectRecord;

#[derive(Tabled)]
pub struct ProjectTableRow {
    #[tabled(rename = "Project")]
    pub project_name: String,
    #[tabled(rename = "Developer")]
    pub developer: String,
    #[tabled(rename = "Type")]
    pub project_type: String,
    #[tabled(rename = "Registration No.")]
    pub registration_number: String,
    #[tabled(rename = "Address")]
    pub address: String,
}

impl ProjectTableRow {
    pub fn from_record(record: &ProjectRecord) -> Self {
        let or_dash = |s: &str| {
            if s.is_empty() {
                "-".to_string()
            } else {
                s.to_string()
            }
        };

        Self {
            project_name: or_dash(&record.project_name),
            developer: or_dash(&record.developer),
            project_type: or_dash(&record.project_type),
            registration_number: or_dash(&record.registration_number),
            address: or_dash(&record.address),
        }
    }
}

pub fn create_project_table(records: &[ProjectRecord]) -> String {
    let rows: Vec<ProjectTableRow> = records.iter().map(ProjectTableRow::from_record).collect();

    let mut table = Table::new(&rows);
    table
        .with(Style::modern())
        .with(Modify::new(Columns::single(0)).with(Width::truncate(32)))
        .with(Modify::new(Columns::single(1)).with(Width::truncate(28)))
        .with(Modify::new(Columns::single(3)).with(Width::truncate(24)))
        .with(Modify::new(Columns::single(4)).with(Width::wrap(48)));

    table.to_string()
}
