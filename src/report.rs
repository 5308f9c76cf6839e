use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::model::MigrationRecord;

pub const REPORT_FILE: &str = "migration_report.md";

/// Render the migration report as a markdown table, one row per record.
pub fn render(records: &[&MigrationRecord]) -> String {
    let mut lines = vec![
        "# Bitbucket to GitHub Migration Report".to_string(),
        String::new(),
        "| Bitbucket Repo | GitHub Repo | Status |".to_string(),
        "| --- | --- | --- |".to_string(),
    ];
    for record in records {
        let source = format!(
            "[{}](https://bitbucket.org/{})",
            record.source,
            record.source.key()
        );
        let destination = format!(
            "[{}]({})",
            record.destination,
            record.destination.web_url()
        );
        lines.push(format!("| {source} | {destination} | {} |", record.status));
    }
    lines.push(String::new());
    lines.join("\n")
}

pub fn write(records: &[&MigrationRecord], path: &Path) -> Result<()> {
    fs::write(path, render(records))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DestinationPlan, MigrationStatus, SourceRepoRef};

    #[test]
    fn renders_one_row_per_record_with_links() {
        let mut record = MigrationRecord::new(
            SourceRepoRef {
                workspace: "team".into(),
                slug: "widgets".into(),
                clone_url: "https://bitbucket.org/team/widgets.git".into(),
            },
            DestinationPlan::new("acme", "widgets"),
        );
        record.status = MigrationStatus::Succeeded;

        let rendered = render(&[&record]);
        assert!(rendered.contains("| Bitbucket Repo | GitHub Repo | Status |"));
        assert!(rendered.contains("[team/widgets](https://bitbucket.org/team/widgets)"));
        assert!(rendered.contains("[acme/widgets](https://github.com/acme/widgets)"));
        assert!(rendered.contains("| succeeded |"));
    }

    #[test]
    fn empty_report_still_renders_the_header() {
        let rendered = render(&[]);
        assert!(rendered.starts_with("# Bitbucket to GitHub Migration Report"));
    }
}
