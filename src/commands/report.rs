use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::output::Format;
use crate::report::{self, REPORT_FILE};
use crate::store::state::{STATE_FILE, StateStore};

pub fn run(
    root: &Path,
    state: Option<PathBuf>,
    out: Option<PathBuf>,
    format: Format,
) -> Result<()> {
    let state_path = state.unwrap_or_else(|| root.join(STATE_FILE));
    let store = StateStore::load(&state_path)?;

    let records: Vec<_> = store.records().collect();
    let out_path = out.unwrap_or_else(|| root.join(REPORT_FILE));
    report::write(&records, &out_path)?;

    match format {
        Format::Json => println!(
            "{}",
            serde_json::json!({ "report": out_path.display().to_string(), "records": records.len() })
        ),
        _ => println!("Report saved to {}", out_path.display()),
    }
    Ok(())
}
