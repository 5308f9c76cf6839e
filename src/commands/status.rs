use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::MigrationStatus;
use crate::output::{self, Format};
use crate::store::state::{STATE_FILE, StateStore};

pub fn run(
    root: &Path,
    state: Option<PathBuf>,
    status: Option<MigrationStatus>,
    format: Format,
) -> Result<()> {
    let state_path = state.unwrap_or_else(|| root.join(STATE_FILE));
    let store = StateStore::load(&state_path)?;

    let records: Vec<_> = store
        .records()
        .filter(|record| status.is_none_or(|wanted| record.status == wanted))
        .collect();
    output::print_records(&records, format)?;
    Ok(())
}
