use std::path::{Path, PathBuf};

use crate::config::{Config, GITHUB_OWNER, GITHUB_USERNAME};
use crate::error::{PortError, Result};
use crate::output::{self, Format};
use crate::remap;
use crate::store::state::{STATE_FILE, StateStore};

pub fn run(
    root: &Path,
    scan_root: Option<PathBuf>,
    state: Option<PathBuf>,
    owner: Option<String>,
    apply: bool,
    format: Format,
) -> Result<()> {
    let config = Config::load(root);
    let default_owner = match owner {
        Some(owner) => owner,
        None => config
            .value(GITHUB_OWNER)
            .or_else(|| config.value(GITHUB_USERNAME))
            .ok_or(PortError::MissingConfig(GITHUB_OWNER))?,
    };

    let state_path = state.unwrap_or_else(|| root.join(STATE_FILE));
    let store = StateStore::load(&state_path)?;

    let scan_root = scan_root.unwrap_or_else(|| root.to_path_buf());
    let locals = remap::discover_local_repos(&scan_root)?;
    let plan = remap::plan(&locals, &store, &default_owner);

    output::print_remap_plan(&plan, format)?;

    if apply && !plan.updates.is_empty() {
        remap::apply(&plan.updates)?;
        if format != Format::Json {
            println!("Updated {} repositories.", plan.updates.len());
        }
    }
    Ok(())
}
