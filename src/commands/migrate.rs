use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::config::{BitbucketCredentials, Config, DRY_RUN, GithubCredentials, LFS_MIGRATE};
use crate::error::{PortError, Result};
use crate::git::GitRunner;
use crate::mirror::{MirrorExecutor, MirrorOptions};
use crate::model::{DestinationPlan, MigrateOptions, SourceRepoRef};
use crate::orchestrator::Orchestrator;
use crate::output::{self, Format};
use crate::report;
use crate::services::SourceHost;
use crate::services::bitbucket::BitbucketHost;
use crate::services::github::GithubHost;
use crate::store::state::{STATE_FILE, StateStore};

pub struct MigrateArgs {
    /// Workspaces to enumerate; empty means every membership.
    pub workspaces: Vec<String>,
    /// `workspace/slug` filters; empty means everything listed.
    pub repos: Vec<String>,
    /// `workspace/slug=name` or `workspace/slug=owner/name` overrides.
    pub renames: Vec<String>,
    pub owner: Option<String>,
    pub lfs: bool,
    pub lfs_threshold: Option<String>,
    pub dry_run: bool,
    /// Source keys whose succeeded records are re-migrated.
    pub force: Vec<String>,
    /// Source keys pre-authorized to overwrite a non-empty destination.
    pub overwrite_non_empty: Vec<String>,
    pub state: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

pub fn run(root: &Path, args: MigrateArgs, format: Format) -> Result<()> {
    let config = Config::load(root);
    let bitbucket = BitbucketCredentials::from_config(&config)?;
    let github = GithubCredentials::from_config(&config)?;
    let default_owner = args
        .owner
        .clone()
        .unwrap_or_else(|| github.default_owner(&config));

    let lfs_enabled = args.lfs || config.bool_flag(LFS_MIGRATE).unwrap_or(false);
    let lfs_threshold = match &args.lfs_threshold {
        Some(raw) => raw.parse()?,
        None => config.lfs_threshold()?,
    };
    let dry_run = args.dry_run || config.bool_flag(DRY_RUN).unwrap_or(false);

    // Probe once up front; failing per-repository would waste a clone each.
    if lfs_enabled && !dry_run && !GitRunner::default().lfs_available() {
        return Err(PortError::LfsMissing);
    }

    let source_host = BitbucketHost::new(bitbucket.clone());
    let selected = select_sources(&source_host, &args.workspaces, &args.repos)?;

    let renames = parse_renames(&args.renames)?;
    let overwrite: BTreeSet<String> = args.overwrite_non_empty.iter().cloned().collect();
    let plans = build_plans(selected, &default_owner, &renames, &overwrite);

    let state_path = args.state.clone().unwrap_or_else(|| root.join(STATE_FILE));
    let mut store = StateStore::load(&state_path)?;

    let executor = MirrorExecutor::new(
        bitbucket,
        github.clone(),
        GithubHost::new(github),
        MirrorOptions {
            lfs: lfs_enabled,
            lfs_threshold,
            dry_run,
        },
    );
    let options = MigrateOptions {
        lfs_enabled,
        lfs_threshold,
        dry_run,
        force: args.force.iter().cloned().collect(),
    };

    let batch = Orchestrator::new(&mut store, &executor, options).run(&plans)?;
    output::print_batch(&batch, format)?;

    if !dry_run {
        let report_path = args
            .report
            .clone()
            .unwrap_or_else(|| root.join(report::REPORT_FILE));
        let records: Vec<_> = batch.records.iter().collect();
        report::write(&records, &report_path)?;
    }

    if let Some(reason) = batch.halted {
        return Err(PortError::BatchHalted(reason));
    }
    Ok(())
}

fn parse_source_key(raw: &str) -> Result<(String, String)> {
    let trimmed = raw.trim();
    let Some((workspace, slug)) = trimmed.split_once('/') else {
        return Err(PortError::InvalidSelector(raw.to_string()));
    };
    if workspace.is_empty() || slug.is_empty() || slug.contains('/') {
        return Err(PortError::InvalidSelector(raw.to_string()));
    }
    Ok((workspace.to_string(), slug.to_string()))
}

/// Enumerate and filter source repositories, in (workspace, slug) order.
fn select_sources<S: SourceHost>(
    host: &S,
    workspaces: &[String],
    repos: &[String],
) -> Result<Vec<SourceRepoRef>> {
    let filter: BTreeSet<(String, String)> = repos
        .iter()
        .map(|raw| parse_source_key(raw))
        .collect::<Result<_>>()?;

    let workspaces: Vec<String> = if !workspaces.is_empty() {
        workspaces.to_vec()
    } else if !filter.is_empty() {
        filter
            .iter()
            .map(|(workspace, _)| workspace.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    } else {
        host.list_workspaces()?
    };

    let mut selected = Vec::new();
    for workspace in &workspaces {
        for repo in host.list_repositories(workspace)? {
            if filter.is_empty()
                || filter.contains(&(repo.workspace.clone(), repo.slug.clone()))
            {
                selected.push(repo);
            }
        }
    }
    selected.sort_by(|a, b| (&a.workspace, &a.slug).cmp(&(&b.workspace, &b.slug)));

    if selected.is_empty() {
        return Err(PortError::EmptySelection);
    }
    Ok(selected)
}

/// Parse `workspace/slug=name` / `workspace/slug=owner/name` overrides into a
/// key → (owner override, name) map.
fn parse_renames(renames: &[String]) -> Result<BTreeMap<String, (Option<String>, String)>> {
    let mut parsed = BTreeMap::new();
    for raw in renames {
        let Some((key, target)) = raw.split_once('=') else {
            return Err(PortError::InvalidSelector(raw.to_string()));
        };
        let (workspace, slug) = parse_source_key(key)?;
        let target = target.trim();
        if target.is_empty() {
            return Err(PortError::InvalidSelector(raw.to_string()));
        }
        let value = match target.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
                (Some(owner.to_string()), name.to_string())
            }
            Some(_) => return Err(PortError::InvalidSelector(raw.to_string())),
            None => (None, target.to_string()),
        };
        parsed.insert(format!("{workspace}/{slug}"), value);
    }
    Ok(parsed)
}

fn build_plans(
    sources: Vec<SourceRepoRef>,
    default_owner: &str,
    renames: &BTreeMap<String, (Option<String>, String)>,
    overwrite: &BTreeSet<String>,
) -> Vec<(SourceRepoRef, DestinationPlan)> {
    sources
        .into_iter()
        .map(|source| {
            let key = source.key();
            let (owner, name) = match renames.get(&key) {
                Some((owner, name)) => (
                    owner.clone().unwrap_or_else(|| default_owner.to_string()),
                    name.clone(),
                ),
                None => (default_owner.to_string(), source.slug.clone()),
            };
            let mut plan = DestinationPlan::new(owner, name);
            plan.overwrite_non_empty = overwrite.contains(&key);
            (source, plan)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSource {
        workspaces: Vec<String>,
        repos: Vec<SourceRepoRef>,
    }

    impl SourceHost for FakeSource {
        fn list_workspaces(&self) -> Result<Vec<String>> {
            Ok(self.workspaces.clone())
        }

        fn list_repositories(&self, workspace: &str) -> Result<Vec<SourceRepoRef>> {
            Ok(self
                .repos
                .iter()
                .filter(|repo| repo.workspace == workspace)
                .cloned()
                .collect())
        }
    }

    fn source(workspace: &str, slug: &str) -> SourceRepoRef {
        SourceRepoRef {
            workspace: workspace.into(),
            slug: slug.into(),
            clone_url: format!("https://bitbucket.org/{workspace}/{slug}.git"),
        }
    }

    fn fake() -> FakeSource {
        FakeSource {
            workspaces: vec!["team".into(), "side".into()],
            repos: vec![
                source("team", "widgets"),
                source("team", "gadgets"),
                source("side", "scratch"),
            ],
        }
    }

    #[test]
    fn selects_everything_when_unfiltered() {
        let selected = select_sources(&fake(), &[], &[]).unwrap();
        let keys: Vec<String> = selected.iter().map(|s| s.key()).collect();
        assert_eq!(keys, vec!["side/scratch", "team/gadgets", "team/widgets"]);
    }

    #[test]
    fn repo_filter_narrows_and_implies_workspaces() {
        let selected = select_sources(&fake(), &[], &["team/widgets".into()]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].key(), "team/widgets");
    }

    #[test]
    fn workspace_filter_keeps_only_that_workspace() {
        let selected = select_sources(&fake(), &["side".into()], &[]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].key(), "side/scratch");
    }

    #[test]
    fn empty_selection_is_an_error() {
        let err = select_sources(&fake(), &[], &["team/nonexistent".into()]).unwrap_err();
        assert!(matches!(err, PortError::EmptySelection));
    }

    #[test]
    fn bad_selector_is_rejected() {
        assert!(select_sources(&fake(), &[], &["no-slash".into()]).is_err());
        assert!(parse_source_key("a/b/c").is_err());
        assert!(parse_source_key("/x").is_err());
    }

    #[test]
    fn renames_parse_both_shapes() {
        let parsed = parse_renames(&[
            "team/widgets=new-widgets".into(),
            "team/gadgets=platform/gadgets-core".into(),
        ])
        .unwrap();
        assert_eq!(
            parsed.get("team/widgets"),
            Some(&(None, "new-widgets".to_string()))
        );
        assert_eq!(
            parsed.get("team/gadgets"),
            Some(&(Some("platform".to_string()), "gadgets-core".to_string()))
        );
    }

    #[test]
    fn renames_reject_malformed_input() {
        assert!(parse_renames(&["team/widgets".into()]).is_err());
        assert!(parse_renames(&["team/widgets=".into()]).is_err());
        assert!(parse_renames(&["team/widgets=/name".into()]).is_err());
    }

    #[test]
    fn plans_default_to_owner_and_slug() {
        let plans = build_plans(
            vec![source("team", "widgets")],
            "acme",
            &BTreeMap::new(),
            &BTreeSet::new(),
        );
        assert_eq!(plans[0].1.owner, "acme");
        assert_eq!(plans[0].1.name, "widgets");
        assert!(!plans[0].1.overwrite_non_empty);
    }

    #[test]
    fn plans_apply_renames_and_overwrite_authorization() {
        let renames = parse_renames(&["team/widgets=platform/core".into()]).unwrap();
        let overwrite: BTreeSet<String> = ["team/widgets".to_string()].into_iter().collect();
        let plans = build_plans(
            vec![source("team", "widgets")],
            "acme",
            &renames,
            &overwrite,
        );
        assert_eq!(plans[0].1.owner, "platform");
        assert_eq!(plans[0].1.name, "core");
        assert!(plans[0].1.overwrite_non_empty);
    }
}
