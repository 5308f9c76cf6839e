use std::path::Path;

use tempfile::TempDir;

use crate::config::{BitbucketCredentials, GithubCredentials};
use crate::error::{PortError, Result};
use crate::git::{self, GitRunner};
use crate::model::{ByteSize, DestinationPlan, Outcome, SourceRepoRef};
use crate::services::{DestinationHost, DestinationState};

/// Per-repository executor options, fixed for the whole batch.
#[derive(Debug, Clone)]
pub struct MirrorOptions {
    pub lfs: bool,
    pub lfs_threshold: ByteSize,
    pub dry_run: bool,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            lfs: false,
            lfs_threshold: ByteSize::DEFAULT_LFS_THRESHOLD,
            dry_run: false,
        }
    }
}

/// Seam the orchestrator drives. Auth rejections come back as `Err` (they
/// stop the batch); every other problem is a per-repository `Outcome`.
pub trait Migrator {
    fn execute(&self, source: &SourceRepoRef, destination: &DestinationPlan) -> Result<Outcome>;
}

/// Mirrors one repository: scoped temp working directory, full mirror fetch,
/// optional LFS history rewrite, destination check/create, mirror push.
pub struct MirrorExecutor<D: DestinationHost> {
    git: GitRunner,
    bitbucket: BitbucketCredentials,
    github: GithubCredentials,
    destination: D,
    options: MirrorOptions,
}

impl<D: DestinationHost> MirrorExecutor<D> {
    pub fn new(
        bitbucket: BitbucketCredentials,
        github: GithubCredentials,
        destination: D,
        options: MirrorOptions,
    ) -> Self {
        Self {
            git: GitRunner::default(),
            bitbucket,
            github,
            destination,
            options,
        }
    }

    pub fn with_git_runner(mut self, git: GitRunner) -> Self {
        self.git = git;
        self
    }

    /// Decide whether a probed destination short-circuits the migration.
    /// Shared by the real path and the dry run.
    fn gate(state: DestinationState, plan: &DestinationPlan) -> Option<Outcome> {
        match state {
            DestinationState::Absent if !plan.create_if_missing => Some(Outcome::Failed(format!(
                "destination {plan} does not exist and creation is disabled"
            ))),
            DestinationState::NonEmptyExisting if !plan.overwrite_non_empty => {
                Some(Outcome::SkippedNonEmptyDestination)
            }
            _ => None,
        }
    }

    fn mirror(
        &self,
        source: &SourceRepoRef,
        plan: &DestinationPlan,
        workdir: &Path,
    ) -> Result<Outcome> {
        let dir = workdir.display().to_string();
        let source_url = git::inject_basic_auth(
            &source.clone_url,
            &self.bitbucket.username,
            &self.bitbucket.token,
        );
        // Full mirror fetch: every branch, tag, and internal ref. A shallow
        // or single-branch clone would silently drop history.
        self.git
            .run_with_retry(&["clone", "--mirror", &source_url, &dir], None)?;

        if self.options.lfs {
            self.rewrite_history(source, workdir)?;
        }

        let state = self.destination.exists(&plan.owner, &plan.name)?;
        if let Some(outcome) = Self::gate(state, plan) {
            return Ok(outcome);
        }
        if state == DestinationState::Absent {
            // Private by default; visibility changes are an operator decision
            // made on the destination side afterwards.
            self.destination.create(&plan.owner, &plan.name, true)?;
        }

        let dest_url = git::inject_basic_auth(
            &plan.https_url(),
            &self.github.username,
            &self.github.token,
        );
        self.git
            .run(&["remote", "set-url", "origin", &dest_url], Some(workdir))?;
        self.git
            .run_with_retry(&["push", "--mirror"], Some(workdir))
            .map_err(|err| match err {
                PortError::GitCommand { stderr, .. } if git::is_partial_push(&stderr) => {
                    PortError::PartialPush(plan.to_string(), stderr)
                }
                other => other,
            })?;

        Ok(Outcome::Succeeded)
    }

    /// Rewrite every historical revision so blobs at or above the threshold
    /// become LFS pointers. Destructive to the working copy only; a crash
    /// mid-rewrite is recovered by discarding the directory and re-cloning.
    fn rewrite_history(&self, source: &SourceRepoRef, workdir: &Path) -> Result<()> {
        let above = format!("--above={}", self.options.lfs_threshold.bytes());
        self.git
            .run(&["lfs", "install", "--local"], Some(workdir))
            .and_then(|()| {
                self.git.run(
                    &["lfs", "migrate", "import", "--everything", &above],
                    Some(workdir),
                )
            })
            .map_err(|err| match err {
                err @ PortError::AuthRejected(_, _) => err,
                other => PortError::HistoryRewrite(source.to_string(), other.to_string()),
            })
    }
}

impl<D: DestinationHost> Migrator for MirrorExecutor<D> {
    fn execute(&self, source: &SourceRepoRef, destination: &DestinationPlan) -> Result<Outcome> {
        if self.options.dry_run {
            // Existence and emptiness checks only; no clone, rewrite,
            // creation, or push.
            let state = self.destination.exists(&destination.owner, &destination.name)?;
            return Ok(Self::gate(state, destination).unwrap_or(Outcome::Succeeded));
        }

        // The TempDir guard removes the working directory on every exit
        // path, success and failure alike.
        let workdir = TempDir::with_prefix("gitport-mirror-")?;
        match self.mirror(source, destination, workdir.path()) {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.halts_batch() => Err(err),
            Err(err) => Ok(Outcome::Failed(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FakeDestination {
        state: DestinationState,
        creates: RefCell<u32>,
    }

    impl FakeDestination {
        fn new(state: DestinationState) -> Self {
            Self {
                state,
                creates: RefCell::new(0),
            }
        }
    }

    impl DestinationHost for FakeDestination {
        fn exists(&self, _owner: &str, _name: &str) -> Result<DestinationState> {
            Ok(self.state)
        }

        fn create(&self, owner: &str, name: &str, _private: bool) -> Result<String> {
            *self.creates.borrow_mut() += 1;
            Ok(format!("https://github.com/{owner}/{name}.git"))
        }
    }

    fn executor(state: DestinationState, dry_run: bool) -> MirrorExecutor<FakeDestination> {
        MirrorExecutor::new(
            BitbucketCredentials {
                email: "ops@example.com".into(),
                username: "ops".into(),
                token: "bb-token".into(),
            },
            GithubCredentials {
                username: "ops".into(),
                token: "gh-token".into(),
            },
            FakeDestination::new(state),
            MirrorOptions {
                dry_run,
                ..MirrorOptions::default()
            },
        )
    }

    fn source() -> SourceRepoRef {
        SourceRepoRef {
            workspace: "team".into(),
            slug: "widgets".into(),
            clone_url: "https://bitbucket.org/team/widgets.git".into(),
        }
    }

    #[test]
    fn dry_run_previews_success_without_touching_the_destination() {
        let executor = executor(DestinationState::Absent, true);
        let outcome = executor
            .execute(&source(), &DestinationPlan::new("ops", "widgets"))
            .unwrap();
        assert_eq!(outcome, Outcome::Succeeded);
        assert_eq!(*executor.destination.creates.borrow(), 0);
    }

    #[test]
    fn dry_run_reports_skip_for_unauthorized_non_empty_destination() {
        let executor = executor(DestinationState::NonEmptyExisting, true);
        let outcome = executor
            .execute(&source(), &DestinationPlan::new("ops", "widgets"))
            .unwrap();
        assert_eq!(outcome, Outcome::SkippedNonEmptyDestination);
    }

    #[test]
    fn dry_run_previews_overwrite_when_authorized() {
        let executor = executor(DestinationState::NonEmptyExisting, true);
        let mut plan = DestinationPlan::new("ops", "widgets");
        plan.overwrite_non_empty = true;
        let outcome = executor.execute(&source(), &plan).unwrap();
        assert_eq!(outcome, Outcome::Succeeded);
    }

    #[test]
    fn gate_fails_when_absent_and_creation_disabled() {
        let mut plan = DestinationPlan::new("ops", "widgets");
        plan.create_if_missing = false;
        let outcome =
            MirrorExecutor::<FakeDestination>::gate(DestinationState::Absent, &plan);
        assert!(matches!(outcome, Some(Outcome::Failed(_))));
    }

    #[test]
    fn gate_passes_empty_existing_through() {
        let plan = DestinationPlan::new("ops", "widgets");
        assert_eq!(
            MirrorExecutor::<FakeDestination>::gate(DestinationState::EmptyExisting, &plan),
            None
        );
    }
}
