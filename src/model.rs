use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::PortError;

/// Immutable identity of a repository at the source service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRepoRef {
    pub workspace: String,
    pub slug: String,
    pub clone_url: String,
}

impl SourceRepoRef {
    /// Canonical state-store key.
    pub fn key(&self) -> String {
        format!("{}/{}", self.workspace, self.slug)
    }
}

impl fmt::Display for SourceRepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.workspace, self.slug)
    }
}

/// Where a repository is headed. Frozen once the batch is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationPlan {
    pub owner: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
    /// Up-front authorization to push into a non-empty destination.
    /// Confirmed once for the whole batch, never re-prompted per repository.
    #[serde(default, skip_serializing_if = "is_false")]
    pub overwrite_non_empty: bool,
}

fn default_true() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl DestinationPlan {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            create_if_missing: true,
            overwrite_non_empty: false,
        }
    }

    /// HTTPS clone URL, used for the authenticated mirror push.
    pub fn https_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.name)
    }

    /// SSH URL, used when repointing local origins.
    pub fn ssh_url(&self) -> String {
        format!("git@github.com:{}/{}.git", self.owner, self.name)
    }

    /// Browser URL for reports.
    pub fn web_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for DestinationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "snake_case")]
pub enum MigrationStatus {
    #[default]
    Pending,
    InProgress,
    Succeeded,
    Failed,
    Skipped,
}

impl MigrationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }

    /// Statuses the orchestrator re-attempts on a resumed run. An `in_progress`
    /// leftover means the previous process died mid-migration; its partial work
    /// is untrusted and redone from scratch.
    pub fn needs_attempt(self) -> bool {
        !matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Durable progress entry for one source repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub source: SourceRepoRef,
    pub destination: DestinationPlan,
    pub status: MigrationStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Fields written by other (newer) versions of the tool. Preserved verbatim
    /// on rewrite so the state file stays forward-compatible.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MigrationRecord {
    pub fn new(source: SourceRepoRef, destination: DestinationPlan) -> Self {
        Self {
            source,
            destination,
            status: MigrationStatus::Pending,
            attempts: 0,
            last_error: None,
            completed_at: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn key(&self) -> String {
        self.source.key()
    }
}

/// Terminal result of one repository's mirror attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    SkippedNonEmptyDestination,
    Failed(String),
}

impl Outcome {
    pub fn status(&self) -> MigrationStatus {
        match self {
            Self::Succeeded => MigrationStatus::Succeeded,
            Self::SkippedNonEmptyDestination => MigrationStatus::Skipped,
            Self::Failed(_) => MigrationStatus::Failed,
        }
    }
}

/// Aggregate view of a batch run, in the operator's confirmed order.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchResult {
    pub records: Vec<MigrationRecord>,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Set when an auth failure stopped the batch before all plans ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted: Option<String>,
}

impl BatchResult {
    pub fn push(&mut self, record: MigrationRecord) {
        match record.status {
            MigrationStatus::Succeeded => self.succeeded += 1,
            MigrationStatus::Failed => self.failed += 1,
            MigrationStatus::Skipped => self.skipped += 1,
            MigrationStatus::Pending | MigrationStatus::InProgress => {}
        }
        self.records.push(record);
    }
}

/// Batch-level configuration recognized by the orchestrator.
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    pub lfs_enabled: bool,
    pub lfs_threshold: ByteSize,
    pub dry_run: bool,
    /// Source keys (`workspace/slug`) whose `succeeded` records are re-migrated.
    pub force: BTreeSet<String>,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            lfs_enabled: false,
            lfs_threshold: ByteSize::DEFAULT_LFS_THRESHOLD,
            dry_run: false,
            force: BTreeSet::new(),
        }
    }
}

/// A size threshold such as `5MB`. Parsed from human input, handed to
/// `git lfs migrate` as a plain byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub const DEFAULT_LFS_THRESHOLD: ByteSize = ByteSize(5 * 1024 * 1024);

    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl FromStr for ByteSize {
    type Err = PortError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let invalid = || PortError::InvalidByteSize(raw.to_string());

        let upper = trimmed.to_ascii_uppercase();
        let (digits, multiplier) = if let Some(rest) = upper.strip_suffix("GB") {
            (rest, 1024 * 1024 * 1024)
        } else if let Some(rest) = upper.strip_suffix("MB") {
            (rest, 1024 * 1024)
        } else if let Some(rest) = upper.strip_suffix("KB") {
            (rest, 1024)
        } else if let Some(rest) = upper.strip_suffix('B') {
            (rest, 1)
        } else {
            (upper.as_str(), 1)
        };

        let digits = digits.trim();
        if digits.is_empty() {
            return Err(invalid());
        }
        let value: u64 = digits.parse().map_err(|_| invalid())?;
        value.checked_mul(multiplier).map(ByteSize).ok_or_else(invalid)
    }
}

impl fmt::Display for ByteSize {
    /// Render the largest unit that divides exactly, otherwise raw bytes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const GB: u64 = 1024 * 1024 * 1024;
        const MB: u64 = 1024 * 1024;
        const KB: u64 = 1024;
        let bytes = self.0;
        if bytes >= GB && bytes % GB == 0 {
            write!(f, "{}GB", bytes / GB)
        } else if bytes >= MB && bytes % MB == 0 {
            write!(f, "{}MB", bytes / MB)
        } else if bytes >= KB && bytes % KB == 0 {
            write!(f, "{}KB", bytes / KB)
        } else {
            write!(f, "{bytes}B")
        }
    }
}
