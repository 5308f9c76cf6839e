use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("credentials rejected by {0}: {1}")]
    AuthRejected(String, String),

    #[error("git command failed: {command}\n{stderr}")]
    GitCommand { command: String, stderr: String },

    #[error("git-lfs is required for LFS migration but was not found on PATH")]
    LfsMissing,

    #[error("LFS history rewrite failed for {0}: {1}")]
    HistoryRewrite(String, String),

    #[error("push rejected some refs for {0}: {1}")]
    PartialPush(String, String),

    #[error("{service} API call failed (status {status}): {message}")]
    Api {
        service: String,
        status: u16,
        message: String,
    },

    #[error("network error calling {0}: {1}")]
    Network(String, String),

    #[error("invalid byte size '{0}' (expected e.g. 512KB, 5MB, 1GB, or bytes)")]
    InvalidByteSize(String),

    #[error("missing configuration: {0} (set the environment variable or .env entry)")]
    MissingConfig(&'static str),

    #[error("invalid repository selector '{0}' (expected workspace/slug)")]
    InvalidSelector(String),

    #[error("no repositories matched the selection")]
    EmptySelection,

    #[error("batch halted early: {0}")]
    BatchHalted(String),

    #[error("locked by another process: {0}")]
    Locked(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

impl PortError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthRejected(_, _) => "auth_rejected",
            Self::GitCommand { .. } => "git_command",
            Self::LfsMissing => "lfs_missing",
            Self::HistoryRewrite(_, _) => "history_rewrite",
            Self::PartialPush(_, _) => "partial_push",
            Self::Api { .. } => "api_error",
            Self::Network(_, _) => "network_error",
            Self::InvalidByteSize(_) => "invalid_byte_size",
            Self::MissingConfig(_) => "missing_config",
            Self::InvalidSelector(_) => "invalid_selector",
            Self::EmptySelection => "empty_selection",
            Self::BatchHalted(_) => "batch_halted",
            Self::Locked(_) => "locked",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Git(_) => "git_error",
        }
    }

    /// True for failures that will recur for every repository in the batch.
    pub fn halts_batch(&self) -> bool {
        matches!(self, Self::AuthRejected(_, _))
    }
}

pub type Result<T> = std::result::Result<T, PortError>;
