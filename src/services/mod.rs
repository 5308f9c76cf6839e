pub mod bitbucket;
pub mod github;

use crate::error::Result;
use crate::model::SourceRepoRef;

/// What a destination probe found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationState {
    Absent,
    EmptyExisting,
    NonEmptyExisting,
}

/// Read-only listing of repositories at the source service.
pub trait SourceHost {
    fn list_workspaces(&self) -> Result<Vec<String>>;
    fn list_repositories(&self, workspace: &str) -> Result<Vec<SourceRepoRef>>;
}

/// Destination-side repository management.
pub trait DestinationHost {
    fn exists(&self, owner: &str, name: &str) -> Result<DestinationState>;
    /// Create the repository and return its https clone URL.
    fn create(&self, owner: &str, name: &str, private: bool) -> Result<String>;
}
