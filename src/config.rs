use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::error::{PortError, Result};
use crate::model::ByteSize;

pub const BITBUCKET_EMAIL: &str = "BITBUCKET_EMAIL";
pub const BITBUCKET_USERNAME: &str = "BITBUCKET_USERNAME";
pub const BITBUCKET_TOKEN: &str = "BITBUCKET_TOKEN";
pub const GITHUB_USERNAME: &str = "GITHUB_USERNAME";
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const GITHUB_OWNER: &str = "GITHUB_OWNER";
pub const LFS_MIGRATE: &str = "LFS_MIGRATE";
pub const LFS_THRESHOLD: &str = "LFS_THRESHOLD";
pub const DRY_RUN: &str = "DRY_RUN";

/// Configuration source layering the process environment over an optional
/// `.env` file. The file never overrides a variable already set in the
/// environment.
pub struct Config {
    dotenv: HashMap<String, String>,
}

impl Config {
    pub fn load(dir: &Path) -> Self {
        Self {
            dotenv: read_dotenv(&dir.join(".env")),
        }
    }

    pub fn from_env_only() -> Self {
        Self {
            dotenv: HashMap::new(),
        }
    }

    pub fn value(&self, name: &str) -> Option<String> {
        if let Ok(value) = env::var(name) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        self.dotenv.get(name).cloned()
    }

    pub fn require(&self, name: &'static str) -> Result<String> {
        self.value(name).ok_or(PortError::MissingConfig(name))
    }

    pub fn bool_flag(&self, name: &str) -> Option<bool> {
        self.value(name)
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"))
    }

    pub fn lfs_threshold(&self) -> Result<ByteSize> {
        match self.value(LFS_THRESHOLD) {
            Some(raw) => raw.parse(),
            None => Ok(ByteSize::DEFAULT_LFS_THRESHOLD),
        }
    }
}

fn read_dotenv(path: &Path) -> HashMap<String, String> {
    let mut values = HashMap::new();
    let Ok(contents) = fs::read_to_string(path) else {
        return values;
    };
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value
            .trim()
            .trim_matches('"')
            .trim_matches('\'')
            .to_string();
        if !key.is_empty() && !values.contains_key(key) {
            values.insert(key.to_string(), value);
        }
    }
    values
}

/// Bitbucket-side credentials: the Atlassian account email owns the API
/// token, the Bitbucket username authenticates git-over-https.
#[derive(Debug, Clone)]
pub struct BitbucketCredentials {
    pub email: String,
    pub username: String,
    pub token: String,
}

impl BitbucketCredentials {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            email: config.require(BITBUCKET_EMAIL)?,
            username: config.require(BITBUCKET_USERNAME)?,
            token: config.require(BITBUCKET_TOKEN)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GithubCredentials {
    pub username: String,
    pub token: String,
}

impl GithubCredentials {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            username: config.require(GITHUB_USERNAME)?,
            token: config.require(GITHUB_TOKEN)?,
        })
    }

    /// Owner used when a plan or the state store does not name one.
    pub fn default_owner(&self, config: &Config) -> String {
        config
            .value(GITHUB_OWNER)
            .unwrap_or_else(|| self.username.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn dotenv_parses_simple_assignments() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(".env"),
            "# comment\nGITPORT_TEST_A=alpha\nGITPORT_TEST_B = \"beta\" \nbroken line\n",
        )
        .unwrap();

        let config = Config::load(dir.path());
        assert_eq!(config.value("GITPORT_TEST_A").as_deref(), Some("alpha"));
        assert_eq!(config.value("GITPORT_TEST_B").as_deref(), Some("beta"));
        assert_eq!(config.value("GITPORT_TEST_MISSING"), None);
    }

    #[test]
    fn environment_wins_over_dotenv() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".env"), "PATH=from-dotenv\n").unwrap();

        let config = Config::load(dir.path());
        // PATH is always set in the test environment; the .env value must lose.
        assert_ne!(config.value("PATH").as_deref(), Some("from-dotenv"));
    }

    #[test]
    fn bool_flag_accepts_common_truthy_spellings() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(".env"),
            "GITPORT_TEST_YES=Yes\nGITPORT_TEST_ON=on\nGITPORT_TEST_NO=0\n",
        )
        .unwrap();

        let config = Config::load(dir.path());
        assert_eq!(config.bool_flag("GITPORT_TEST_YES"), Some(true));
        assert_eq!(config.bool_flag("GITPORT_TEST_ON"), Some(true));
        assert_eq!(config.bool_flag("GITPORT_TEST_NO"), Some(false));
        assert_eq!(config.bool_flag("GITPORT_TEST_UNSET"), None);
    }

    #[test]
    fn missing_required_value_names_the_variable() {
        let config = Config::from_env_only();
        let err = config.require("GITPORT_TEST_DEFINITELY_UNSET").unwrap_err();
        assert!(err.to_string().contains("GITPORT_TEST_DEFINITELY_UNSET"));
    }

    #[test]
    fn lfs_threshold_defaults_when_unset() {
        let config = Config::from_env_only();
        assert_eq!(
            config.lfs_threshold().unwrap(),
            ByteSize::DEFAULT_LFS_THRESHOLD
        );
    }
}
