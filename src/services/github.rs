use std::time::Duration;

use serde::Deserialize;

use crate::config::GithubCredentials;
use crate::error::{PortError, Result};
use crate::services::{DestinationHost, DestinationState};

pub const API_BASE: &str = "https://api.github.com";

/// GitHub REST client for the destination side: existence/emptiness probes
/// and repository creation.
pub struct GithubHost {
    agent: ureq::Agent,
    credentials: GithubCredentials,
    api_base: String,
}

impl GithubHost {
    pub fn new(credentials: GithubCredentials) -> Self {
        Self::with_api_base(credentials, API_BASE)
    }

    pub fn with_api_base(credentials: GithubCredentials, api_base: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Self {
            agent,
            credentials,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Accept", "application/vnd.github+json")
            .set("User-Agent", "gitport")
            .set(
                "Authorization",
                &format!("Bearer {}", self.credentials.token),
            )
    }
}

fn classify(url: &str, err: ureq::Error) -> PortError {
    match err {
        ureq::Error::Status(401 | 403, response) => PortError::AuthRejected(
            "github".into(),
            response
                .into_string()
                .unwrap_or_else(|_| "credentials rejected".into()),
        ),
        ureq::Error::Status(status, response) => PortError::Api {
            service: "github".into(),
            status,
            message: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => {
            PortError::Network(url.to_string(), transport.to_string())
        }
    }
}

#[derive(Deserialize)]
struct RepoInfo {
    #[serde(default)]
    size: u64,
    /// Not documented for every response shape; present on freshly created
    /// repositories.
    #[serde(default)]
    empty: bool,
}

impl RepoInfo {
    fn state(&self) -> DestinationState {
        if self.empty || self.size == 0 {
            DestinationState::EmptyExisting
        } else {
            DestinationState::NonEmptyExisting
        }
    }
}

#[derive(Deserialize)]
struct CreatedRepo {
    clone_url: String,
}

impl DestinationHost for GithubHost {
    fn exists(&self, owner: &str, name: &str) -> Result<DestinationState> {
        let url = format!("{}/repos/{owner}/{name}", self.api_base);
        match self.request("GET", &url).call() {
            Ok(response) => {
                let info: RepoInfo = response
                    .into_json()
                    .map_err(|err| PortError::Network(url.clone(), err.to_string()))?;
                Ok(info.state())
            }
            Err(ureq::Error::Status(404, _)) => Ok(DestinationState::Absent),
            Err(err) => Err(classify(&url, err)),
        }
    }

    fn create(&self, owner: &str, name: &str, private: bool) -> Result<String> {
        // Personal repositories go through /user/repos; organizations have
        // their own endpoint.
        let url = if owner == self.credentials.username {
            format!("{}/user/repos", self.api_base)
        } else {
            format!("{}/orgs/{owner}/repos", self.api_base)
        };
        let response = self
            .request("POST", &url)
            .send_json(serde_json::json!({ "name": name, "private": private }))
            .map_err(|err| classify(&url, err))?;
        let created: CreatedRepo = response
            .into_json()
            .map_err(|err| PortError::Network(url, err.to_string()))?;
        Ok(created.clone_url)
    }
}
