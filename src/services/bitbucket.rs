use std::time::Duration;

use base64::Engine as _;
use serde::Deserialize;

use crate::config::BitbucketCredentials;
use crate::error::{PortError, Result};
use crate::model::SourceRepoRef;
use crate::services::SourceHost;

pub const API_BASE: &str = "https://api.bitbucket.org/2.0";
const PAGE_LEN: u32 = 100;

/// Bitbucket Cloud REST client. Read-only: workspace and repository listing.
pub struct BitbucketHost {
    agent: ureq::Agent,
    credentials: BitbucketCredentials,
    api_base: String,
}

impl BitbucketHost {
    pub fn new(credentials: BitbucketCredentials) -> Self {
        Self::with_api_base(credentials, API_BASE)
    }

    pub fn with_api_base(credentials: BitbucketCredentials, api_base: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Self {
            agent,
            credentials,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn auth_header(&self) -> String {
        let token = base64::engine::general_purpose::STANDARD.encode(format!(
            "{}:{}",
            self.credentials.email, self.credentials.token
        ));
        format!("Basic {token}")
    }

    fn get_page<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let response = self
            .agent
            .get(url)
            .set("Accept", "application/json")
            .set("Authorization", &self.auth_header())
            .call()
            .map_err(|err| classify(url, err))?;
        response
            .into_json()
            .map_err(|err| PortError::Network(url.to_string(), err.to_string()))
    }
}

fn classify(url: &str, err: ureq::Error) -> PortError {
    match err {
        ureq::Error::Status(401 | 403, response) => PortError::AuthRejected(
            "bitbucket".into(),
            response
                .into_string()
                .unwrap_or_else(|_| "credentials rejected".into()),
        ),
        ureq::Error::Status(status, response) => PortError::Api {
            service: "bitbucket".into(),
            status,
            message: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => {
            PortError::Network(url.to_string(), transport.to_string())
        }
    }
}

#[derive(Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    values: Vec<T>,
    next: Option<String>,
}

#[derive(Deserialize)]
struct WorkspaceItem {
    slug: String,
}

#[derive(Deserialize)]
struct RepoItem {
    slug: String,
    #[serde(default)]
    links: RepoLinks,
}

#[derive(Default, Deserialize)]
struct RepoLinks {
    #[serde(default)]
    clone: Vec<CloneLink>,
}

#[derive(Deserialize)]
struct CloneLink {
    name: String,
    href: String,
}

impl RepoItem {
    fn https_clone_url(&self) -> Option<&str> {
        self.links
            .clone
            .iter()
            .find(|link| link.name == "https")
            .map(|link| link.href.as_str())
    }
}

impl SourceHost for BitbucketHost {
    fn list_workspaces(&self) -> Result<Vec<String>> {
        let mut workspaces = Vec::new();
        let mut url = Some(format!(
            "{}/workspaces?role=member&pagelen={PAGE_LEN}",
            self.api_base
        ));
        while let Some(current) = url {
            let page: Page<WorkspaceItem> = self.get_page(&current)?;
            workspaces.extend(page.values.into_iter().map(|item| item.slug));
            url = page.next;
        }
        Ok(workspaces)
    }

    fn list_repositories(&self, workspace: &str) -> Result<Vec<SourceRepoRef>> {
        let mut repos = Vec::new();
        let mut url = Some(format!(
            "{}/repositories/{workspace}?pagelen={PAGE_LEN}",
            self.api_base
        ));
        while let Some(current) = url {
            let page: Page<RepoItem> = self.get_page(&current)?;
            for item in &page.values {
                // Repositories without an https clone link cannot be mirrored.
                if let Some(clone_url) = item.https_clone_url() {
                    repos.push(SourceRepoRef {
                        workspace: workspace.to_string(),
                        slug: item.slug.clone(),
                        clone_url: clone_url.to_string(),
                    });
                }
            }
            url = page.next;
        }
        repos.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(repos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_item_picks_the_https_clone_link() {
        let item: RepoItem = serde_json::from_str(
            r#"{
                "slug": "widgets",
                "links": {"clone": [
                    {"name": "ssh", "href": "git@bitbucket.org:team/widgets.git"},
                    {"name": "https", "href": "https://bitbucket.org/team/widgets.git"}
                ]}
            }"#,
        )
        .unwrap();
        assert_eq!(
            item.https_clone_url(),
            Some("https://bitbucket.org/team/widgets.git")
        );
    }

    #[test]
    fn repo_item_tolerates_missing_links() {
        let item: RepoItem = serde_json::from_str(r#"{"slug": "widgets"}"#).unwrap();
        assert_eq!(item.https_clone_url(), None);
    }

    #[test]
    fn page_parses_next_cursor() {
        let page: Page<WorkspaceItem> = serde_json::from_str(
            r#"{"values": [{"slug": "team"}], "next": "https://api.bitbucket.org/2.0/workspaces?page=2"}"#,
        )
        .unwrap();
        assert_eq!(page.values.len(), 1);
        assert!(page.next.is_some());
    }
}
