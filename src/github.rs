//! Read access to the source repository on GitHub.
//!
//! Two operations are consumed by the pipeline: listing the recursive file
//! tree of the default branch and fetching the raw text of a single file.
//! Both are behind the [`RepoClient`] trait so the orchestration can be
//! exercised against mocks.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Branch the tree listing and raw fetches are issued against.
pub const DEFAULT_BRANCH: &str = "main";

const USER_AGENT: &str = concat!("move-dataset/", env!("CARGO_PKG_VERSION"));

/// Error type for repository access.
#[derive(Debug)]
pub enum RepoError {
    /// The remote answered with a non-success status.
    Status { url: String, status: u16 },
    /// Transport-level failure (connection, TLS, body decode).
    Http(reqwest::Error),
}

impl std::fmt::Display for RepoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepoError::Status { url, status } => {
                write!(f, "request to {url} returned status {status}")
            }
            RepoError::Http(e) => write!(f, "http request failed: {e}"),
        }
    }
}

impl std::error::Error for RepoError {}

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        RepoError::Http(e)
    }
}

/// Read-only view of a hosted repository: list files on the default branch
/// and fetch raw file contents. Implemented by [`GithubClient`] and by mocks
/// in tests.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepoClient: Send + Sync {
    /// List every file path on the default branch whose name ends with
    /// `suffix`, in tree order.
    async fn list_files(&self, suffix: &str) -> Result<Vec<String>, RepoError>;

    /// Fetch the raw text content of one file on the default branch.
    async fn fetch_file(&self, path: &str) -> Result<String, RepoError>;
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
}

/// GitHub-backed [`RepoClient`] over the REST tree endpoint and the raw
/// content host.
pub struct GithubClient {
    http: reqwest::Client,
    repository: String,
}

impl GithubClient {
    /// The GitHub API rejects requests without a User-Agent, so the client
    /// is built with a static one.
    pub fn new(repository: impl Into<String>) -> Result<Self, RepoError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(GithubClient {
            http,
            repository: repository.into(),
        })
    }
}

#[async_trait]
impl RepoClient for GithubClient {
    async fn list_files(&self, suffix: &str) -> Result<Vec<String>, RepoError> {
        let url = format!(
            "https://api.github.com/repos/{}/git/trees/{}?recursive=1",
            self.repository, DEFAULT_BRANCH
        );
        debug!(url = %url, "Fetching repository tree");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RepoError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let listing: TreeResponse = response.json().await?;
        let files: Vec<String> = listing
            .tree
            .into_iter()
            .map(|entry| entry.path)
            .filter(|path| path.ends_with(suffix))
            .collect();

        info!(
            repository = %self.repository,
            suffix = suffix,
            count = files.len(),
            "Listed repository files"
        );
        Ok(files)
    }

    async fn fetch_file(&self, path: &str) -> Result<String, RepoError> {
        let url = format!(
            "https://raw.githubusercontent.com/{}/{}/{}",
            self.repository, DEFAULT_BRANCH, path
        );
        debug!(url = %url, "Fetching file content");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RepoError::Status {
                url,
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}
