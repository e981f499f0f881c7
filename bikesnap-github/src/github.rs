use crate::client::HostingClient;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bikesnap_core::{
    ContentState, FileRevision, MergeMethod, PullRequestRef, Result, SnapshotError,
};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";

const ENABLE_AUTO_MERGE: &str = "mutation($pullRequestId: ID!, $mergeMethod: PullRequestMergeMethod!) {
  enablePullRequestAutoMerge(input: {pullRequestId: $pullRequestId, mergeMethod: $mergeMethod}) {
    pullRequest { number }
  }
}";

#[derive(Deserialize)]
struct RepositoryInfo {
    default_branch: String,
}

#[derive(Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Deserialize)]
struct ContentWriteResponse {
    commit: GitObject,
}

#[derive(Deserialize)]
struct PullRequestResponse {
    number: u64,
    html_url: String,
    node_id: String,
}

#[derive(Deserialize)]
struct CheckRunList {
    total_count: u64,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

/// GitHub REST (and one GraphQL mutation) client for a single repository
#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    api_url: String,
    repository: String,
    token: String,
}

impl GitHubClient {
    /// `repository` is an `owner/name` slug.
    pub fn new(repository: &str, token: &str) -> Result<Self> {
        validate_repository(repository)?;

        if token.trim().is_empty() {
            return Err(SnapshotError::Configuration(
                "GitHub token is empty".to_string(),
            ));
        }

        Ok(Self {
            http: Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            repository: repository.to_string(),
            token: token.to_string(),
        })
    }

    pub fn with_api_url<S: Into<String>>(mut self, api_url: S) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// GraphQL endpoint next to the REST root. GitHub Enterprise serves REST
    /// under `/api/v3` and GraphQL under `/api/graphql`.
    fn graphql_url(&self) -> String {
        match self.api_url.strip_suffix("/v3") {
            Some(root) if root.ends_with("/api") => format!("{}/graphql", root),
            _ => format!("{}/graphql", self.api_url),
        }
    }

    fn repo_url(&self, tail: &str) -> String {
        format!("{}/repos/{}/{}", self.api_url, self.repository, tail)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, concat!("bikesnap/", env!("CARGO_PKG_VERSION")))
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send(&self, builder: RequestBuilder, action: &str) -> Result<Response> {
        builder
            .send()
            .await
            .map_err(|e| SnapshotError::Remote(format!("{}: {}", action, e)))
    }

    async fn json<T: DeserializeOwned>(response: Response, action: &str) -> Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| SnapshotError::Remote(format!("{}: invalid response: {}", action, e)))
    }

    /// Fetches a contents entry; `None` on 404
    async fn get_contents(&self, path: &str, branch: &str) -> Result<Option<Value>> {
        let action = format!("read {}", path);
        let url = self.repo_url(&format!("contents/{}", path));
        let response = self
            .send(
                self.request(Method::GET, &url).query(&[("ref", branch)]),
                &action,
            )
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(path, branch, "Remote content not found");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(failure(response, &action).await);
        }

        Self::json(response, &action).await.map(Some)
    }
}

#[async_trait]
impl HostingClient for GitHubClient {
    async fn default_branch(&self) -> Result<String> {
        let action = "resolve default branch";
        let url = format!("{}/repos/{}", self.api_url, self.repository);
        let response = self.send(self.request(Method::GET, &url), action).await?;

        if !response.status().is_success() {
            return Err(failure(response, action).await);
        }

        let repo: RepositoryInfo = Self::json(response, action).await?;
        Ok(repo.default_branch)
    }

    async fn branch_head(&self, branch: &str) -> Result<String> {
        let action = format!("read ref heads/{}", branch);
        let url = self.repo_url(&format!("git/ref/heads/{}", branch));
        let response = self.send(self.request(Method::GET, &url), &action).await?;

        if !response.status().is_success() {
            return Err(failure(response, &action).await);
        }

        let git_ref: GitRef = Self::json(response, &action).await?;
        Ok(git_ref.object.sha)
    }

    async fn create_branch(&self, branch: &str, sha: &str) -> Result<()> {
        let action = format!("create branch {}", branch);
        let url = self.repo_url("git/refs");
        let body = json!({
            "ref": format!("refs/heads/{}", branch),
            "sha": sha,
        });
        let response = self
            .send(self.request(Method::POST, &url).json(&body), &action)
            .await?;

        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let text = response.text().await.unwrap_or_default();
            return Err(SnapshotError::RemoteConflict(format!("{}: {}", action, text)));
        }
        if !response.status().is_success() {
            return Err(failure(response, &action).await);
        }

        info!(branch, sha, "Created branch");
        Ok(())
    }

    async fn folder_exists(&self, path: &str, branch: &str) -> Result<bool> {
        match self.get_contents(path, branch).await? {
            None => Ok(false),
            Some(Value::Array(_)) => Ok(true),
            Some(_) => Err(SnapshotError::Remote(format!(
                "{} exists on {} but is not a directory",
                path, branch
            ))),
        }
    }

    async fn content_state(&self, path: &str, branch: &str) -> Result<ContentState> {
        let entry = match self.get_contents(path, branch).await? {
            None => return Ok(ContentState::NotFound),
            Some(entry) => entry,
        };

        match entry.get("sha").and_then(Value::as_str) {
            Some(sha) if entry.get("type").and_then(Value::as_str) == Some("file") => {
                Ok(ContentState::Found(FileRevision(sha.to_string())))
            }
            _ => Err(SnapshotError::Remote(format!(
                "{} exists on {} but is not a file",
                path, branch
            ))),
        }
    }

    async fn put_file(
        &self,
        path: &str,
        branch: &str,
        message: &str,
        content: &[u8],
        revision: Option<&FileRevision>,
    ) -> Result<String> {
        let verb = if revision.is_some() { "update" } else { "create" };
        let action = format!("{} {}", verb, path);
        let url = self.repo_url(&format!("contents/{}", path));

        let mut body = json!({
            "message": message,
            "content": STANDARD.encode(content),
            "branch": branch,
        });
        if let Some(revision) = revision {
            body["sha"] = Value::String(revision.as_str().to_string());
        }

        let response = self
            .send(self.request(Method::PUT, &url).json(&body), &action)
            .await?;

        match response.status() {
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                let text = response.text().await.unwrap_or_default();
                Err(SnapshotError::RemoteConflict(format!("{}: {}", action, text)))
            }
            status if status.is_success() => {
                let written: ContentWriteResponse = Self::json(response, &action).await?;
                Ok(written.commit.sha)
            }
            _ => Err(failure(response, &action).await),
        }
    }

    async fn open_pull_request(
        &self,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequestRef> {
        let action = format!("open pull request {} -> {}", head, base);
        let url = self.repo_url("pulls");
        let payload = json!({
            "title": title,
            "body": body,
            "head": head,
            "base": base,
        });
        let response = self
            .send(self.request(Method::POST, &url).json(&payload), &action)
            .await?;

        if !response.status().is_success() {
            return Err(failure(response, &action).await);
        }

        let pr: PullRequestResponse = Self::json(response, &action).await?;
        Ok(PullRequestRef {
            number: pr.number,
            html_url: pr.html_url,
            node_id: pr.node_id,
        })
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        let action = format!("label pull request #{}", number);
        let url = self.repo_url(&format!("issues/{}/labels", number));
        let response = self
            .send(
                self.request(Method::POST, &url)
                    .json(&json!({ "labels": labels })),
                &action,
            )
            .await?;

        if !response.status().is_success() {
            return Err(failure(response, &action).await);
        }
        Ok(())
    }

    async fn check_run_count(&self, sha: &str) -> Result<u64> {
        let action = format!("list check runs for {}", sha);
        let url = self.repo_url(&format!("commits/{}/check-runs", sha));
        let response = self.send(self.request(Method::GET, &url), &action).await?;

        if !response.status().is_success() {
            return Err(failure(response, &action).await);
        }

        let runs: CheckRunList = Self::json(response, &action).await?;
        Ok(runs.total_count)
    }

    async fn enable_auto_merge(
        &self,
        pull_request: &PullRequestRef,
        method: MergeMethod,
    ) -> Result<()> {
        let action = format!("enable auto-merge on #{}", pull_request.number);
        let url = self.graphql_url();
        let payload = json!({
            "query": ENABLE_AUTO_MERGE,
            "variables": {
                "pullRequestId": pull_request.node_id,
                "mergeMethod": method.graphql_name(),
            },
        });
        let response = self
            .send(self.request(Method::POST, &url).json(&payload), &action)
            .await?;

        if !response.status().is_success() {
            return Err(failure(response, &action).await);
        }

        let result: GraphQlResponse = Self::json(response, &action).await?;
        if !result.errors.is_empty() {
            let messages: Vec<String> = result.errors.into_iter().map(|e| e.message).collect();
            return Err(SnapshotError::Remote(format!(
                "{}: {}",
                action,
                messages.join("; ")
            )));
        }

        Ok(())
    }
}

async fn failure(response: Response, action: &str) -> SnapshotError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    SnapshotError::Remote(format!("{} returned {}: {}", action, status, text.trim()))
}

fn validate_repository(repository: &str) -> Result<()> {
    let mut parts = repository.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(()),
        _ => Err(SnapshotError::Configuration(format!(
            "repository must be in owner/name form, got '{}'",
            repository
        ))),
    }
}
