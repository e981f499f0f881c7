use async_trait::async_trait;
use bikesnap_core::{ContentState, FileRevision, MergeMethod, PullRequestRef, Result};

/// Operations the publisher needs from the hosting platform.
///
/// Every call is scoped to the one repository the client was built for.
/// Absence of a file or folder is reported through the return value, never as
/// an error.
#[async_trait]
pub trait HostingClient: Send + Sync {
    async fn default_branch(&self) -> Result<String>;

    /// Tip commit SHA of `branch`
    async fn branch_head(&self, branch: &str) -> Result<String>;

    /// Fails with `RemoteConflict` when the branch already exists
    async fn create_branch(&self, branch: &str, sha: &str) -> Result<()>;

    async fn folder_exists(&self, path: &str, branch: &str) -> Result<bool>;

    async fn content_state(&self, path: &str, branch: &str) -> Result<ContentState>;

    /// Creates the file when `revision` is `None`, otherwise updates the
    /// revision given. Returns the SHA of the resulting commit.
    async fn put_file(
        &self,
        path: &str,
        branch: &str,
        message: &str,
        content: &[u8],
        revision: Option<&FileRevision>,
    ) -> Result<String>;

    async fn open_pull_request(
        &self,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequestRef>;

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()>;

    /// Number of check runs registered against a commit
    async fn check_run_count(&self, sha: &str) -> Result<u64>;

    async fn enable_auto_merge(&self, pull_request: &PullRequestRef, method: MergeMethod)
        -> Result<()>;
}
