use bikesnap_core::{
    AutoMergeStatus, CiWaitStatus, ContentState, FileAction, PublishOutcome, PublishRequest,
    PublishStage, Result, PLACEHOLDER_FILE,
};
use bikesnap_github::HostingClient;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Floor for the check-run poll interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Bounded wait for CI to register check runs on the pushed commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CiWait {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl CiWait {
    pub fn disabled() -> Self {
        Self {
            timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
        }
    }
}

impl Default for CiWait {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(10),
        }
    }
}

/// Commits a snapshot to a fresh branch and opens an auto-merging pull request
pub struct Publisher<H> {
    client: H,
    ci_wait: CiWait,
}

impl<H: HostingClient> Publisher<H> {
    pub fn new(client: H) -> Self {
        Self {
            client,
            ci_wait: CiWait::default(),
        }
    }

    pub fn with_ci_wait(mut self, ci_wait: CiWait) -> Self {
        self.ci_wait = ci_wait;
        self
    }

    pub fn client(&self) -> &H {
        &self.client
    }

    /// Runs the publish state machine. Any failure before the pull request is
    /// labeled aborts the remaining steps; auto-merge failure does not.
    pub async fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome> {
        let mut stage = PublishStage::Started;
        let result = self.run(request, &mut stage).await;

        if let Err(ref e) = result {
            error!(
                branch = %request.branch_name,
                last_stage = %stage,
                error = %e,
                "Publish aborted"
            );
        }

        result
    }

    async fn run(&self, request: &PublishRequest, stage: &mut PublishStage) -> Result<PublishOutcome> {
        let content = tokio::fs::read(&request.local_path).await?;

        let base_branch = match &request.base_branch {
            Some(branch) => branch.clone(),
            None => self.client.default_branch().await?,
        };

        let base_sha = self.client.branch_head(&base_branch).await?;
        let branch = self.ensure_branch(&request.branch_name, &base_sha).await?;
        *stage = PublishStage::BranchEnsured;

        self.ensure_folder(&request.remote_folder, &branch).await?;
        *stage = PublishStage::FolderEnsured;

        let remote_path = request.remote_path();
        let existing = self.client.content_state(&remote_path, &branch).await?;
        let (file_action, revision) = match existing {
            ContentState::Found(revision) => (FileAction::Updated, Some(revision)),
            ContentState::NotFound => (FileAction::Created, None),
        };
        let commit_sha = self
            .client
            .put_file(
                &remote_path,
                &branch,
                &request.commit_message(file_action),
                &content,
                revision.as_ref(),
            )
            .await?;
        info!(
            path = %remote_path,
            branch = %branch,
            action = ?file_action,
            "Committed snapshot"
        );
        *stage = PublishStage::FileCommitted;

        let pull_request = self
            .client
            .open_pull_request(&request.pr_title, &request.pr_body, &branch, &base_branch)
            .await?;
        info!(number = pull_request.number, url = %pull_request.html_url, "Created pull request");
        *stage = PublishStage::PrOpened;

        if !request.labels.is_empty() {
            self.client
                .add_labels(pull_request.number, &request.labels)
                .await?;
            info!(number = pull_request.number, labels = ?request.labels, "Labeled pull request");
        }
        *stage = PublishStage::Labeled;

        let ci_wait = self.wait_for_checks(&commit_sha).await;

        let auto_merge = match self
            .client
            .enable_auto_merge(&pull_request, request.merge_method)
            .await
        {
            Ok(()) => {
                info!(number = pull_request.number, "Auto-merge enabled");
                AutoMergeStatus::Enabled
            }
            Err(e) => {
                warn!(
                    number = pull_request.number,
                    error = %e,
                    "Failed to enable auto-merge, pull request left open for manual merge"
                );
                AutoMergeStatus::Failed(e.to_string())
            }
        };
        *stage = PublishStage::AutoMergeRequested;

        Ok(PublishOutcome {
            branch_name: branch,
            base_branch,
            remote_path,
            file_action,
            commit_sha,
            pull_request,
            labels: request.labels.clone(),
            ci_wait,
            auto_merge,
            stage: *stage,
        })
    }

    /// Creates `name` at `sha`. If a run in the same second already took the
    /// name, retries once with a random suffix.
    async fn ensure_branch(&self, name: &str, sha: &str) -> Result<String> {
        match self.client.create_branch(name, sha).await {
            Ok(()) => Ok(name.to_string()),
            Err(e) if e.is_conflict() => {
                let suffix = Uuid::new_v4().simple().to_string();
                let fallback = format!("{}-{}", name, &suffix[..8]);
                warn!(branch = %name, fallback = %fallback, "Branch already exists, using fallback name");
                self.client.create_branch(&fallback, sha).await?;
                Ok(fallback)
            }
            Err(e) => Err(e),
        }
    }

    async fn ensure_folder(&self, folder: &str, branch: &str) -> Result<()> {
        if folder.is_empty() || self.client.folder_exists(folder, branch).await? {
            return Ok(());
        }

        let placeholder = format!("{}/{}", folder, PLACEHOLDER_FILE);
        self.client
            .put_file(
                &placeholder,
                branch,
                &format!("Create folder {}", folder),
                b"",
                None,
            )
            .await?;
        info!(folder, branch, "Created remote folder");
        Ok(())
    }

    async fn wait_for_checks(&self, sha: &str) -> CiWaitStatus {
        if self.ci_wait.timeout.is_zero() {
            return CiWaitStatus::Skipped;
        }

        info!(timeout = ?self.ci_wait.timeout, "Waiting for CI checks to register");
        let interval = self.ci_wait.poll_interval.max(MIN_POLL_INTERVAL);
        let deadline = Instant::now() + self.ci_wait.timeout;

        loop {
            match self.client.check_run_count(sha).await {
                Ok(count) if count > 0 => {
                    info!(check_runs = count, "CI checks registered");
                    return CiWaitStatus::Registered { check_runs: count };
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Failed to list check runs"),
            }

            let now = Instant::now();
            if now >= deadline {
                warn!("No CI checks registered before timeout");
                return CiWaitStatus::TimedOut;
            }
            sleep(interval.min(deadline - now)).await;
        }
    }
}
