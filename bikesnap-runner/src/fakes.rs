//! In-memory collaborators for tests

use crate::fetcher::Fetcher;
use async_trait::async_trait;
use bikesnap_core::{
    ContentState, FileRevision, MergeMethod, PullRequestRef, Result, SnapshotError,
};
use bikesnap_github::HostingClient;
use std::collections::HashSet;
use std::sync::Mutex;

pub struct FakeFetcher {
    pub body: Option<Vec<u8>>,
}

impl FakeFetcher {
    pub fn ok(body: &[u8]) -> Self {
        Self {
            body: Some(body.to_vec()),
        }
    }

    pub fn failing() -> Self {
        Self { body: None }
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.body
            .clone()
            .ok_or_else(|| SnapshotError::Fetch(format!("{} responded with 500", url)))
    }
}

/// Recorded remote call, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DefaultBranch,
    BranchHead(String),
    CreateBranch(String),
    FolderExists(String),
    ContentState(String),
    CreateFile { path: String, branch: String, content: Vec<u8> },
    UpdateFile { path: String, branch: String, revision: String },
    OpenPullRequest { head: String, base: String },
    AddLabels(u64, Vec<String>),
    CheckRuns(String),
    EnableAutoMerge(u64, MergeMethod),
}

pub struct FakeHosting {
    pub calls: Mutex<Vec<Call>>,
    /// Commit messages passed to `put_file`, in call order
    pub messages: Mutex<Vec<String>>,
    pub existing_branches: Mutex<HashSet<String>>,
    pub existing_folders: HashSet<String>,
    pub existing_file: Option<(String, FileRevision)>,
    pub check_runs: u64,
    pub fail_labels: bool,
    pub fail_auto_merge: bool,
}

impl Default for FakeHosting {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            existing_branches: Mutex::new(HashSet::from(["main".to_string()])),
            existing_folders: HashSet::new(),
            existing_file: None,
            check_runs: 1,
            fail_labels: false,
            fail_auto_merge: false,
        }
    }
}

impl FakeHosting {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl HostingClient for FakeHosting {
    async fn default_branch(&self) -> Result<String> {
        self.record(Call::DefaultBranch);
        Ok("main".to_string())
    }

    async fn branch_head(&self, branch: &str) -> Result<String> {
        self.record(Call::BranchHead(branch.to_string()));
        Ok("base-sha".to_string())
    }

    async fn create_branch(&self, branch: &str, _sha: &str) -> Result<()> {
        self.record(Call::CreateBranch(branch.to_string()));
        let mut branches = self.existing_branches.lock().unwrap();
        if !branches.insert(branch.to_string()) {
            return Err(SnapshotError::RemoteConflict(format!(
                "Reference {} already exists",
                branch
            )));
        }
        Ok(())
    }

    async fn folder_exists(&self, path: &str, _branch: &str) -> Result<bool> {
        self.record(Call::FolderExists(path.to_string()));
        Ok(self.existing_folders.contains(path))
    }

    async fn content_state(&self, path: &str, _branch: &str) -> Result<ContentState> {
        self.record(Call::ContentState(path.to_string()));
        Ok(match &self.existing_file {
            Some((existing, revision)) if existing == path => {
                ContentState::Found(revision.clone())
            }
            _ => ContentState::NotFound,
        })
    }

    async fn put_file(
        &self,
        path: &str,
        branch: &str,
        message: &str,
        content: &[u8],
        revision: Option<&FileRevision>,
    ) -> Result<String> {
        self.messages.lock().unwrap().push(message.to_string());
        let call = match revision {
            Some(revision) => Call::UpdateFile {
                path: path.to_string(),
                branch: branch.to_string(),
                revision: revision.as_str().to_string(),
            },
            None => Call::CreateFile {
                path: path.to_string(),
                branch: branch.to_string(),
                content: content.to_vec(),
            },
        };
        self.record(call);
        Ok("commit-sha".to_string())
    }

    async fn open_pull_request(
        &self,
        _title: &str,
        _body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequestRef> {
        self.record(Call::OpenPullRequest {
            head: head.to_string(),
            base: base.to_string(),
        });
        Ok(PullRequestRef {
            number: 42,
            html_url: "https://github.com/test/repo/pull/42".to_string(),
            node_id: "PR_42".to_string(),
        })
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        self.record(Call::AddLabels(number, labels.to_vec()));
        if self.fail_labels {
            return Err(SnapshotError::Remote("Label does not exist".to_string()));
        }
        Ok(())
    }

    async fn check_run_count(&self, sha: &str) -> Result<u64> {
        self.record(Call::CheckRuns(sha.to_string()));
        Ok(self.check_runs)
    }

    async fn enable_auto_merge(
        &self,
        pull_request: &PullRequestRef,
        method: MergeMethod,
    ) -> Result<()> {
        self.record(Call::EnableAutoMerge(pull_request.number, method));
        if self.fail_auto_merge {
            return Err(SnapshotError::Remote(
                "Pull request is not in the correct state to enable auto-merge".to_string(),
            ));
        }
        Ok(())
    }
}
