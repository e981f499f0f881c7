use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const BRANCH_PREFIX: &str = "data-update-";
pub const AUTO_MERGE_LABEL: &str = "auto-merge";
pub const PLACEHOLDER_FILE: &str = ".gitkeep";

/// Location of a snapshot inside the data repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemotePath {
    pub folder: String,
    pub file_name: String,
}

impl RemotePath {
    pub fn new<F: Into<String>, N: Into<String>>(folder: F, file_name: N) -> Self {
        Self {
            folder: folder.into(),
            file_name: file_name.into(),
        }
    }

    pub fn placeholder(&self) -> String {
        format!("{}/{}", self.folder, PLACEHOLDER_FILE)
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.folder.is_empty() {
            f.write_str(&self.file_name)
        } else {
            write!(f, "{}/{}", self.folder, self.file_name)
        }
    }
}

/// One fetched payload plus its capture metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub payload: Vec<u8>,
    pub fetched_at: DateTime<Tz>,
    pub source_url: String,
    pub local_path: PathBuf,
    pub remote_path: RemotePath,
}

impl Snapshot {
    /// `YYYYMMDD_HHMMSS` in the capture zone
    pub fn branch_stamp(&self) -> String {
        self.fetched_at.format("%Y%m%d_%H%M%S").to_string()
    }

    pub fn display_stamp(&self) -> String {
        self.fetched_at.format("%Y-%m-%d %H:%M:%S %Z").to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    Merge,
    #[default]
    Squash,
    Rebase,
}

impl MergeMethod {
    /// Name of the `PullRequestMergeMethod` GraphQL enum value
    pub fn graphql_name(&self) -> &'static str {
        match self {
            MergeMethod::Merge => "MERGE",
            MergeMethod::Squash => "SQUASH",
            MergeMethod::Rebase => "REBASE",
        }
    }
}

impl FromStr for MergeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merge" => Ok(MergeMethod::Merge),
            "squash" => Ok(MergeMethod::Squash),
            "rebase" => Ok(MergeMethod::Rebase),
            other => Err(format!("unknown merge method '{}'", other)),
        }
    }
}

/// Static publishing configuration shared by every run
#[derive(Debug, Clone, PartialEq)]
pub struct PublishSettings {
    /// Override for the branch the pull request targets.
    /// `None` uses the repository's default branch.
    pub base_branch: Option<String>,
    pub labels: Vec<String>,
    pub merge_method: MergeMethod,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            base_branch: None,
            labels: vec![AUTO_MERGE_LABEL.to_string()],
            merge_method: MergeMethod::Squash,
        }
    }
}

/// Everything the publisher needs for one run
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    pub local_path: PathBuf,
    pub remote_folder: String,
    pub remote_file_name: String,
    pub branch_name: String,
    pub base_branch: Option<String>,
    /// `YYYYMMDD_HHMMSS` of the capture, used in commit messages
    pub commit_stamp: String,
    pub pr_title: String,
    pub pr_body: String,
    pub labels: Vec<String>,
    pub merge_method: MergeMethod,
}

impl PublishRequest {
    pub fn from_snapshot(snapshot: &Snapshot, settings: &PublishSettings) -> Self {
        let stamp = snapshot.branch_stamp();
        let remote_path = snapshot.remote_path.to_string();

        Self {
            local_path: snapshot.local_path.clone(),
            remote_folder: snapshot.remote_path.folder.clone(),
            remote_file_name: snapshot.remote_path.file_name.clone(),
            branch_name: format!("{}{}", BRANCH_PREFIX, stamp),
            base_branch: settings.base_branch.clone(),
            commit_stamp: stamp.clone(),
            pr_title: format!("Update bike-share data - {}", stamp),
            pr_body: format!(
                "Automatically generated PR with updated bike-share data.\n\n\
                 - Snapshot: `{}`\n\
                 - Source: {}\n\
                 - Fetched at: {}",
                remote_path,
                snapshot.source_url,
                snapshot.display_stamp()
            ),
            labels: settings.labels.clone(),
            merge_method: settings.merge_method,
        }
    }

    pub fn remote_path(&self) -> String {
        RemotePath::new(self.remote_folder.clone(), self.remote_file_name.clone()).to_string()
    }

    /// "Add ..." for a new file, "Update ..." when it replaces an existing one
    pub fn commit_message(&self, action: FileAction) -> String {
        let verb = match action {
            FileAction::Created => "Add",
            FileAction::Updated => "Update",
        };
        format!("{} {} - {}", verb, self.remote_file_name, self.commit_stamp)
    }
}

/// Revision identifier of a file on the remote (blob SHA on GitHub)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRevision(pub String);

impl FileRevision {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of an existence check against the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentState {
    Found(FileRevision),
    NotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PullRequestRef {
    pub number: u64,
    pub html_url: String,
    /// GraphQL node id, needed to toggle auto-merge
    pub node_id: String,
}

/// Publisher progress, in order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum PublishStage {
    Started,
    BranchEnsured,
    FolderEnsured,
    FileCommitted,
    PrOpened,
    Labeled,
    AutoMergeRequested,
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublishStage::Started => "started",
            PublishStage::BranchEnsured => "branch ensured",
            PublishStage::FolderEnsured => "folder ensured",
            PublishStage::FileCommitted => "file committed",
            PublishStage::PrOpened => "pull request opened",
            PublishStage::Labeled => "labeled",
            PublishStage::AutoMergeRequested => "auto-merge requested",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CiWaitStatus {
    Skipped,
    Registered { check_runs: u64 },
    TimedOut,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AutoMergeStatus {
    Enabled,
    Failed(String),
}

/// Result of a completed publish
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishOutcome {
    pub branch_name: String,
    pub base_branch: String,
    pub remote_path: String,
    pub file_action: FileAction,
    pub commit_sha: String,
    pub pull_request: PullRequestRef,
    pub labels: Vec<String>,
    pub ci_wait: CiWaitStatus,
    pub auto_merge: AutoMergeStatus,
    pub stage: PublishStage,
}

/// What a single pipeline invocation produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub snapshot: Snapshot,
    pub publish: Option<PublishOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn create_test_snapshot() -> Snapshot {
        let fetched_at = Utc
            .with_ymd_and_hms(2024, 1, 5, 19, 30, 0)
            .unwrap()
            .with_timezone(&chrono_tz::America::New_York);

        Snapshot {
            payload: br#"{"data":["x"]}"#.to_vec(),
            fetched_at,
            source_url: "https://gbfs.example.com/station_status.json".to_string(),
            local_path: PathBuf::from("2024-01-05/Station-Status_2024-01-05_14-30-00.json"),
            remote_path: RemotePath::new("2024-01-05", "Station-Status_2024-01-05_14-30-00.json"),
        }
    }

    #[test]
    fn test_publish_request_from_snapshot() {
        let snapshot = create_test_snapshot();
        let request = PublishRequest::from_snapshot(&snapshot, &PublishSettings::default());

        assert_eq!(request.branch_name, "data-update-20240105_143000");
        assert_eq!(request.remote_folder, "2024-01-05");
        assert_eq!(
            request.remote_path(),
            "2024-01-05/Station-Status_2024-01-05_14-30-00.json"
        );
        assert_eq!(request.labels, vec!["auto-merge".to_string()]);
        assert_eq!(request.merge_method, MergeMethod::Squash);
        assert!(request.base_branch.is_none());
        assert!(request.pr_title.contains("20240105_143000"));
        assert_eq!(
            request.commit_message(FileAction::Created),
            "Add Station-Status_2024-01-05_14-30-00.json - 20240105_143000"
        );
        assert_eq!(
            request.commit_message(FileAction::Updated),
            "Update Station-Status_2024-01-05_14-30-00.json - 20240105_143000"
        );
        assert!(request
            .pr_body
            .contains("2024-01-05/Station-Status_2024-01-05_14-30-00.json"));
    }

    #[test]
    fn test_publish_request_keeps_base_override() {
        let snapshot = create_test_snapshot();
        let settings = PublishSettings {
            base_branch: Some("data".to_string()),
            ..Default::default()
        };
        let request = PublishRequest::from_snapshot(&snapshot, &settings);
        assert_eq!(request.base_branch.as_deref(), Some("data"));
    }

    #[test]
    fn test_snapshot_stamps_use_capture_zone() {
        let snapshot = create_test_snapshot();
        assert_eq!(snapshot.branch_stamp(), "20240105_143000");
        assert!(snapshot.display_stamp().starts_with("2024-01-05 14:30:00"));
    }

    #[test]
    fn test_remote_path_display() {
        assert_eq!(RemotePath::new("", "a.json").to_string(), "a.json");
        assert_eq!(RemotePath::new("d", "a.json").to_string(), "d/a.json");
        assert_eq!(RemotePath::new("d", "a.json").placeholder(), "d/.gitkeep");
    }

    #[test]
    fn test_merge_method_parse() {
        assert_eq!("SQUASH".parse::<MergeMethod>().unwrap(), MergeMethod::Squash);
        assert_eq!(MergeMethod::Rebase.graphql_name(), "REBASE");
        assert!("fast-forward".parse::<MergeMethod>().is_err());
    }

    #[test]
    fn test_stage_order() {
        assert!(PublishStage::BranchEnsured < PublishStage::FileCommitted);
        assert!(PublishStage::Labeled < PublishStage::AutoMergeRequested);
    }
}
