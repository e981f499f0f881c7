use bikesnap_core::naming::{DEFAULT_EXTENSION, DEFAULT_LABEL};
use bikesnap_core::{
    MergeMethod, NamingScheme, PublishSettings, Result, SnapshotError, SnapshotNamer,
    AUTO_MERGE_LABEL,
};
use bikesnap_github::{GitHubClient, DEFAULT_API_URL};
use bikesnap_runner::{CiWait, PipelineConfig, DEFAULT_SOURCE_URL};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REPOSITORY: &str = "AdityaSreevatsaK/GetCityBikeData";
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Where the feed comes from and how snapshots are named on disk
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// GBFS feed URL to snapshot
    #[arg(long, env = "BIKESNAP_SOURCE_URL", default_value = DEFAULT_SOURCE_URL, global = true)]
    pub source_url: String,

    /// IANA time zone used for folder and file names
    #[arg(long, env = "BIKESNAP_TIMEZONE", default_value = DEFAULT_TIMEZONE, global = true)]
    pub timezone: String,

    /// Directory the dated folders are created in
    #[arg(long, env = "BIKESNAP_OUTPUT_DIR", default_value = ".", global = true)]
    pub output_dir: PathBuf,

    /// File naming scheme (timestamped or hourly)
    #[arg(long, env = "BIKESNAP_NAMING", default_value = "timestamped", global = true)]
    pub naming: NamingScheme,

    /// Prefix of timestamped file names
    #[arg(long, env = "BIKESNAP_FILE_LABEL", default_value = DEFAULT_LABEL, global = true)]
    pub file_label: String,

    /// Extension of snapshot files
    #[arg(long, env = "BIKESNAP_EXTENSION", default_value = DEFAULT_EXTENSION, global = true)]
    pub extension: String,
}

impl SourceArgs {
    pub fn namer(&self) -> Result<SnapshotNamer> {
        Ok(SnapshotNamer::new(&self.timezone)?
            .with_scheme(self.naming)
            .with_label(self.file_label.clone())
            .with_extension(self.extension.clone()))
    }

    pub fn pipeline_config(&self, publish: PublishSettings) -> PipelineConfig {
        PipelineConfig {
            source_url: self.source_url.clone(),
            output_dir: self.output_dir.clone(),
            publish,
        }
    }
}

/// Data repository and pull request options
#[derive(Args, Debug, Clone)]
pub struct PublishArgs {
    /// Access token for the hosting platform
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Data repository as owner/name
    #[arg(long, env = "BIKESNAP_REPOSITORY", default_value = DEFAULT_REPOSITORY)]
    pub repository: String,

    /// REST API root; a GitHub Enterprise `https://host/api/v3` root is supported
    #[arg(long, env = "BIKESNAP_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Branch the pull request targets (defaults to the repository's default branch)
    #[arg(long, env = "BIKESNAP_BASE_BRANCH")]
    pub base_branch: Option<String>,

    /// Labels added to the pull request
    #[arg(
        long = "pr-label",
        env = "BIKESNAP_PR_LABELS",
        value_delimiter = ',',
        default_value = AUTO_MERGE_LABEL
    )]
    pub pr_labels: Vec<String>,

    /// Auto-merge method (merge, squash or rebase)
    #[arg(long, env = "BIKESNAP_MERGE_METHOD", default_value = "squash")]
    pub merge_method: MergeMethod,

    /// Seconds to wait for CI checks to register before enabling auto-merge; 0 skips the wait
    #[arg(long, env = "BIKESNAP_CI_WAIT_SECS", default_value_t = 60)]
    pub ci_wait_secs: u64,

    /// Seconds between check-run polls while waiting for CI
    #[arg(long, env = "BIKESNAP_CI_POLL_SECS", default_value_t = 10)]
    pub ci_poll_secs: u64,
}

impl PublishArgs {
    pub fn token(&self) -> Result<String> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(String::from)
            .ok_or_else(|| {
                SnapshotError::Configuration(
                    "GITHUB_TOKEN environment variable is not set.".to_string(),
                )
            })
    }

    pub fn settings(&self) -> PublishSettings {
        PublishSettings {
            base_branch: self.base_branch.clone(),
            labels: self
                .pr_labels
                .iter()
                .map(|label| label.trim().to_string())
                .filter(|label| !label.is_empty())
                .collect(),
            merge_method: self.merge_method,
        }
    }

    pub fn ci_wait(&self) -> CiWait {
        CiWait {
            timeout: Duration::from_secs(self.ci_wait_secs),
            poll_interval: Duration::from_secs(self.ci_poll_secs),
        }
    }

    pub fn client(&self) -> Result<GitHubClient> {
        Ok(GitHubClient::new(&self.repository, &self.token()?)?.with_api_url(self.api_url.clone()))
    }
}
