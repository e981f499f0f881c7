use crate::fetcher::Fetcher;
use crate::publisher::Publisher;
use crate::writer::write_snapshot;
use bikesnap_core::{
    PipelineReport, PublishRequest, PublishSettings, RemotePath, Result, Snapshot, SnapshotNamer,
};
use bikesnap_github::HostingClient;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_SOURCE_URL: &str = "https://gbfs.citibikenyc.com/gbfs/en/station_status.json";

/// Static settings for one pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source_url: String,
    /// Root under which the dated folders are created
    pub output_dir: PathBuf,
    pub publish: PublishSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            output_dir: PathBuf::from("."),
            publish: PublishSettings::default(),
        }
    }
}

/// Fetch, name, write and (optionally) publish one snapshot
pub struct SnapshotPipeline<F, H> {
    config: PipelineConfig,
    namer: SnapshotNamer,
    fetcher: F,
    publisher: Option<Publisher<H>>,
}

impl<F: Fetcher, H: HostingClient> SnapshotPipeline<F, H> {
    pub fn new(config: PipelineConfig, namer: SnapshotNamer, fetcher: F) -> Self {
        Self {
            config,
            namer,
            fetcher,
            publisher: None,
        }
    }

    pub fn with_publisher(mut self, publisher: Publisher<H>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn publisher(&self) -> Option<&Publisher<H>> {
        self.publisher.as_ref()
    }

    pub async fn run(&self) -> Result<PipelineReport> {
        self.run_at(Utc::now()).await
    }

    /// Runs the whole pipeline as if started at `now`
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<PipelineReport> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();

        info!(
            run_id = %run_id,
            source = %self.config.source_url,
            timezone = self.namer.timezone().name(),
            "Starting snapshot run"
        );

        let snapshot = self.capture(now).await?;

        let publish = match &self.publisher {
            Some(publisher) => {
                let request = PublishRequest::from_snapshot(&snapshot, &self.config.publish);
                Some(publisher.publish(&request).await?)
            }
            None => None,
        };

        info!(
            run_id = %run_id,
            path = %snapshot.local_path.display(),
            published = publish.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Snapshot run completed"
        );

        Ok(PipelineReport { snapshot, publish })
    }

    /// Fetches the feed and writes it under its derived name
    pub async fn capture(&self, now: DateTime<Utc>) -> Result<Snapshot> {
        let payload = self.fetcher.fetch(&self.config.source_url).await?;

        let name = self.namer.name(now);
        let local_path = self
            .config
            .output_dir
            .join(&name.folder)
            .join(&name.file_name);

        write_snapshot(&local_path, &payload)?;

        Ok(Snapshot {
            payload,
            fetched_at: name.captured_at,
            source_url: self.config.source_url.clone(),
            local_path,
            remote_path: RemotePath::new(name.folder, name.file_name),
        })
    }
}
