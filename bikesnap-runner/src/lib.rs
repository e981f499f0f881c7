pub mod fetcher;
pub mod pipeline;
pub mod publisher;
pub mod writer;

#[cfg(test)]
pub(crate) mod fakes;

pub use fetcher::{Fetcher, HttpFetcher};
pub use pipeline::{PipelineConfig, SnapshotPipeline, DEFAULT_SOURCE_URL};
pub use publisher::{CiWait, Publisher, MIN_POLL_INTERVAL};
pub use writer::write_snapshot;
