pub mod client;
pub mod github;

pub use client::HostingClient;
pub use github::{GitHubClient, DEFAULT_API_URL};
