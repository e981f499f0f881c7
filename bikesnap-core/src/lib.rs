pub mod error;
pub mod models;
pub mod naming;

pub use error::{Result, SnapshotError};
pub use models::*;
pub use naming::{NamingScheme, SnapshotName, SnapshotNamer};
