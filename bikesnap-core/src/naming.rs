use crate::{Result, SnapshotError};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_LABEL: &str = "Station-Status";
pub const DEFAULT_EXTENSION: &str = "json";

/// How the file name inside the daily folder is built
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum NamingScheme {
    /// `<label>_<YYYY-MM-DD_HH-MM-SS>.<ext>`
    #[default]
    Timestamped,
    /// `<YYYY-MM-DD>_Hour-<HH>.<ext>`, one file per hour
    Hourly,
}

impl FromStr for NamingScheme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "timestamped" => Ok(NamingScheme::Timestamped),
            "hourly" => Ok(NamingScheme::Hourly),
            other => Err(format!(
                "unknown naming scheme '{}' (expected 'timestamped' or 'hourly')",
                other
            )),
        }
    }
}

impl fmt::Display for NamingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamingScheme::Timestamped => f.write_str("timestamped"),
            NamingScheme::Hourly => f.write_str("hourly"),
        }
    }
}

/// Names derived from a single capture instant
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotName {
    pub captured_at: DateTime<Tz>,
    /// Calendar date in the configured zone, `YYYY-MM-DD`
    pub folder: String,
    pub file_name: String,
    /// `YYYY-MM-DD_HH-MM-SS`
    pub stamp: String,
}

impl SnapshotName {
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.folder, self.file_name)
    }
}

/// Derives folder and file names for a snapshot from the wall clock
#[derive(Debug, Clone)]
pub struct SnapshotNamer {
    timezone: Tz,
    scheme: NamingScheme,
    label: String,
    extension: String,
}

impl SnapshotNamer {
    /// Fails with a configuration error when `timezone` is not a known IANA zone.
    pub fn new(timezone: &str) -> Result<Self> {
        let timezone: Tz = timezone.parse().map_err(|_| {
            SnapshotError::Configuration(format!("unknown time zone '{}'", timezone))
        })?;

        Ok(Self {
            timezone,
            scheme: NamingScheme::default(),
            label: DEFAULT_LABEL.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
        })
    }

    pub fn with_scheme(mut self, scheme: NamingScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn scheme(&self) -> NamingScheme {
        self.scheme
    }

    pub fn name(&self, instant: DateTime<Utc>) -> SnapshotName {
        let local = instant.with_timezone(&self.timezone);
        let folder = local.format("%Y-%m-%d").to_string();
        let stamp = local.format("%Y-%m-%d_%H-%M-%S").to_string();

        let file_name = match self.scheme {
            NamingScheme::Timestamped => {
                format!("{}_{}.{}", self.label, stamp, self.extension)
            }
            NamingScheme::Hourly => {
                format!("{}_Hour-{}.{}", folder, local.format("%H"), self.extension)
            }
        };

        SnapshotName {
            captured_at: local,
            folder,
            file_name,
            stamp,
        }
    }
}
