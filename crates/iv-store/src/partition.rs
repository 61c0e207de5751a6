//! Date-partitioned target directories.
//!
//! New assets land in `{root}/{YYYY}/{MM}` (or `{root}/{YYYY}/{MM}/{DD}`),
//! so every upload made within the same calendar unit shares a directory.

use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Calendar unit that selects the target directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// `YYYY/MM`
    #[default]
    Month,
    /// `YYYY/MM/DD`
    Day,
}

/// Where "today" comes from when a save resolves its directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateSource {
    /// The server's local calendar date.
    #[default]
    Local,
    /// The UTC calendar date.
    Utc,
    /// Always the given date.
    Fixed(NaiveDate),
}

impl DateSource {
    pub fn today(&self) -> NaiveDate {
        match self {
            DateSource::Local => Local::now().date_naive(),
            DateSource::Utc => Utc::now().date_naive(),
            DateSource::Fixed(date) => *date,
        }
    }
}

/// Path segments of the partition for `date`.
pub fn partition_segments(date: NaiveDate, partition: Partition) -> Vec<String> {
    let mut segments = vec![format!("{:04}", date.year()), format!("{:02}", date.month())];
    if partition == Partition::Day {
        segments.push(format!("{:02}", date.day()));
    }
    segments
}

/// Compute the target directory for an asset saved on `date`. No I/O.
pub fn resolve_target_dir(root: &Path, date: NaiveDate, partition: Partition) -> PathBuf {
    partition_segments(date, partition)
        .into_iter()
        .fold(root.to_path_buf(), |dir, segment| dir.join(segment))
}
