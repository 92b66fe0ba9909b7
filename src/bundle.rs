//! Test-case bundles: four directional images plus capture metadata.
//!
//! A bundle is loaded from a test-case directory laid out by convention:
//!
//! ```text
//! <dir>/
//!   Port.gif         # Camera facing port
//!   Starboard.gif    # Camera facing starboard
//!   Stern.gif        # Camera facing stern
//!   Bow.gif          # Camera facing bow
//!   parameters.json  # Capture time and heading
//!   solution.txt     # Ground-truth position (format not yet pinned down)
//! ```

use std::{fs, io, path::PathBuf};

use jiff::Timestamp;
use jiff::civil::{Date, Time};
use jiff::tz::TimeZone;
use serde::Deserialize;

/// All test cases were captured in the 2024 competition year; the parameter
/// files only carry month/day/hour/minute.
const CAPTURE_YEAR: i16 = 2024;

/// Errors that can occur while loading a bundle from disk.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid parameters JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid capture date/time: {0}")]
    Timestamp(#[from] jiff::Error),
}

pub type Result<T> = core::result::Result<T, BundleError>;

/// Capture metadata for one bundle of images.
///
/// Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    /// When the images were captured, UTC.
    pub timestamp: Timestamp,

    /// Ship's heading in degrees at capture time.
    pub heading: u16,
}

/// Wire shape of `parameters.json`.
#[derive(Debug, Deserialize)]
struct RawParameters {
    heading: u16,
    date: RawDate,
    utc_time: RawTime,
}

#[derive(Debug, Deserialize)]
struct RawDate {
    month: i8,
    day: i8,
}

#[derive(Debug, Deserialize)]
struct RawTime {
    hour: i8,
    minute: i8,
}

impl Parameters {
    /// Parse parameters from a JSON document.
    pub fn from_json(raw: &str) -> Result<Self> {
        let raw: RawParameters = serde_json::from_str(raw)?;

        let date = Date::new(CAPTURE_YEAR, raw.date.month, raw.date.day)?;
        let time = Time::new(raw.utc_time.hour, raw.utc_time.minute, 0, 0)?;
        let timestamp = date.to_datetime(time).to_zoned(TimeZone::UTC)?.timestamp();

        Ok(Self {
            timestamp,
            heading: raw.heading,
        })
    }

    /// Load parameters from their JSON file.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = fs::read_to_string(&path)
            .map_err(|source| BundleError::Read { path, source })?;
        Self::from_json(&contents)
    }
}

/// Ground-truth position for a test case.
///
/// The `solution.txt` grammar is not yet pinned down; parsing returns zeros
/// until it is, so solutions cannot be compared against fixes yet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Solution {
    /// Latitude in degrees.
    pub latitude: f64,

    /// Longitude in degrees.
    pub longitude: f64,

    /// Heading in degrees.
    pub heading: u16,
}

impl Solution {
    /// Load a solution from its file.
    ///
    /// The file must exist, but its contents are not yet interpreted.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::read_to_string(&path).map_err(|source| BundleError::Read { path, source })?;
        Ok(Self::default())
    }
}

/// The four directional images, their parameters, and their solution.
///
/// The four path fields are fixed at construction and never move.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub params: Parameters,
    pub solution: Solution,
    pub port: PathBuf,
    pub starboard: PathBuf,
    pub stern: PathBuf,
    pub bow: PathBuf,
}

impl Bundle {
    /// Load a bundle from a test-case directory.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        Ok(Self {
            params: Parameters::from_file(dir.join("parameters.json"))?,
            solution: Solution::from_file(dir.join("solution.txt"))?,
            port: dir.join("Port.gif"),
            starboard: dir.join("Starboard.gif"),
            stern: dir.join("Stern.gif"),
            bow: dir.join("Bow.gif"),
        })
    }
}
