//! Client for the remote plate-solving service.
//!
//! The service is a black box: images go up, celestial coordinates come
//! back. This module owns the submission lifecycle — upload, queue
//! discovery, status polling, and aggregation of per-direction results
//! into a single fix.

mod bundled;
mod client;
mod submission;

#[cfg(test)]
pub(crate) mod testing;

use std::{io, path::PathBuf};

pub use bundled::{Averaging, BundledSubmission, Fix};
pub use client::{ApiClient, DEFAULT_BASE_URL, SessionKey};
pub use submission::{Job, Submission};

/// Errors surfaced by the remote API and the upload path.
///
/// Nothing here is recovered locally; every variant propagates to the
/// caller. The solve driver decides which are worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication rejected: {reason}")]
    Authentication { reason: String },

    #[error("upload rejected: HTTP {status}")]
    Upload { status: u16 },

    #[error("remote query failed: HTTP {status}")]
    RemoteQuery { status: u16 },

    #[error("cannot read {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed {endpoint} response: {reason}")]
    Malformed {
        endpoint: &'static str,
        reason: String,
    },

    #[error("image has not been uploaded yet")]
    NotUploaded,

    #[error("no job has been assigned yet")]
    NotQueued,

    #[error("none of the four images solved")]
    NoSolvedImages,
}

impl ApiError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Connection-level failures and server-side errors are transient;
    /// everything else (bad credentials, malformed responses, lifecycle
    /// misuse) is logical and fatal.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::RemoteQuery { status } => *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = core::result::Result<T, ApiError>;
