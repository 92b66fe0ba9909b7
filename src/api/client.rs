//! HTTP plumbing for the plate-solving API.
//!
//! One endpoint call per method, blocking request/response. The base URL
//! is explicit so tests (and anyone running a local stand-in) can point
//! the client elsewhere.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt, fs};

use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use super::{ApiError, Result};

/// Production endpoint of the plate-solving service.
pub const DEFAULT_BASE_URL: &str = "https://nova.astrometry.net/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Opaque session credential returned by login.
///
/// Required on every upload. Shared read-only by all four directional
/// submissions of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey(Arc<str>);

impl SessionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionKey {
    fn from(raw: String) -> Self {
        Self(raw.into())
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Blocking client for the remote plate-solving API.
pub struct ApiClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    session: Option<String>,
    #[serde(default)]
    errormessage: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    subid: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SubmissionStatusResponse {
    jobs: Option<Vec<Option<u64>>>,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalibrationResponse {
    ra: Option<f64>,
    dec: Option<f64>,
}

impl ApiClient {
    /// Create a client against the given base URL (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Log in with an API key and obtain a session credential.
    ///
    /// No retry: a rejected key stays rejected, so the caller must
    /// re-invoke with a different one.
    pub fn login(&self, api_key: &str) -> Result<SessionKey> {
        let request_json = serde_json::json!({ "apikey": api_key });

        let response = self
            .http
            .post(format!("{}/login", self.base_url))
            .form(&[("request-json", request_json.to_string())])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Authentication {
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        let login: LoginResponse = response.json().map_err(|e| ApiError::Malformed {
            endpoint: "login",
            reason: e.to_string(),
        })?;

        match login.session {
            Some(session) => {
                tracing::info!("logged in to the plate-solving service");
                Ok(SessionKey(session.into()))
            }
            None => Err(ApiError::Authentication {
                reason: login
                    .errormessage
                    .unwrap_or_else(|| "no session in response".to_string()),
            }),
        }
    }

    /// Upload one image, returning the remote-assigned submission id.
    ///
    /// The image is read fully before any network traffic, so a missing
    /// file fails without touching the remote side.
    pub(crate) fn upload(&self, session: &SessionKey, image: &Path) -> Result<u64> {
        let bytes = fs::read(image).map_err(|source| ApiError::FileAccess {
            path: image.to_path_buf(),
            source,
        })?;

        let file_name = image
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());

        let (content_type, body) = multipart_body(session, &file_name, &bytes);

        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Upload {
                status: status.as_u16(),
            });
        }

        let upload: UploadResponse = response.json().map_err(|e| ApiError::Malformed {
            endpoint: "upload",
            reason: e.to_string(),
        })?;

        upload.subid.ok_or(ApiError::Malformed {
            endpoint: "upload",
            reason: "missing subid".to_string(),
        })
    }

    /// Job slots of a submission. A slot stays null until the remote
    /// system assigns a job to it.
    pub(crate) fn submission_jobs(&self, submission_id: u64) -> Result<Vec<Option<u64>>> {
        let response = self
            .http
            .get(format!("{}/submissions/{submission_id}", self.base_url))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::RemoteQuery {
                status: status.as_u16(),
            });
        }

        let submission: SubmissionStatusResponse =
            response.json().map_err(|e| ApiError::Malformed {
                endpoint: "submissions",
                reason: e.to_string(),
            })?;

        Ok(submission.jobs.unwrap_or_default())
    }

    /// Raw status string of a job, uncollapsed: states past "solving"
    /// must stay distinguishable for the caller.
    pub(crate) fn job_status(&self, job_id: u64) -> Result<String> {
        let response = self
            .http
            .get(format!("{}/jobs/{job_id}", self.base_url))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::RemoteQuery {
                status: status.as_u16(),
            });
        }

        let job: JobStatusResponse = response.json().map_err(|e| ApiError::Malformed {
            endpoint: "jobs",
            reason: e.to_string(),
        })?;

        job.status.ok_or(ApiError::Malformed {
            endpoint: "jobs",
            reason: "missing status".to_string(),
        })
    }

    /// Solved coordinates of a job as `(declination, right ascension)`,
    /// i.e. a (latitude, longitude) pair.
    ///
    /// `None` whenever the remote calibration has no right ascension —
    /// the job has not solved, or failed to. Side-effect free.
    pub(crate) fn job_calibration(&self, job_id: u64) -> Result<Option<(f64, f64)>> {
        let response = self
            .http
            .get(format!("{}/jobs/{job_id}/calibration", self.base_url))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::RemoteQuery {
                status: status.as_u16(),
            });
        }

        let calibration: CalibrationResponse =
            response.json().map_err(|e| ApiError::Malformed {
                endpoint: "calibration",
                reason: e.to_string(),
            })?;

        let Some(ra) = calibration.ra else {
            return Ok(None);
        };
        let dec = calibration.dec.ok_or(ApiError::Malformed {
            endpoint: "calibration",
            reason: "ra present but dec missing".to_string(),
        })?;

        Ok(Some((dec, ra)))
    }
}

/// Build the multipart upload body by hand.
///
/// The service expects this exact part layout: a `request-json` text part
/// carrying the upload settings, then the raw image bytes. The boundary
/// is 19 random decimal digits so it cannot collide with file content.
fn multipart_body(session: &SessionKey, file_name: &str, image: &[u8]) -> (String, Vec<u8>) {
    let mut rng = rand::rng();
    let digits: String = (0..19)
        .map(|_| char::from(b'0' + rng.random_range(0..10)))
        .collect();
    let boundary = format!("==============={digits}==");

    let settings = serde_json::json!({
        "publicly_visible": "y",
        "allow_modifications": "d",
        "session": session.as_str(),
        "allow_commercial_use": "d",
        "parity": 0, // Known parity halves the search time
    });

    let pre = format!(
        "--{boundary}\nContent-Type: text/plain\r\nMIME-Version: 1.0\r\n\
         Content-disposition: form-data; name=\"request-json\"\r\n\
         \r\n{settings}\n--{boundary}\n\
         Content-Type: application/octet-stream\r\nMIME-Version: 1.0\r\n\
         Content-disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\r\n"
    );
    let post = format!("\n--{boundary}--\n");

    let mut body = Vec::with_capacity(pre.len() + image.len() + post.len());
    body.extend_from_slice(pre.as_bytes());
    body.extend_from_slice(image);
    body.extend_from_slice(post.as_bytes());

    (format!("multipart/form-data; boundary=\"{boundary}\""), body)
}
