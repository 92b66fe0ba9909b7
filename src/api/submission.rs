//! One uploaded image and its remote processing lifecycle.
//!
//! A submission moves through `Blank → Uploaded → Queued`; once queued it
//! carries the job the remote system assigned, and the interesting state
//! (solving, solved, failed) lives on the remote side and is polled. The
//! queued transition is recorded exactly once and answered from cache
//! afterwards, so re-polling is free.

use std::path::Path;

use super::client::{ApiClient, SessionKey};
use super::{ApiError, Result};

/// A plate-solving job assigned to a submission by the remote system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    id: u64,
}

impl Job {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Raw remote status string (`"solving"`, `"success"`, `"failure"`, …).
    ///
    /// Deliberately not collapsed to a boolean: a finished-but-failed job
    /// and a finished-and-solved job must stay distinguishable.
    pub fn status(&self, api: &ApiClient) -> Result<String> {
        api.job_status(self.id)
    }

    /// Solved `(latitude, longitude)` — declination and right ascension —
    /// or `None` while unsolved or failed. Repeatable, no side effects.
    pub fn coordinates(&self, api: &ApiClient) -> Result<Option<(f64, f64)>> {
        api.job_calibration(self.id)
    }
}

/// Lifecycle state, advanced by `submit` and `queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Blank,
    Uploaded { submission_id: u64 },
    Queued { submission_id: u64, job: Job },
}

/// One image upload and its lifecycle against the remote service.
#[derive(Debug, Clone)]
pub struct Submission {
    session: SessionKey,
    state: State,
}

impl Submission {
    /// A blank submission, populated once submitted.
    pub fn blank(session: SessionKey) -> Self {
        Self {
            session,
            state: State::Blank,
        }
    }

    /// Upload the image, recording the remote-assigned submission id.
    pub fn submit(&mut self, api: &ApiClient, image: &Path) -> Result<u64> {
        let submission_id = api.upload(&self.session, image)?;
        tracing::info!(submission_id, image = %image.display(), "uploaded");
        self.state = State::Uploaded { submission_id };
        Ok(submission_id)
    }

    /// Remote-assigned submission id, if uploaded.
    pub fn id(&self) -> Option<u64> {
        match self.state {
            State::Blank => None,
            State::Uploaded { submission_id } | State::Queued { submission_id, .. } => {
                Some(submission_id)
            }
        }
    }

    /// The assigned job, once queued.
    pub fn job(&self) -> Option<&Job> {
        match &self.state {
            State::Queued { job, .. } => Some(job),
            _ => None,
        }
    }

    /// Whether the remote system has assigned a job yet.
    ///
    /// Polls until the first job slot is non-null, then records the job
    /// id; from then on the answer is `true` without a network call.
    /// Safe to call repeatedly.
    pub fn queued(&mut self, api: &ApiClient) -> Result<bool> {
        match self.state {
            State::Blank => Err(ApiError::NotUploaded),
            State::Queued { .. } => Ok(true),
            State::Uploaded { submission_id } => {
                let jobs = api.submission_jobs(submission_id)?;
                match jobs.first() {
                    Some(&Some(id)) => {
                        tracing::debug!(submission_id, job_id = id, "job assigned");
                        self.state = State::Queued {
                            submission_id,
                            job: Job { id },
                        };
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            }
        }
    }

    /// Whether the job is currently solving. Valid only once queued.
    ///
    /// Any other status — solved, failed, unknown — counts as not
    /// solving; pair with [`Job::status`] to tell those apart.
    pub fn solving(&self, api: &ApiClient) -> Result<bool> {
        match &self.state {
            State::Queued { job, .. } => Ok(job.status(api)? == "solving"),
            _ => Err(ApiError::NotQueued),
        }
    }

    /// Solved coordinates of this submission's job. Valid only once queued.
    pub fn coordinates(&self, api: &ApiClient) -> Result<Option<(f64, f64)>> {
        match &self.state {
            State::Queued { job, .. } => job.coordinates(api),
            _ => Err(ApiError::NotQueued),
        }
    }

    /// Build a submission already in the queued state.
    #[cfg(test)]
    pub(crate) fn queued_with_job(session: SessionKey, submission_id: u64, job_id: u64) -> Self {
        Self {
            session,
            state: State::Queued {
                submission_id,
                job: Job { id: job_id },
            },
        }
    }
}
