//! Four directional submissions driven as one unit.
//!
//! A bundled submission pairs each of the bundle's images with its own
//! [`Submission`], walks all four through the upload/queue/solve
//! lifecycle, and averages whatever coordinates come back into a fix.

use crate::bundle::Bundle;

use super::client::{ApiClient, SessionKey};
use super::submission::Submission;
use super::{ApiError, Result};

/// How per-direction coordinates are averaged into a fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Averaging {
    /// Divide by the number of directions that actually solved, and warn
    /// when that is fewer than four.
    #[default]
    Solved,

    /// Divide by four regardless of how many directions solved, skewing a
    /// partial fix toward zero. Matches the behavior of earlier tooling;
    /// only useful when comparing against its recorded output.
    FixedFour,
}

/// An aggregate position estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    /// Averaged declination, degrees.
    pub latitude: f64,

    /// Averaged right ascension, degrees.
    pub longitude: f64,

    /// How many of the four directions contributed coordinates.
    pub solved: u32,
}

/// The four per-direction submissions for one bundle.
///
/// All four are created together from the same session key and stay
/// paired with their bundle image for their entire lifetime.
#[derive(Debug)]
pub struct BundledSubmission {
    bundle: Bundle,
    port: Submission,
    stern: Submission,
    starboard: Submission,
    bow: Submission,
}

impl BundledSubmission {
    /// Pair a bundle with four blank submissions under one session.
    pub fn from_bundle(bundle: Bundle, session: &SessionKey) -> Self {
        Self {
            bundle,
            port: Submission::blank(session.clone()),
            stern: Submission::blank(session.clone()),
            starboard: Submission::blank(session.clone()),
            bow: Submission::blank(session.clone()),
        }
    }

    /// Upload all four images, in fixed order: port, stern, starboard, bow.
    ///
    /// A failure partway through leaves the earlier uploads in place on
    /// the remote side; there is no rollback.
    pub fn submit(&mut self, api: &ApiClient) -> Result<()> {
        self.port.submit(api, &self.bundle.port)?;
        self.stern.submit(api, &self.bundle.stern)?;
        self.starboard.submit(api, &self.bundle.starboard)?;
        self.bow.submit(api, &self.bundle.bow)?;
        Ok(())
    }

    /// Whether all four submissions have been assigned jobs.
    ///
    /// Polls every direction that has not flipped yet, so repeated calls
    /// converge one direction at a time. No timeout of its own.
    pub fn queued(&mut self, api: &ApiClient) -> Result<bool> {
        let mut all = true;
        for submission in [
            &mut self.port,
            &mut self.stern,
            &mut self.starboard,
            &mut self.bow,
        ] {
            all &= submission.queued(api)?;
        }
        Ok(all)
    }

    /// Whether every direction has left the solving stage.
    ///
    /// Finished does not imply success: a job that failed to solve and
    /// one that solved both count as finished.
    pub fn finished(&mut self, api: &ApiClient) -> Result<bool> {
        if !self.queued(api)? {
            return Ok(false);
        }
        for submission in [&self.port, &self.stern, &self.starboard, &self.bow] {
            if submission.solving(api)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Average the solved per-direction coordinates into a fix.
    ///
    /// Meant to be read once, after [`finished`](Self::finished) reports
    /// true.
    pub fn results(&self, api: &ApiClient, averaging: Averaging) -> Result<Fix> {
        let mut latitude = 0.0;
        let mut longitude = 0.0;
        let mut solved: u32 = 0;

        for submission in [&self.port, &self.stern, &self.starboard, &self.bow] {
            if let Some((lat, lon)) = submission.coordinates(api)? {
                latitude += lat;
                longitude += lon;
                solved += 1;
            }
        }

        let divisor = match averaging {
            Averaging::FixedFour => 4.0,
            Averaging::Solved => {
                if solved == 0 {
                    return Err(ApiError::NoSolvedImages);
                }
                if solved < 4 {
                    tracing::warn!(solved, "partial fix: not every direction solved");
                }
                f64::from(solved)
            }
        };

        Ok(Fix {
            latitude: latitude / divisor,
            longitude: longitude / divisor,
            solved,
        })
    }
}
