//! The solve driver: upload a bundle, poll until finished, read the fix.
//!
//! Polling is blocking and sequential. The driver adds what the bare
//! lifecycle does not have: an overall deadline checked between polls,
//! and retry with doubling backoff for transient transport failures.
//! Logical failures (bad credentials, rejected uploads, malformed
//! responses) abort immediately.

use std::thread;
use std::time::{Duration, Instant};

use crate::api::{ApiClient, ApiError, Averaging, BundledSubmission, Fix, SessionKey};
use crate::bundle::Bundle;

/// Consecutive transient failures tolerated before giving up.
const MAX_TRANSIENT_FAILURES: u32 = 5;

/// Errors from driving a bundle through the full solve.
#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("solve did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

/// Knobs for the polling loop.
#[derive(Debug, Clone, Copy)]
pub struct SolveOptions {
    /// Pause between polls of the remote service.
    pub poll_interval: Duration,

    /// Overall deadline for the whole solve, checked between polls.
    pub deadline: Duration,

    /// How partial results are averaged.
    pub averaging: Averaging,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            deadline: Duration::from_secs(900),
            averaging: Averaging::default(),
        }
    }
}

/// Upload all four directions and poll until the solve finishes, then
/// read the aggregate fix once.
pub fn solve_bundle(
    api: &ApiClient,
    bundle: Bundle,
    session: &SessionKey,
    options: &SolveOptions,
) -> Result<Fix, SolveError> {
    let mut submission = BundledSubmission::from_bundle(bundle, session);
    submission.submit(api)?;

    let start = Instant::now();
    let mut transient_failures: u32 = 0;

    loop {
        match submission.finished(api) {
            Ok(true) => break,
            Ok(false) => {
                transient_failures = 0;
                tracing::debug!(elapsed = ?start.elapsed(), "still solving");
            }
            Err(e) if e.is_transient() && transient_failures < MAX_TRANSIENT_FAILURES => {
                transient_failures += 1;
                tracing::warn!(
                    error = %e,
                    attempt = transient_failures,
                    "transient failure while polling, backing off"
                );
            }
            Err(e) => return Err(e.into()),
        }

        let pause = backoff(options.poll_interval, transient_failures);
        if start.elapsed() + pause >= options.deadline {
            return Err(SolveError::DeadlineExceeded(options.deadline));
        }
        thread::sleep(pause);
    }

    let fix = submission.results(api, options.averaging)?;
    tracing::info!(
        latitude = fix.latitude,
        longitude = fix.longitude,
        solved = fix.solved,
        "solve finished"
    );
    Ok(fix)
}

/// Poll interval doubled per consecutive transient failure.
fn backoff(interval: Duration, failures: u32) -> Duration {
    interval * 2u32.saturating_pow(failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    use crate::api::testing::RemoteApi;

    const PARAMS_JSON: &str = r#"{
        "heading": 270,
        "date": {"month": 2, "day": 4},
        "utc_time": {"hour": 4, "minute": 4}
    }"#;

    fn bundle_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("parameters.json"), PARAMS_JSON).unwrap();
        std::fs::write(dir.path().join("solution.txt"), "").unwrap();
        for image in ["Port.gif", "Starboard.gif", "Stern.gif", "Bow.gif"] {
            std::fs::write(dir.path().join(image), b"GIF89a...").unwrap();
        }
        dir
    }

    fn fast_options() -> SolveOptions {
        SolveOptions {
            poll_interval: Duration::from_millis(1),
            deadline: Duration::from_secs(5),
            averaging: Averaging::Solved,
        }
    }

    fn session() -> SessionKey {
        SessionKey::from("test-session".to_string())
    }

    #[test]
    fn drives_a_bundle_to_a_fix() {
        let remote = RemoteApi::start();

        for subid in [101, 102, 103, 104] {
            remote.mount(
                Mock::given(method("POST"))
                    .and(path("/upload"))
                    .respond_with(
                        ResponseTemplate::new(200).set_body_json(json!({ "subid": subid })),
                    )
                    .up_to_n_times(1),
            );
        }
        for (subid, job) in [(101, 201), (102, 202), (103, 203), (104, 204)] {
            // One round of "not queued yet" before the job appears.
            remote.mount(
                Mock::given(method("GET"))
                    .and(path(format!("/submissions/{subid}")))
                    .respond_with(
                        ResponseTemplate::new(200).set_body_json(json!({ "jobs": [null] })),
                    )
                    .up_to_n_times(1),
            );
            remote.mount(
                Mock::given(method("GET"))
                    .and(path(format!("/submissions/{subid}")))
                    .respond_with(
                        ResponseTemplate::new(200).set_body_json(json!({ "jobs": [job] })),
                    ),
            );
        }
        // Port's job solves after one round; the rest are already done.
        remote.mount(
            Mock::given(method("GET"))
                .and(path("/jobs/201"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({ "status": "solving" })),
                )
                .up_to_n_times(1),
        );
        for job in [201, 202, 203, 204] {
            remote.mount(
                Mock::given(method("GET"))
                    .and(path(format!("/jobs/{job}")))
                    .respond_with(
                        ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })),
                    ),
            );
            remote.mount(
                Mock::given(method("GET"))
                    .and(path(format!("/jobs/{job}/calibration")))
                    .respond_with(
                        ResponseTemplate::new(200)
                            .set_body_json(json!({ "ra": 20.0, "dec": 10.0 })),
                    ),
            );
        }

        let dir = bundle_dir();
        let bundle = Bundle::from_dir(dir.path()).unwrap();
        let fix =
            solve_bundle(&remote.client(), bundle, &session(), &fast_options()).unwrap();

        assert_eq!(fix.latitude, 10.0);
        assert_eq!(fix.longitude, 20.0);
        assert_eq!(fix.solved, 4);
    }

    #[test]
    fn gives_up_at_the_deadline() {
        let remote = RemoteApi::start();

        for subid in [101, 102, 103, 104] {
            remote.mount(
                Mock::given(method("POST"))
                    .and(path("/upload"))
                    .respond_with(
                        ResponseTemplate::new(200).set_body_json(json!({ "subid": subid })),
                    )
                    .up_to_n_times(1),
            );
        }
        // Jobs never get assigned.
        for subid in [101, 102, 103, 104] {
            remote.mount(
                Mock::given(method("GET"))
                    .and(path(format!("/submissions/{subid}")))
                    .respond_with(
                        ResponseTemplate::new(200).set_body_json(json!({ "jobs": [null] })),
                    ),
            );
        }

        let dir = bundle_dir();
        let bundle = Bundle::from_dir(dir.path()).unwrap();
        let options = SolveOptions {
            poll_interval: Duration::from_millis(1),
            deadline: Duration::from_millis(30),
            averaging: Averaging::Solved,
        };

        let err = solve_bundle(&remote.client(), bundle, &session(), &options).unwrap_err();
        assert!(matches!(err, SolveError::DeadlineExceeded(_)));
    }

    #[test]
    fn transient_server_errors_are_retried() {
        let remote = RemoteApi::start();

        for subid in [101, 102, 103, 104] {
            remote.mount(
                Mock::given(method("POST"))
                    .and(path("/upload"))
                    .respond_with(
                        ResponseTemplate::new(200).set_body_json(json!({ "subid": subid })),
                    )
                    .up_to_n_times(1),
            );
        }
        // Port's first poll hits a 503, then the service recovers.
        remote.mount(
            Mock::given(method("GET"))
                .and(path("/submissions/101"))
                .respond_with(ResponseTemplate::new(503))
                .up_to_n_times(1),
        );
        for (subid, job) in [(101, 201), (102, 202), (103, 203), (104, 204)] {
            remote.mount(
                Mock::given(method("GET"))
                    .and(path(format!("/submissions/{subid}")))
                    .respond_with(
                        ResponseTemplate::new(200).set_body_json(json!({ "jobs": [job] })),
                    ),
            );
            remote.mount(
                Mock::given(method("GET"))
                    .and(path(format!("/jobs/{job}")))
                    .respond_with(
                        ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })),
                    ),
            );
            remote.mount(
                Mock::given(method("GET"))
                    .and(path(format!("/jobs/{job}/calibration")))
                    .respond_with(
                        ResponseTemplate::new(200)
                            .set_body_json(json!({ "ra": 20.0, "dec": 10.0 })),
                    ),
            );
        }

        let dir = bundle_dir();
        let bundle = Bundle::from_dir(dir.path()).unwrap();
        let fix =
            solve_bundle(&remote.client(), bundle, &session(), &fast_options()).unwrap();
        assert_eq!(fix.solved, 4);
    }

    #[test]
    fn authentication_failures_are_not_retried() {
        let remote = RemoteApi::start();
        // Every upload is rejected outright.
        remote.mount(
            Mock::given(method("POST"))
                .and(path("/upload"))
                .respond_with(ResponseTemplate::new(403)),
        );

        let dir = bundle_dir();
        let bundle = Bundle::from_dir(dir.path()).unwrap();
        let err =
            solve_bundle(&remote.client(), bundle, &session(), &fast_options()).unwrap_err();

        assert!(matches!(
            err,
            SolveError::Api(ApiError::Upload { status: 403 })
        ));
        assert_eq!(remote.request_count(), 1);
    }
}
