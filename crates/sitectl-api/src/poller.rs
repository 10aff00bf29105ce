// Background job polling
//
// Long-running server operations (site copy, publish, activate, template
// import, REST async requests) hand back a job handle. `JobPoller` drives
// the `Submitted -> Polling -> {Complete, Failed, Error}` state machine
// against any `JobStatusSource`, on a fixed interval with a hard attempt
// budget.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::Error;

// ── Configuration ────────────────────────────────────────────────────

/// Interval and attempt budget for a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Session establishment: every 5 s, give up after 5 minutes.
    pub fn session_default() -> Self {
        Self::new(Duration::from_secs(5), 60)
    }

    /// Job status: every 6 s, give up after an hour.
    pub fn job_default() -> Self {
        Self::new(Duration::from_secs(6), 600)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::job_default()
    }
}

// ── Job reports ──────────────────────────────────────────────────────

/// What a submit call returned. No job id means the server finished the
/// work synchronously.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Running { percentage: Option<u32> },
    Complete,
    Failed,
}

/// One decoded status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub phase: JobPhase,
    pub message: Option<String>,
}

impl JobReport {
    pub fn running(percentage: Option<u32>) -> Self {
        Self {
            phase: JobPhase::Running { percentage },
            message: None,
        }
    }

    pub fn complete() -> Self {
        Self {
            phase: JobPhase::Complete,
            message: None,
        }
    }

    pub fn failed(message: Option<String>) -> Self {
        Self {
            phase: JobPhase::Failed,
            message,
        }
    }
}

// ── Sources ──────────────────────────────────────────────────────────

/// Anything that can report on a job by id.
pub trait JobStatusSource: Sync {
    /// Fetch and decode the current status of `job_id`.
    fn job_status(&self, job_id: &str) -> impl Future<Output = Result<JobReport, Error>> + Send;

    /// Fetch extended diagnostics for a failed job. Called at most once
    /// per failed job.
    fn job_diagnostics(
        &self,
        job_id: &str,
    ) -> impl Future<Output = Result<Option<String>, Error>> + Send;
}

/// A source that can also start jobs.
pub trait JobSubmitter: JobStatusSource {
    type Operation: Sync;

    fn submit_job(
        &self,
        op: &Self::Operation,
    ) -> impl Future<Output = Result<Submission, Error>> + Send;
}

// ── State machine ────────────────────────────────────────────────────

/// States a job passes through, as seen by an observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Submitted { job_id: Option<String> },
    Polling { attempt: u32, percentage: Option<u32> },
    Complete,
    Failed { message: String },
    Error { message: String },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed { .. } | Self::Error { .. })
    }
}

/// Result of a job that reached `Complete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub job_id: Option<String>,
    /// Status polls issued; zero for synchronous completion.
    pub attempts: u32,
}

/// Drives submitted jobs to a terminal state.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobPoller {
    config: PollConfig,
}

impl JobPoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    /// Submit `op` and wait for its job to finish.
    ///
    /// A rejected submit moves straight to `Error`. A submit without a job
    /// id is treated as synchronously complete.
    pub async fn submit_and_await<S, F>(
        &self,
        source: &S,
        op: &S::Operation,
        mut observe: F,
    ) -> Result<JobOutcome, Error>
    where
        S: JobSubmitter,
        F: FnMut(&JobState) + Send,
    {
        let submission = match source.submit_job(op).await {
            Ok(submission) => submission,
            Err(e) => {
                observe(&JobState::Error {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };
        observe(&JobState::Submitted {
            job_id: submission.job_id.clone(),
        });

        match submission.job_id {
            Some(job_id) => {
                info!(job_id = %job_id, "submitted job");
                self.await_job(source, &job_id, observe).await
            }
            None => {
                observe(&JobState::Complete);
                Ok(JobOutcome {
                    job_id: None,
                    attempts: 0,
                })
            }
        }
    }

    /// Poll an already-submitted job until it reaches a terminal state or
    /// the attempt budget runs out.
    pub async fn await_job<S, F>(
        &self,
        source: &S,
        job_id: &str,
        mut observe: F,
    ) -> Result<JobOutcome, Error>
    where
        S: JobStatusSource,
        F: FnMut(&JobState) + Send,
    {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; statuses are checked one
        // interval after submit.
        ticker.tick().await;

        for attempt in 1..=self.config.max_attempts {
            ticker.tick().await;

            let report = match source.job_status(job_id).await {
                Ok(report) => report,
                Err(e) => {
                    debug!(job_id, error = %e, "job status unreadable");
                    JobReport::failed(Some(e.to_string()))
                }
            };

            match report.phase {
                JobPhase::Complete => {
                    observe(&JobState::Complete);
                    return Ok(JobOutcome {
                        job_id: Some(job_id.to_owned()),
                        attempts: attempt,
                    });
                }
                JobPhase::Failed => {
                    let diagnostics = match source.job_diagnostics(job_id).await {
                        Ok(d) => d,
                        Err(e) => {
                            warn!(job_id, error = %e, "could not fetch job diagnostics");
                            None
                        }
                    };
                    let message = diagnostics
                        .or(report.message)
                        .unwrap_or_else(|| "job reported failure".into());
                    observe(&JobState::Failed {
                        message: message.clone(),
                    });
                    return Err(Error::JobFailed {
                        job_id: job_id.to_owned(),
                        message,
                    });
                }
                JobPhase::Running { percentage } => {
                    observe(&JobState::Polling {
                        attempt,
                        percentage,
                    });
                }
            }
        }

        let message = format!(
            "no terminal status after {} checks",
            self.config.max_attempts
        );
        observe(&JobState::Error { message });
        Err(Error::JobTimeout {
            job_id: job_id.to_owned(),
            attempts: self.config.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;

    /// Replays a fixed script of status reports.
    struct Scripted {
        submit: Mutex<Option<Result<Submission, Error>>>,
        statuses: Mutex<VecDeque<Result<JobReport, Error>>>,
        status_calls: AtomicU32,
        diagnostic_calls: AtomicU32,
    }

    impl Scripted {
        fn new(job_id: Option<&str>, statuses: Vec<Result<JobReport, Error>>) -> Self {
            Self {
                submit: Mutex::new(Some(Ok(Submission {
                    job_id: job_id.map(str::to_owned),
                }))),
                statuses: Mutex::new(statuses.into()),
                status_calls: AtomicU32::new(0),
                diagnostic_calls: AtomicU32::new(0),
            }
        }
    }

    impl JobStatusSource for Scripted {
        async fn job_status(&self, _job_id: &str) -> Result<JobReport, Error> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(JobReport::running(None)))
        }

        async fn job_diagnostics(&self, _job_id: &str) -> Result<Option<String>, Error> {
            self.diagnostic_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some("template is locked".into()))
        }
    }

    impl JobSubmitter for Scripted {
        type Operation = ();

        async fn submit_job(&self, _op: &()) -> Result<Submission, Error> {
            self.submit.lock().unwrap().take().unwrap()
        }
    }

    fn fast() -> JobPoller {
        JobPoller::new(PollConfig::new(Duration::from_millis(1), 20))
    }

    #[tokio::test]
    async fn completes_once_and_stops_polling() {
        let source = Scripted::new(
            Some("42"),
            vec![
                Ok(JobReport::running(Some(10))),
                Ok(JobReport::running(Some(60))),
                Ok(JobReport::complete()),
                Ok(JobReport::failed(None)),
            ],
        );
        let mut seen = Vec::new();
        let outcome = fast()
            .submit_and_await(&source, &(), |s| seen.push(s.clone()))
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 3);
        assert_eq!(source.status_calls.load(Ordering::SeqCst), 3);
        assert_eq!(seen.iter().filter(|s| s.is_terminal()).count(), 1);
        assert_eq!(seen.last(), Some(&JobState::Complete));
        assert_eq!(
            seen[2],
            JobState::Polling {
                attempt: 2,
                percentage: Some(60)
            }
        );
    }

    #[tokio::test]
    async fn failure_fetches_diagnostics_exactly_once() {
        let source = Scripted::new(
            Some("7"),
            vec![
                Ok(JobReport::running(None)),
                Ok(JobReport::failed(Some("FAILED".into()))),
            ],
        );
        let err = fast()
            .submit_and_await(&source, &(), |_| {})
            .await
            .unwrap_err();

        assert_eq!(source.diagnostic_calls.load(Ordering::SeqCst), 1);
        match err {
            Error::JobFailed { job_id, message } => {
                assert_eq!(job_id, "7");
                assert_eq!(message, "template is locked");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreadable_status_counts_as_failure() {
        let source = Scripted::new(
            Some("7"),
            vec![Err(Error::Relay("connection reset".into()))],
        );
        let err = fast().await_job(&source, "7", |_| {}).await.unwrap_err();
        assert!(matches!(err, Error::JobFailed { .. }));
        assert_eq!(source.diagnostic_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_job_id_is_synchronous_success() {
        let source = Scripted::new(None, vec![]);
        let mut seen = Vec::new();
        let outcome = fast()
            .submit_and_await(&source, &(), |s| seen.push(s.clone()))
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 0);
        assert_eq!(source.status_calls.load(Ordering::SeqCst), 0);
        assert_eq!(seen, vec![JobState::Submitted { job_id: None }, JobState::Complete]);
    }

    #[tokio::test]
    async fn rejected_submit_goes_straight_to_error() {
        let source = Scripted::new(None, vec![]);
        *source.submit.lock().unwrap() = Some(Err(Error::Idc {
            service: "SCS_COPY_SITES".into(),
            message: "site exists".into(),
        }));
        let mut seen = Vec::new();
        let err = fast()
            .submit_and_await(&source, &(), |s| seen.push(s.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Idc { .. }));
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], JobState::Error { .. }));
    }

    #[tokio::test]
    async fn exhausted_budget_is_a_timeout() {
        let source = Scripted::new(Some("9"), vec![]);
        let poller = JobPoller::new(PollConfig::new(Duration::from_millis(1), 3));
        let err = poller.await_job(&source, "9", |_| {}).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(source.status_calls.load(Ordering::SeqCst), 3);
        assert_eq!(source.diagnostic_calls.load(Ordering::SeqCst), 0);
    }
}
