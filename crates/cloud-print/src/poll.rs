//! Job completion polling
//!
//! After submission the provider processes the job asynchronously. The job
//! history is polled a bounded number of times:
//!
//! ```text
//! PENDING --DONE--> DONE
//!    |  \--ERROR or no status--> ERROR
//!    \--attempts exhausted--> TIMEOUT
//! ```

use std::time::Duration;

use crate::api::JobStatus;
use crate::constants::{
    DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INITIAL_DELAY_MS, DEFAULT_POLL_INTERVAL_MS,
};

const STATUS_DONE: &str = "DONE";
const STATUS_ERROR: &str = "ERROR";

/// Where a submitted job stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Done,
    Error,
    /// Never confirmed within the polling budget. The job may still print.
    Timeout,
}

/// Timing of the completion poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait after submission before polling starts.
    pub initial_delay: Duration,
    /// Wait before each poll.
    pub interval: Duration,
    pub attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(DEFAULT_POLL_INITIAL_DELAY_MS),
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }
}

/// Polling state of one submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSubmissionAttempt {
    job_id: String,
    attempts_remaining: u32,
    state: JobState,
}

impl JobSubmissionAttempt {
    pub fn new(job_id: impl Into<String>, attempts: u32) -> Self {
        let state = if attempts == 0 {
            JobState::Timeout
        } else {
            JobState::Pending
        };
        Self {
            job_id: job_id.into(),
            attempts_remaining: attempts,
            state,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.attempts_remaining
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// State implied by one snapshot of the job history.
    fn classify(&self, history: &[JobStatus]) -> JobState {
        let Some(job) = history.iter().find(|job| job.id == self.job_id) else {
            return JobState::Pending;
        };
        match job.status.as_deref() {
            None | Some(STATUS_ERROR) => JobState::Error,
            Some(STATUS_DONE) => JobState::Done,
            Some(_) => JobState::Pending,
        }
    }

    /// Consume one attempt with a fresh job history and return the new
    /// state. Terminal states are sticky.
    pub fn observe(&mut self, history: &[JobStatus]) -> JobState {
        if self.state != JobState::Pending {
            return self.state;
        }
        self.attempts_remaining = self.attempts_remaining.saturating_sub(1);
        self.state = match self.classify(history) {
            JobState::Pending if self.attempts_remaining == 0 => JobState::Timeout,
            state => state,
        };
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str, status: Option<&str>) -> JobStatus {
        JobStatus {
            id: id.into(),
            status: status.map(str::to_owned),
        }
    }

    #[test]
    fn default_policy_waits_one_second_and_polls_29_times() {
        let policy = PollPolicy::default();
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.attempts, 29);
    }

    #[test]
    fn absent_job_stays_pending() {
        let mut attempt = JobSubmissionAttempt::new("j1", 3);
        assert_eq!(attempt.observe(&[job("other", Some("DONE"))]), JobState::Pending);
        assert_eq!(attempt.attempts_remaining(), 2);
    }

    #[test]
    fn in_progress_job_stays_pending() {
        let mut attempt = JobSubmissionAttempt::new("j1", 3);
        assert_eq!(attempt.observe(&[job("j1", Some("IN_PROGRESS"))]), JobState::Pending);
        assert_eq!(attempt.observe(&[job("j1", Some("QUEUED"))]), JobState::Pending);
    }

    #[test]
    fn done_job_is_done() {
        let mut attempt = JobSubmissionAttempt::new("j1", 3);
        assert_eq!(attempt.observe(&[job("j1", Some("DONE"))]), JobState::Done);
    }

    #[test]
    fn error_or_missing_status_is_error() {
        let mut errored = JobSubmissionAttempt::new("j1", 3);
        assert_eq!(errored.observe(&[job("j1", Some("ERROR"))]), JobState::Error);

        let mut unknown = JobSubmissionAttempt::new("j1", 3);
        assert_eq!(unknown.observe(&[job("j1", None)]), JobState::Error);
    }

    #[test]
    fn last_pending_attempt_times_out() {
        let mut attempt = JobSubmissionAttempt::new("j1", 2);
        assert_eq!(attempt.observe(&[]), JobState::Pending);
        assert_eq!(attempt.observe(&[]), JobState::Timeout);
        assert_eq!(attempt.attempts_remaining(), 0);
    }

    #[test]
    fn done_on_last_attempt_is_not_a_timeout() {
        let mut attempt = JobSubmissionAttempt::new("j1", 1);
        assert_eq!(attempt.observe(&[job("j1", Some("DONE"))]), JobState::Done);
    }

    #[test]
    fn terminal_states_are_sticky() {
        let mut attempt = JobSubmissionAttempt::new("j1", 5);
        attempt.observe(&[job("j1", Some("DONE"))]);
        assert_eq!(attempt.observe(&[job("j1", Some("ERROR"))]), JobState::Done);
        assert_eq!(attempt.attempts_remaining(), 4);
    }

    #[test]
    fn zero_attempts_start_timed_out() {
        assert_eq!(JobSubmissionAttempt::new("j1", 0).state(), JobState::Timeout);
    }
}
