//! Poll loop
//!
//! Drives a [`SerialPollSession`] on a fixed cadence from async code. The
//! session itself is blocking and never retries, so this is where retry policy
//! and read deadlines live.
//!
//! Each read runs on the blocking thread pool and is raced against a deadline.
//! A read that misses its deadline is abandoned, not cancelled: it keeps the
//! session lock until the link returns, which serializes it ahead of the next
//! attempt.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::protocol::{Reading, SerialPollSession, SessionFault};

/// Shortest interval `Poller::run` will tick at
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Session shared between the poller and whoever else needs it
pub type SharedSession = Arc<Mutex<SerialPollSession>>;

/// Poll loop configuration
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Time between samples
    pub interval: Duration,
    /// Extra attempts per sample after a transient fault
    pub max_retries: u32,
    /// Pause before a retry
    pub retry_delay: Duration,
    /// Abandon a read that has not returned after this long
    pub deadline: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        crate::config::PollSettings::default().poll_config()
    }
}

/// Reasons a poll attempt produced no reading
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    /// The session read failed
    #[error(transparent)]
    Session(#[from] SessionFault),

    /// The read did not return before the deadline
    #[error("Read abandoned after {0:?}")]
    DeadlineExceeded(Duration),

    /// The blocking task panicked or was cancelled
    #[error("Read worker failed: {0}")]
    Worker(String),
}

impl PollError {
    fn is_retryable(&self) -> bool {
        match self {
            PollError::Session(fault) => fault.is_transient(),
            PollError::DeadlineExceeded(_) => true,
            PollError::Worker(_) => false,
        }
    }
}

/// Outcome of one scheduled sample
#[derive(Debug, Clone)]
pub struct Sample {
    /// When the sample finished
    pub taken_at: DateTime<Utc>,
    /// Reads it took, including the final one
    pub attempts: u32,
    /// Reading, or the fault of the last attempt
    pub outcome: Result<Reading, PollError>,
}

/// Run one blocking session read on the blocking pool, giving up after `deadline`
pub async fn read_with_deadline(
    session: &SharedSession,
    deadline: Duration,
) -> Result<Reading, PollError> {
    let session = Arc::clone(session);
    let task = tokio::task::spawn_blocking(move || {
        // A panic elsewhere cannot leave the session half-updated; keep using it
        let mut guard = session.lock().unwrap_or_else(|e| e.into_inner());
        guard.read()
    });

    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(result)) => result.map_err(PollError::from),
        Ok(Err(join_err)) => Err(PollError::Worker(join_err.to_string())),
        Err(_) => Err(PollError::DeadlineExceeded(deadline)),
    }
}

/// Scheduled sampler over one particulate session
pub struct Poller {
    session: SharedSession,
    config: PollConfig,
}

impl Poller {
    /// Create a poller that takes ownership of `session`
    pub fn new(session: SerialPollSession, config: PollConfig) -> Self {
        Self::shared(Arc::new(Mutex::new(session)), config)
    }

    /// Create a poller over an already-shared session
    pub fn shared(session: SharedSession, config: PollConfig) -> Self {
        Self { session, config }
    }

    /// Handle to the underlying session (e.g. for stats)
    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.session)
    }

    /// Take one sample, retrying transient faults up to the configured budget
    pub async fn sample(&self) -> Sample {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let outcome = read_with_deadline(&self.session, self.config.deadline).await;

            let give_up = match &outcome {
                Ok(_) => true,
                Err(err) => !err.is_retryable() || attempts > self.config.max_retries,
            };
            if give_up {
                return Sample {
                    taken_at: Utc::now(),
                    attempts,
                    outcome,
                };
            }

            if let Err(err) = &outcome {
                debug!(attempt = attempts, error = %err, "Retrying particulate read");
            }
            tokio::time::sleep(self.config.retry_delay).await;
        }
    }

    /// Sample on the configured interval and send results to `tx` until
    /// `cancel` fires or the receiver goes away
    pub async fn run(self, tx: mpsc::Sender<Sample>, cancel: CancellationToken) {
        // tokio rejects a zero period
        let period = self.config.interval.max(MIN_INTERVAL);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_ms = period.as_millis() as u64,
            max_retries = self.config.max_retries,
            "Particulate poller started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let sample = tokio::select! {
                _ = cancel.cancelled() => break,
                sample = self.sample() => sample,
            };

            match &sample.outcome {
                Ok(reading) => debug!(
                    pm25 = reading.pm25(),
                    pm10 = reading.pm10(),
                    attempts = sample.attempts,
                    "Particulate sample"
                ),
                Err(err) => warn!(error = %err, attempts = sample.attempts, "Particulate sample failed"),
            }

            let sent = tokio::select! {
                _ = cancel.cancelled() => break,
                sent = tx.send(sample) => sent,
            };
            if sent.is_err() {
                debug!("Sample receiver dropped");
                break;
            }
        }

        info!("Particulate poller stopped");
    }
}
