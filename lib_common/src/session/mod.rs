//! # Broadcast Session
//!
//! One `ReplaySession::run` call serves one consumer from start to finish:
//!
//! 1. `info` acknowledgement, before any data is touched;
//! 2. race archive load and driver stream construction;
//! 3. one `prediction` record, or an `error` record if the predictor fails;
//! 4. the interleaved `telemetry` records, one per sample, each followed by
//!    a short pacing delay.
//!
//! Records go into a bounded channel whose receiver belongs to the transport.
//! Every wait (blocking loads, a full channel, the pacing delay) races against
//! the session's `CancellationToken`, so a disconnect or shutdown stops the
//! loop at the next await. Each record is built completely before it is
//! offered to the channel.
//!
//! Sessions share nothing mutable; all race state lives inside the session's
//! own `Interleaver` and is dropped with it.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::feeds::{build_driver_streams, FeedError, RaceDataSource, SessionKey, StreamSet};
use crate::prediction::{LapTimePredictor, PredictionError};
use crate::replay::{InterleaveMode, Interleaver, PredictionSet, ServerMessage};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session data unavailable: {0}")]
    UpstreamData(#[from] FeedError),

    #[error("prediction failed: {0}")]
    Prediction(#[from] PredictionError),

    #[error("background load failed: {0}")]
    Task(#[from] JoinError),

    #[error("consumer went away after {records} records")]
    TransportFailure { records: usize },
}

impl SessionError {
    /// True for failures of the data or prediction collaborators; these are
    /// reported to the consumer and the session carries on.
    pub fn is_upstream(&self) -> bool {
        !matches!(self, SessionError::TransportFailure { .. })
    }
}

/// What to replay and how fast.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub race: SessionKey,
    pub pacing: Duration,
    pub mode: InterleaveMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionOutcome {
    /// Every stream was replayed to the end.
    #[default]
    Drained,
    /// The race archive could not be loaded; an error record was sent.
    NoData,
    /// The session token was cancelled.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSummary {
    pub drivers: usize,
    pub excluded: usize,
    pub telemetry_records: usize,
    pub prediction_sent: bool,
    pub outcome: SessionOutcome,
}

/// Why the record loop stopped early.
enum Halt {
    Cancelled,
    Disconnected,
}

struct Outbound {
    tx: mpsc::Sender<ServerMessage>,
    cancel: CancellationToken,
}

impl Outbound {
    async fn send(&self, message: ServerMessage) -> Result<(), Halt> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Halt::Cancelled),
            sent = self.tx.send(message) => sent.map_err(|_| Halt::Disconnected),
        }
    }

    async fn pace(&self, delay: Duration) -> Result<(), Halt> {
        if delay.is_zero() {
            tokio::task::yield_now().await;
            return if self.cancel.is_cancelled() {
                Err(Halt::Cancelled)
            } else {
                Ok(())
            };
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Halt::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    /// Runs a blocking collaborator call off the runtime, abandoning it on
    /// cancellation.
    async fn blocking<T, E, F>(&self, job: F) -> Result<Result<T, SessionError>, Halt>
    where
        T: Send + 'static,
        E: Into<SessionError> + Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        let handle = tokio::task::spawn_blocking(job);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Halt::Cancelled),
            joined = handle => Ok(match joined {
                Ok(result) => result.map_err(Into::into),
                Err(e) => Err(SessionError::Task(e)),
            }),
        }
    }
}

#[derive(Clone)]
pub struct ReplaySession {
    source: Arc<dyn RaceDataSource>,
    predictor: Arc<dyn LapTimePredictor>,
    plan: SessionPlan,
}

impl ReplaySession {
    pub fn new(
        source: Arc<dyn RaceDataSource>,
        predictor: Arc<dyn LapTimePredictor>,
        plan: SessionPlan,
    ) -> Self {
        Self {
            source,
            predictor,
            plan,
        }
    }

    pub fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    /// Serves one consumer until the streams drain, the token is cancelled or
    /// the receiver is dropped.
    ///
    /// # Errors
    /// Only [`SessionError::TransportFailure`]; collaborator failures are
    /// turned into `error` records.
    pub async fn run(
        &self,
        outbound: mpsc::Sender<ServerMessage>,
        cancel: CancellationToken,
    ) -> Result<SessionSummary, SessionError> {
        let out = Outbound { tx: outbound, cancel };
        let mut summary = SessionSummary::default();

        match self.drive(&out, &mut summary).await {
            Ok(()) => {
                tracing::info!(
                    race = %self.plan.race,
                    records = summary.telemetry_records,
                    outcome = ?summary.outcome,
                    "session finished"
                );
                Ok(summary)
            }
            Err(Halt::Cancelled) => {
                summary.outcome = SessionOutcome::Cancelled;
                tracing::info!(records = summary.telemetry_records, "session cancelled");
                Ok(summary)
            }
            Err(Halt::Disconnected) => {
                tracing::info!(records = summary.telemetry_records, "consumer disconnected");
                Err(SessionError::TransportFailure {
                    records: summary.telemetry_records,
                })
            }
        }
    }

    async fn drive(&self, out: &Outbound, summary: &mut SessionSummary) -> Result<(), Halt> {
        out.send(ServerMessage::connected()).await?;

        let set = match self.load_streams(out).await? {
            Ok(set) => set,
            Err(e) => {
                tracing::error!(race = %self.plan.race, error = %e, "race data pipeline failed");
                out.send(ServerMessage::error(e.to_string())).await?;
                summary.outcome = SessionOutcome::NoData;
                return Ok(());
            }
        };
        summary.drivers = set.streams.len();
        summary.excluded = set.excluded.len();

        match self.load_prediction(out).await? {
            Ok(data) => {
                out.send(ServerMessage::Prediction { data }).await?;
                summary.prediction_sent = true;
            }
            Err(e) => {
                tracing::warn!(error = %e, "lap-time prediction failed");
                out.send(ServerMessage::error(e.to_string())).await?;
            }
        }

        tracing::info!(
            drivers = summary.drivers,
            excluded = summary.excluded,
            samples = set.sample_count(),
            mode = %self.plan.mode,
            "streaming telemetry"
        );

        for record in Interleaver::new(set.streams, self.plan.mode) {
            out.send(ServerMessage::Telemetry(record)).await?;
            summary.telemetry_records += 1;
            out.pace(self.plan.pacing).await?;
        }

        summary.outcome = SessionOutcome::Drained;
        Ok(())
    }

    async fn load_streams(&self, out: &Outbound) -> Result<Result<StreamSet, SessionError>, Halt> {
        let source = Arc::clone(&self.source);
        let race = self.plan.race.clone();
        out.blocking(move || {
            source
                .load_session(&race)
                .map(|archive| build_driver_streams(&archive))
        })
        .await
    }

    async fn load_prediction(&self, out: &Outbound) -> Result<Result<PredictionSet, SessionError>, Halt> {
        let predictor = Arc::clone(&self.predictor);
        out.blocking(move || predictor.predict()).await
    }
}
