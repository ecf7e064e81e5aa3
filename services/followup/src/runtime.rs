//! Async runtime for the follow-up orchestrator.
//!
//! A single task owns the [`FollowUpOrchestrator`] and drains every trigger
//! (session activity changes, event log snapshots, backend completions) one
//! at a time, so the orchestrator's state is never touched concurrently.
//! Backend calls run in their own tasks and report back to the owner, which
//! checks that the session they belong to is still the current one before
//! injecting anything into it.

use crate::{backend::FollowUpBackend, config::Config, sink::EventSink};
use followup_core::{
    Command,
    error::FollowUpError,
    events::SessionEvent,
    exchange::{FollowUpQuestion, FollowUpTicket},
    orchestrator::{FollowUpOrchestrator, OrchestratorStatus},
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        watch,
    },
    task::{JoinHandle, JoinSet},
};
use tracing::{Instrument, debug, error, info, warn};

const DEFAULT_FOLLOW_UP_DELAY: Duration = Duration::from_millis(500);

/// Triggers delivered to the orchestrator task.
#[derive(Debug)]
enum Input {
    SessionActive(String),
    SessionInactive,
    EventLog(Vec<SessionEvent>),
}

/// The result of one backend exchange, tagged with the ticket that issued it.
struct Completion {
    ticket: FollowUpTicket,
    result: Result<FollowUpQuestion, FollowUpError>,
}

/// Cloneable handle used by the host to feed the orchestrator.
#[derive(Clone)]
pub struct OrchestratorHandle {
    tx: mpsc::Sender<Input>,
    status_rx: watch::Receiver<OrchestratorStatus>,
}

impl OrchestratorHandle {
    pub async fn session_became_active(
        &self,
        session_id: impl Into<String>,
    ) -> Result<(), FollowUpError> {
        self.submit(Input::SessionActive(session_id.into())).await
    }

    pub async fn session_became_inactive(&self) -> Result<(), FollowUpError> {
        self.submit(Input::SessionInactive).await
    }

    /// Hands over the full event log as currently known by the transport.
    pub async fn event_log_changed(&self, log: Vec<SessionEvent>) -> Result<(), FollowUpError> {
        self.submit(Input::EventLog(log)).await
    }

    pub fn status(&self) -> OrchestratorStatus {
        self.status_rx.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<OrchestratorStatus> {
        self.status_rx.clone()
    }

    async fn submit(&self, input: Input) -> Result<(), FollowUpError> {
        self.tx
            .send(input)
            .await
            .map_err(|_| FollowUpError::SinkClosed("orchestrator task has stopped".to_string()))
    }
}

/// Builder for the orchestrator task.
pub struct OrchestratorRuntime {
    backend: Arc<dyn FollowUpBackend>,
    sink: Arc<dyn EventSink>,
    follow_up_delay: Duration,
    reports_tx: Option<mpsc::Sender<FollowUpError>>,
}

impl OrchestratorRuntime {
    pub fn new(backend: Arc<dyn FollowUpBackend>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            backend,
            sink,
            follow_up_delay: DEFAULT_FOLLOW_UP_DELAY,
            reports_tx: None,
        }
    }

    pub fn from_config(
        config: &Config,
        backend: Arc<dyn FollowUpBackend>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self::new(backend, sink).with_delay(config.follow_up_delay)
    }

    /// Sets the pause between a backend answer and the instruction injection.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.follow_up_delay = delay;
        self
    }

    /// Errors that are not stale completions are forwarded to `reports_tx`.
    pub fn with_reports(mut self, reports_tx: mpsc::Sender<FollowUpError>) -> Self {
        self.reports_tx = Some(reports_tx);
        self
    }

    /// Spawns the orchestrator task.
    ///
    /// The task runs until every [`OrchestratorHandle`] has been dropped and all
    /// in-flight backend exchanges have finished.
    pub fn spawn(self) -> (OrchestratorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(64);
        let (status_tx, status_rx) = watch::channel(OrchestratorStatus::Inactive);
        let span = tracing::info_span!("followup_orchestrator");
        let handle = tokio::spawn(self.run(rx, status_tx).instrument(span));
        (OrchestratorHandle { tx, status_rx }, handle)
    }

    async fn run(
        self,
        mut rx: mpsc::Receiver<Input>,
        status_tx: watch::Sender<OrchestratorStatus>,
    ) {
        let mut orchestrator = FollowUpOrchestrator::new();
        let mut in_flight: JoinSet<Completion> = JoinSet::new();

        loop {
            tokio::select! {
                Some(input) = rx.recv() => match input {
                    Input::SessionActive(session_id) => {
                        orchestrator.on_session_became_active(session_id);
                    }
                    Input::SessionInactive => {
                        orchestrator.on_session_became_inactive();
                        if !in_flight.is_empty() {
                            debug!(
                                pending = in_flight.len(),
                                "Backend requests in flight will be discarded"
                            );
                        }
                    }
                    Input::EventLog(log) => {
                        let outcome = orchestrator.on_event_log_changed(&log);
                        for command in outcome.commands {
                            self.execute(command, &mut in_flight).await;
                        }
                        for e in outcome.errors {
                            self.report(e);
                        }
                    }
                },
                Some(joined) = in_flight.join_next() => match joined {
                    Ok(Completion { ticket, result }) => {
                        let applied = match result {
                            Ok(question) => orchestrator.on_follow_up_received(&ticket, question),
                            Err(e) => Err(orchestrator.on_follow_up_failed(&ticket, e)),
                        };
                        match applied {
                            Ok(command) => self.execute(command, &mut in_flight).await,
                            Err(e) if e.is_stale() => {
                                debug!(
                                    call_id = ?ticket.call_id,
                                    "Discarding follow-up for an ended session"
                                );
                            }
                            Err(e) => self.report(e),
                        }
                    }
                    Err(e) => error!(error = ?e, "Follow-up task failed"),
                },
                else => break,
            }
            status_tx.send_replace(orchestrator.status());
        }

        info!("Follow-up orchestrator finished.");
    }

    async fn execute(&self, command: Command, in_flight: &mut JoinSet<Completion>) {
        match command {
            Command::Emit(event) => {
                if let Err(e) = self.sink.send(event).await {
                    self.report(e);
                }
            }
            Command::RequestFollowUp { ticket, request } => {
                let backend = self.backend.clone();
                let delay = self.follow_up_delay;
                in_flight.spawn(
                    async move {
                        let result = backend.handle_answer(&request).await;
                        if result.is_ok() {
                            // Re-issuing an instruction immediately can race the
                            // session's own handling of the turn that just ended.
                            tokio::time::sleep(delay).await;
                        }
                        Completion { ticket, result }
                    }
                    .in_current_span(),
                );
            }
        }
    }

    /// Never waits on the observer: a full or closed report channel drops
    /// the report instead of stalling the loop.
    fn report(&self, e: FollowUpError) {
        warn!(error = %e, "Follow-up step failed");
        if let Some(tx) = &self.reports_tx {
            match tx.try_send(e) {
                Ok(()) => {}
                Err(TrySendError::Full(e)) => {
                    warn!(error = %e, "Report channel full. Dropping follow-up error report.");
                }
                Err(TrySendError::Closed(_)) => {
                    warn!("Failed to report follow-up error: receiver dropped.");
                }
            }
        }
    }
}
