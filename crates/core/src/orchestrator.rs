//! Follow-up Orchestrator
//!
//! This module implements the state machine that bridges `handle_user_answer`
//! tool calls made by a realtime agent to the question backend and back. It
//! performs no I/O: every side effect is returned as a [`Command`] for the
//! runtime to execute, and every backend result is handed back in through
//! [`FollowUpOrchestrator::on_follow_up_received`] or
//! [`FollowUpOrchestrator::on_follow_up_failed`].
//!
//! The session transport delivers its event log as a full snapshot on every
//! change. The orchestrator remembers how much of the log it has already seen
//! and only looks at the unseen suffix.

use crate::{
    Command,
    error::FollowUpError,
    events::SessionEvent,
    exchange::{FollowUpQuestion, FollowUpRequest, FollowUpTicket, ToolCallPayload},
    tool::{self, HANDLE_USER_ANSWER},
};
use std::{collections::HashSet, fmt};
use tracing::{debug, info, warn};

// --- Orchestrator State ---

/// Per-session bookkeeping. Reset whenever the session becomes inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestratorState {
    /// Whether the tool registration has been sent for this session.
    pub registered: bool,
    /// Length of the event log that has already been processed.
    pub processed_count: usize,
    pub last_answer: Option<ToolCallPayload>,
    pub last_question: Option<String>,
    /// Ids of tool calls already forwarded to the backend.
    pub handled_calls: HashSet<String>,
}

/// What a host UI shows for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorStatus {
    Inactive,
    WaitingForAnswer,
    LastAnswer(String),
}

impl fmt::Display for OrchestratorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorStatus::Inactive => write!(f, "Start the session to use this tool..."),
            OrchestratorStatus::WaitingForAnswer => write!(f, "Waiting for user answer..."),
            OrchestratorStatus::LastAnswer(answer) => write!(f, "Last answer: {answer}"),
        }
    }
}

/// The result of processing one event log snapshot.
#[derive(Debug, Default)]
pub struct Outcome {
    pub commands: Vec<Command>,
    /// Events that were skipped, in log order.
    pub errors: Vec<FollowUpError>,
}

// --- Orchestrator ---

#[derive(Debug, Default)]
pub struct FollowUpOrchestrator {
    state: OrchestratorState,
    session_id: Option<String>,
    active: bool,
    /// Bumped on every deactivation; tickets from older generations are stale.
    generation: u64,
}

impl FollowUpOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> OrchestratorStatus {
        match (self.active, &self.state.last_answer) {
            (false, _) => OrchestratorStatus::Inactive,
            (true, None) => OrchestratorStatus::WaitingForAnswer,
            (true, Some(payload)) => OrchestratorStatus::LastAnswer(payload.user_answer.clone()),
        }
    }

    /// Marks the session active and records the id used to correlate backend
    /// requests.
    ///
    /// Registration is not sent here. It waits for `session.created`, which the
    /// transport guarantees precedes any tool-call traffic.
    pub fn on_session_became_active(&mut self, session_id: impl Into<String>) {
        let session_id = session_id.into();
        info!(%session_id, generation = self.generation, "Session became active");
        self.session_id = Some(session_id);
        self.active = true;
    }

    /// Resets all per-session state and invalidates in-flight backend requests.
    pub fn on_session_became_inactive(&mut self) {
        info!(generation = self.generation, "Session became inactive. Resetting state.");
        self.state = OrchestratorState::default();
        self.session_id = None;
        self.active = false;
        self.generation += 1;
    }

    /// Processes the unseen suffix of the session's event log.
    pub fn on_event_log_changed(&mut self, log: &[SessionEvent]) -> Outcome {
        let mut outcome = Outcome::default();
        if !self.active {
            debug!(len = log.len(), "Ignoring event log while the session is inactive");
            return outcome;
        }

        if log.len() < self.state.processed_count {
            warn!(
                len = log.len(),
                processed = self.state.processed_count,
                "Event log shrank. Reprocessing it from the start."
            );
            self.state.processed_count = 0;
        }

        for event in &log[self.state.processed_count..] {
            self.process_event(event, &mut outcome);
        }
        self.state.processed_count = log.len();
        outcome
    }

    fn process_event(&mut self, event: &SessionEvent, outcome: &mut Outcome) {
        if let SessionEvent::SessionCreated { .. } = event {
            if self.state.registered {
                debug!("Ignoring repeated session.created");
            } else {
                info!("Registering tool '{}'", HANDLE_USER_ANSWER);
                outcome.commands.push(Command::Emit(tool::registration_event()));
                self.state.registered = true;
            }
            return;
        }

        for call in event.function_calls() {
            if call.name != HANDLE_USER_ANSWER {
                debug!(name = call.name, "Ignoring call to another tool");
                continue;
            }
            if let Some(call_id) = call.call_id {
                if !self.state.handled_calls.insert(call_id.to_string()) {
                    debug!(call_id, "Tool call already handled");
                    continue;
                }
            }

            match self.request_follow_up(call.call_id, call.arguments) {
                Ok(command) => outcome.commands.push(command),
                Err(e) => {
                    warn!(call_id = ?call.call_id, error = %e, "Skipping tool call");
                    outcome.errors.push(e);
                }
            }
        }
    }

    fn request_follow_up(
        &mut self,
        call_id: Option<&str>,
        arguments: &str,
    ) -> Result<Command, FollowUpError> {
        let payload = ToolCallPayload::parse(arguments)?;
        self.state.last_answer = Some(payload.clone());

        let session_id = self
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(FollowUpError::MissingSessionId)?;
        if let Some(embedded) = payload.session_id.as_deref() {
            if embedded != session_id {
                warn!(
                    %session_id,
                    embedded,
                    "Tool call carried a different session id. Using the session's own."
                );
            }
        }

        info!(
            call_id = ?call_id,
            user_answer = %payload.user_answer,
            "Requesting follow-up question"
        );
        Ok(Command::RequestFollowUp {
            ticket: FollowUpTicket {
                generation: self.generation,
                call_id: call_id.map(str::to_string),
            },
            request: FollowUpRequest {
                session_id: session_id.to_string(),
                user_answer: payload.user_answer,
            },
        })
    }

    fn ensure_current(&self, ticket: &FollowUpTicket) -> Result<(), FollowUpError> {
        if self.active && ticket.generation == self.generation {
            Ok(())
        } else {
            Err(FollowUpError::StaleCompletion {
                generation: ticket.generation,
            })
        }
    }

    /// Applies a backend answer, producing the instruction to inject.
    pub fn on_follow_up_received(
        &mut self,
        ticket: &FollowUpTicket,
        question: FollowUpQuestion,
    ) -> Result<Command, FollowUpError> {
        self.ensure_current(ticket)?;
        info!(
            call_id = ?ticket.call_id,
            question = %question.question,
            "Injecting follow-up question"
        );
        let event = tool::instruction_event(&question.question);
        self.state.last_question = Some(question.question);
        Ok(Command::Emit(event))
    }

    /// Applies a backend failure. Returns the error to surface, which is
    /// `StaleCompletion` if the session has moved on in the meantime.
    pub fn on_follow_up_failed(
        &mut self,
        ticket: &FollowUpTicket,
        error: FollowUpError,
    ) -> FollowUpError {
        match self.ensure_current(ticket) {
            Ok(()) => error,
            Err(stale) => stale,
        }
    }
}
