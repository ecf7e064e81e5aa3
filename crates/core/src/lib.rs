pub mod error;
pub mod events;
pub mod exchange;
pub mod orchestrator;
pub mod tool;

use events::ClientEvent;
use exchange::{FollowUpRequest, FollowUpTicket};

/// Represents commands that the orchestrator issues to an external runtime.
///
/// This enum is the primary API for decoupling the orchestrator's decisions
/// from the runtime's execution of side effects (sending events into the
/// realtime session, calling the question backend).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Send the given client event into the realtime session.
    Emit(ClientEvent),
    /// Ask the backend for the next question. The ticket must be handed back
    /// with the result so late completions can be recognised.
    RequestFollowUp {
        ticket: FollowUpTicket,
        request: FollowUpRequest,
    },
}
