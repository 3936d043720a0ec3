//! Game façades: the variant-specific vocabulary layered on the shared session engine.

pub mod board;
pub mod chain;
pub mod puzzle;
pub mod spell;

pub use board::{Board, Piece};
pub use chain::ChainGame;
pub use puzzle::PuzzleGame;
pub use spell::SpellGame;

use crate::api::{ApiError, ApiResult};
use crate::session::Session;
use crate::submitter::Submitter;
use crate::types::{CallKind, IntentError, Pending, Phase, Ticket};
use futures::future::BoxFuture;
use serde::Serialize;
use std::fmt;

/// Message shown when a call fails in transit. The server said nothing, so
/// this text is never treated as authoritative.
pub const TRANSIENT_FAILURE_MESSAGE: &str = "Could not reach the game server. Please try again.";

/// A game variant. Implemented by each façade, which owns its session and submitter.
pub trait Game: Sized + Send + 'static {
    const NAME: &'static str;

    type Mode: Clone + fmt::Debug + Send;
    type Prompt: Clone + fmt::Debug + Send + Serialize;
    type Turn: Clone + fmt::Debug + Send + Serialize;
    type Reply: fmt::Debug + Send + 'static;

    fn session(&self) -> &Session<Self>;

    fn session_mut(&mut self) -> &mut Session<Self>;

    fn submitter(&self) -> &Submitter<Self>;

    fn submitter_mut(&mut self) -> &mut Submitter<Self>;

    /// Local reason used when the turn timer runs out before the server says otherwise
    fn forfeit_reason(session: &Session<Self>) -> String;

    /// Translate an authoritative reply into a session transition
    fn on_reply(&mut self, ticket: Ticket, call: CallKind, reply: Self::Reply);

    /// A call failed in transit. The move is treated as never having happened.
    fn on_failure(&mut self, ticket: Ticket, call: CallKind, error: ApiError) {
        tracing::warn!("{} {:?} call failed: {}", Self::NAME, call, error);
        if call == CallKind::TimeUp {
            // The fallback reason stays in place.
            return;
        }
        self.session_mut()
            .apply_failure(&ticket, TRANSIENT_FAILURE_MESSAGE);
    }

    /// Called once after the turn timer forfeited the session
    fn on_expired(&mut self) {}

    /// Variant state published alongside the session snapshot
    fn extras(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Leaving the screen: discard the session so late replies are dropped
    fn leave(&mut self) {
        self.submitter_mut().abandon();
        self.session_mut().reset();
    }
}

/// Leave `AwaitingMove` and put one call in flight.
///
/// The busy flag is checked before the session is touched, so a rejected
/// intent leaves no trace.
pub(crate) fn send<G, F>(
    game: &mut G,
    pending: Pending,
    call: CallKind,
    request: F,
) -> Result<Ticket, IntentError>
where
    G: Game,
    F: FnOnce() -> BoxFuture<'static, ApiResult<G::Reply>>,
{
    game.submitter_mut().ensure_idle()?;
    let ticket = game.session_mut().start_move(pending)?;
    game.submitter_mut()
        .dispatch(ticket.clone(), call, request());
    Ok(ticket)
}

/// Begin a session and put its start call in flight
pub(crate) fn open<G, F>(game: &mut G, mode: G::Mode, request: F) -> Result<Ticket, IntentError>
where
    G: Game,
    F: FnOnce() -> BoxFuture<'static, ApiResult<G::Reply>>,
{
    game.submitter_mut().ensure_idle()?;
    let ticket = game.session_mut().begin(mode)?;
    game.submitter_mut()
        .dispatch(ticket.clone(), CallKind::Start, request());
    Ok(ticket)
}

/// Restarting is a begin: refuse while a start is already in flight
pub(crate) fn guard_restart<G: Game>(game: &G) -> Result<(), IntentError> {
    if game.session().phase() == Phase::Submitting(Pending::Start) {
        return Err(IntentError::Busy);
    }
    Ok(())
}

/// Trimmed move text, or `EmptyMove`
pub(crate) fn non_empty(text: &str) -> Result<String, IntentError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(IntentError::EmptyMove)
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  사과 "), Ok("사과".to_string()));
        assert_eq!(non_empty("   "), Err(IntentError::EmptyMove));
        assert_eq!(non_empty(""), Err(IntentError::EmptyMove));
    }
}
