//! At most one outstanding network call per session.
//!
//! Calls are spawned onto the runtime; their completion comes back into the
//! event loop as `Event::Reply` and is matched against the busy flag there.

use crate::api::ApiResult;
use crate::driver::Event;
use crate::games::Game;
use crate::types::{CallKind, IntentError, Ticket};
use futures::future::BoxFuture;
use tokio::sync::mpsc;

pub struct Submitter<G: Game> {
    in_flight: Option<(Ticket, CallKind)>,
    events: mpsc::UnboundedSender<Event<G>>,
}

impl<G: Game> Submitter<G> {
    pub fn new(events: mpsc::UnboundedSender<Event<G>>) -> Self {
        Self {
            in_flight: None,
            events,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<CallKind> {
        self.in_flight.as_ref().map(|(_, call)| *call)
    }

    /// Reject synchronously when a call is still outstanding
    pub fn ensure_idle(&self) -> Result<(), IntentError> {
        match &self.in_flight {
            Some((ticket, call)) => {
                tracing::debug!(
                    "{}: rejecting new request, {:?} #{} still in flight",
                    G::NAME,
                    call,
                    ticket.turn
                );
                Err(IntentError::Busy)
            }
            None => Ok(()),
        }
    }

    /// Spawn `request` and mark the submitter busy until its reply is released.
    /// Callers check `ensure_idle` before mutating the session.
    pub fn dispatch(
        &mut self,
        ticket: Ticket,
        call: CallKind,
        request: BoxFuture<'static, ApiResult<G::Reply>>,
    ) {
        debug_assert!(self.in_flight.is_none(), "dispatch while busy");
        tracing::debug!("{}: dispatching {:?} #{}", G::NAME, call, ticket.turn);

        self.in_flight = Some((ticket.clone(), call));
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = request.await;
            if events
                .send(Event::Reply {
                    ticket,
                    call,
                    result,
                })
                .is_err()
            {
                tracing::debug!("Event loop closed, discarding {:?} reply", call);
            }
        });
    }

    /// Clear the busy flag if `ticket` is the outstanding call
    pub fn release(&mut self, ticket: &Ticket) -> bool {
        match &self.in_flight {
            Some((current, _)) if current == ticket => {
                self.in_flight = None;
                true
            }
            _ => false,
        }
    }

    /// Forget the outstanding call; its reply will be dropped as stale
    pub fn abandon(&mut self) {
        if let Some((ticket, call)) = self.in_flight.take() {
            tracing::debug!(
                "{}: abandoning {:?} for session {}",
                G::NAME,
                call,
                ticket.session
            );
        }
    }
}
