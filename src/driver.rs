//! The event loop that owns one game.
//!
//! Intents, clock ticks and API replies are all handled here, one at a time.
//! After each of them the Clock is brought in line with the session timer and
//! a fresh snapshot is broadcast.

use crate::api::ApiResult;
use crate::clock::Clock;
use crate::games::Game;
use crate::protocol::{SessionView, UiMessage};
use crate::session::TickOutcome;
use crate::submitter::Submitter;
use crate::types::{CallKind, IntentError, Phase, Ticket};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Messages delivered into the loop
pub enum Event<G: Game> {
    Tick {
        generation: u64,
    },
    Reply {
        ticket: Ticket,
        call: CallKind,
        result: ApiResult<G::Reply>,
    },
}

pub struct GameDriver<G: Game> {
    game: G,
    events_tx: mpsc::UnboundedSender<Event<G>>,
    events_rx: mpsc::UnboundedReceiver<Event<G>>,
    clock: Clock,
    updates: broadcast::Sender<UiMessage>,
    seq: u64,
}

impl<G: Game> GameDriver<G> {
    /// Build the game around a submitter wired to this loop
    pub fn new<F>(tick: Duration, build: F) -> Self
    where
        F: FnOnce(Submitter<G>) -> G,
    {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let game = build(Submitter::new(events_tx.clone()));
        let (updates, _) = broadcast::channel(64);

        Self {
            game,
            events_tx,
            events_rx,
            clock: Clock::new(tick),
            updates,
            seq: 0,
        }
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiMessage> {
        self.updates.subscribe()
    }

    /// Run a user intent against the game.
    ///
    /// A refused intent is published as `Rejected` and leaves the session as it was.
    pub fn act<T, F>(&mut self, action: &str, intent: F) -> Result<T, IntentError>
    where
        F: FnOnce(&mut G) -> Result<T, IntentError>,
    {
        let result = intent(&mut self.game);
        match &result {
            Ok(_) => {
                self.sync_clock();
                self.publish();
            }
            Err(e) => {
                tracing::debug!("{}: {} refused: {}", G::NAME, action, e);
                let _ = self.updates.send(UiMessage::Rejected {
                    action: action.to_string(),
                    error: e.to_string(),
                });
            }
        }
        result
    }

    /// Apply one event from the queue
    pub fn handle(&mut self, event: Event<G>) {
        match event {
            Event::Tick { generation } => {
                if !self.clock.is_running() || generation != self.clock.generation() {
                    tracing::debug!("{}: ignoring tick from clock generation {}", G::NAME, generation);
                    return;
                }
                if self.game.session_mut().tick() == TickOutcome::Expired {
                    tracing::info!("{} session {}: turn timer expired", G::NAME, self.game.session().key());
                    self.game.on_expired();
                }
            }
            Event::Reply {
                ticket,
                call,
                result,
            } => {
                if !self.game.submitter_mut().release(&ticket) {
                    tracing::debug!(
                        "{}: discarding {:?} reply for abandoned call {}#{}",
                        G::NAME,
                        call,
                        ticket.session,
                        ticket.turn
                    );
                    return;
                }
                match result {
                    Ok(reply) => self.game.on_reply(ticket, call, reply),
                    Err(error) => self.game.on_failure(ticket, call, error),
                }
            }
        }

        self.sync_clock();
        self.publish();
    }

    /// Wait for the next event. Never yields `None` while the driver is alive.
    pub async fn next_event(&mut self) -> Option<Event<G>> {
        self.events_rx.recv().await
    }

    /// Handle exactly one event
    pub async fn step(&mut self) {
        if let Some(event) = self.next_event().await {
            self.handle(event);
        }
    }

    /// Handle events until no call is outstanding
    pub async fn settle(&mut self) {
        while self.game.submitter().is_busy() {
            self.step().await;
        }
    }

    /// Handle events until the session is over (or idle again after a failed start)
    pub async fn run_until_over(&mut self) {
        loop {
            let phase = self.game.session().phase();
            if matches!(phase, Phase::Over | Phase::Idle) && !self.game.submitter().is_busy() {
                return;
            }
            self.step().await;
        }
    }

    /// Leave the game screen: stop the clock and discard the session
    pub fn leave(&mut self) {
        self.game.leave();
        self.clock.stop();
        self.publish();
    }

    /// Start the clock iff the session timer is armed
    fn sync_clock(&mut self) {
        let armed = self.game.session().timer().is_armed();
        if armed && !self.clock.is_running() {
            let events = self.events_tx.clone();
            self.clock
                .start(move |generation| events.send(Event::Tick { generation }).is_ok());
        } else if !armed && self.clock.is_running() {
            self.clock.stop();
        }
    }

    fn publish(&mut self) {
        self.seq += 1;
        let view = SessionView::capture(&self.game, self.seq);
        // No receivers is fine
        let _ = self.updates.send(UiMessage::Session { view });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::{open, send};
    use crate::session::testing::Probe;
    use crate::session::Session;
    use crate::types::{EndCause, Pending};
    use futures::FutureExt;

    fn driver(budget: u32) -> GameDriver<Probe> {
        GameDriver::new(Duration::from_secs(1), |submitter| Probe {
            session: Session::new(budget),
            submitter,
        })
    }

    async fn opened(budget: u32) -> GameDriver<Probe> {
        let mut driver = driver(budget);
        driver
            .act("start", |game| {
                open(game, (), || async { Ok("first".to_string()) }.boxed())
            })
            .unwrap();
        driver.settle().await;
        driver
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_follows_timer() {
        let mut driver = opened(10).await;
        assert_eq!(driver.game().session.phase(), Phase::AwaitingMove);
        assert!(driver.clock().is_running());

        driver
            .act("submit", |game| {
                send(game, Pending::Move, CallKind::Move, || {
                    futures::future::pending().boxed()
                })
            })
            .unwrap();
        assert!(!driver.clock().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_forfeits_after_budget_ticks() {
        let mut driver = opened(3).await;
        let mut updates = driver.subscribe();

        driver.run_until_over().await;

        let session = &driver.game().session;
        assert_eq!(session.phase(), Phase::Over);
        assert_eq!(session.remaining(), 0);
        assert_eq!(session.outcome().unwrap().cause, EndCause::Forfeit);
        assert!(!driver.clock().is_running());

        let mut remaining = Vec::new();
        while let Ok(UiMessage::Session { view }) = updates.try_recv() {
            remaining.push(view.remaining);
        }
        assert_eq!(remaining, vec![2, 1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submit_is_busy() {
        let mut driver = opened(10).await;
        driver
            .act("submit", |game| {
                send(game, Pending::Move, CallKind::Move, || {
                    futures::future::pending().boxed()
                })
            })
            .unwrap();

        let mut updates = driver.subscribe();
        let second = driver.act("submit", |game| {
            send(game, Pending::Move, CallKind::Move, || {
                async { Ok("never".to_string()) }.boxed()
            })
        });
        assert_eq!(second, Err(IntentError::Busy));
        assert_eq!(driver.game().session.phase(), Phase::Submitting(Pending::Move));
        assert!(matches!(updates.try_recv(), Ok(UiMessage::Rejected { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_after_leave_is_discarded() {
        let mut driver = opened(10).await;
        driver
            .act("submit", |game| {
                send(game, Pending::Move, CallKind::Move, || {
                    async {
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        Ok("late".to_string())
                    }
                    .boxed()
                })
            })
            .unwrap();
        driver.leave();
        assert_eq!(driver.game().session.phase(), Phase::Idle);

        driver.step().await;
        assert!(driver.game().session.history().is_empty());
        assert_eq!(driver.game().session.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_from_stopped_clock_is_ignored() {
        let mut driver = opened(10).await;
        let stale = driver.clock().generation();
        driver.leave();

        driver.handle(Event::Tick { generation: stale });
        assert_eq!(driver.game().session.remaining(), 10);
    }
}
