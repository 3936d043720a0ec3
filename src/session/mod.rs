//! Session state for one play-through of a game.
//!
//! A `Session` is owned by exactly one façade. Every mutation goes through a
//! method on this type (split across `apply` and `timer`), and every phase
//! change updates the turn timer inside the same call.

mod apply;
pub mod timer;

pub use apply::{Applied, DropReason, MoveResult, Next, Opening, ScoreUpdate};
pub use timer::{TickOutcome, TurnTimer};

use crate::games::Game;
use crate::types::*;

pub struct Session<G: Game> {
    key: SessionKey,
    server_id: Option<ServerGameId>,
    phase: Phase,
    mode: Option<G::Mode>,
    history: Vec<G::Turn>,
    score: u32,
    attempts_used: u32,
    prompt_attempts: u32,
    max_attempts: Option<u32>,
    prompt: Option<G::Prompt>,
    outcome: Option<Outcome>,
    notice: Option<Notice>,
    timer: TurnTimer,
    next_turn: u64,
}

fn fresh_key() -> SessionKey {
    ulid::Ulid::new().to_string()
}

impl<G: Game> Session<G> {
    /// Create an idle session whose turns last `turn_budget` seconds (0 = untimed)
    pub fn new(turn_budget: u32) -> Self {
        Self {
            key: fresh_key(),
            server_id: None,
            phase: Phase::Idle,
            mode: None,
            history: Vec::new(),
            score: 0,
            attempts_used: 0,
            prompt_attempts: 0,
            max_attempts: None,
            prompt: None,
            outcome: None,
            notice: None,
            timer: TurnTimer::new(turn_budget),
            next_turn: 0,
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn server_id(&self) -> Option<&ServerGameId> {
        self.server_id.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> Option<&G::Mode> {
        self.mode.as_ref()
    }

    pub fn history(&self) -> &[G::Turn] {
        &self.history
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    pub fn prompt_attempts(&self) -> u32 {
        self.prompt_attempts
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    pub fn prompt(&self) -> Option<&G::Prompt> {
        self.prompt.as_ref()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn timer(&self) -> &TurnTimer {
        &self.timer
    }

    pub fn remaining(&self) -> u32 {
        self.timer.remaining()
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::Over
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    /// Start a new play-through. Always gets a fresh key, so replies to any
    /// earlier session are dropped as stale.
    pub fn begin(&mut self, mode: G::Mode) -> Result<Ticket, IntentError> {
        match self.phase {
            Phase::Submitting(Pending::Start) => return Err(IntentError::Busy),
            Phase::Idle | Phase::Over => {}
            phase => {
                return Err(IntentError::WrongPhase {
                    action: "start",
                    phase,
                })
            }
        }

        let budget = self.timer.budget();
        *self = Self::new(budget);
        self.mode = Some(mode);
        self.phase = Phase::Submitting(Pending::Start);

        tracing::info!("{} session {} starting", G::NAME, self.key);
        Ok(self.issue())
    }

    /// Leave `AwaitingMove` for a network call. The timer is disarmed in the same step.
    pub fn start_move(&mut self, pending: Pending) -> Result<Ticket, IntentError> {
        if pending == Pending::Start {
            return Err(IntentError::WrongPhase {
                action: "start",
                phase: self.phase,
            });
        }
        match self.phase {
            Phase::AwaitingMove => {}
            Phase::Submitting(_) => return Err(IntentError::Busy),
            phase => {
                return Err(IntentError::WrongPhase {
                    action: if pending == Pending::Hint {
                        "ask for a hint"
                    } else {
                        "submit"
                    },
                    phase,
                })
            }
        }

        self.phase = Phase::Submitting(pending);
        self.timer.disarm();
        Ok(self.issue())
    }

    /// Ticket for a call that does not move the phase (post-forfeit report)
    pub fn side_ticket(&self) -> Ticket {
        Ticket {
            session: self.key.clone(),
            turn: self.next_turn,
        }
    }

    /// Discard everything and return to `Idle`
    pub fn reset(&mut self) {
        let budget = self.timer.budget();
        tracing::debug!("{} session {} reset", G::NAME, self.key);
        *self = Self::new(budget);
    }

    fn issue(&self) -> Ticket {
        Ticket {
            session: self.key.clone(),
            turn: self.next_turn,
        }
    }
}

impl<G: Game> std::fmt::Debug for Session<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("game", &G::NAME)
            .field("key", &self.key)
            .field("server_id", &self.server_id)
            .field("phase", &self.phase)
            .field("history", &self.history.len())
            .field("score", &self.score)
            .field("remaining", &self.timer.remaining())
            .field("armed", &self.timer.is_armed())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let session: Session<Probe> = Session::new(10);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.server_id().is_none());
        assert!(session.prompt().is_none());
        assert!(!session.timer().is_armed());
    }

    #[test]
    fn test_begin_enters_submitting_start() {
        let mut session: Session<Probe> = Session::new(10);
        let before = session.key().clone();
        let ticket = session.begin(()).unwrap();

        assert_eq!(session.phase(), Phase::Submitting(Pending::Start));
        assert_ne!(session.key(), &before, "begin must mint a fresh key");
        assert_eq!(&ticket.session, session.key());
        assert_eq!(ticket.turn, 0);
    }

    #[test]
    fn test_double_begin_is_busy() {
        let mut session: Session<Probe> = Session::new(10);
        session.begin(()).unwrap();
        assert_eq!(session.begin(()), Err(IntentError::Busy));
    }

    #[test]
    fn test_begin_rejected_mid_game() {
        let mut session = started(10);
        let result = session.begin(());
        assert!(matches!(result, Err(IntentError::WrongPhase { .. })));
        assert_eq!(session.phase(), Phase::AwaitingMove);
    }

    #[test]
    fn test_start_move_disarms_timer() {
        let mut session = started(10);
        assert!(session.timer().is_armed());

        session.start_move(Pending::Move).unwrap();
        assert_eq!(session.phase(), Phase::Submitting(Pending::Move));
        assert!(!session.timer().is_armed());
    }

    #[test]
    fn test_start_move_while_submitting_is_busy() {
        let mut session = started(10);
        session.start_move(Pending::Move).unwrap();
        assert_eq!(session.start_move(Pending::Move), Err(IntentError::Busy));
        assert_eq!(session.start_move(Pending::Hint), Err(IntentError::Busy));
    }

    #[test]
    fn test_start_move_when_idle_is_wrong_phase() {
        let mut session: Session<Probe> = Session::new(10);
        let err = session.start_move(Pending::Move).unwrap_err();
        assert_eq!(
            err,
            IntentError::WrongPhase {
                action: "submit",
                phase: Phase::Idle
            }
        );
    }

    #[test]
    fn test_reset_discards_everything() {
        let mut session = started(10);
        let ticket = session.start_move(Pending::Move).unwrap();
        session.apply_move_result(&ticket, accepted("apple"));
        let old_key = session.key().clone();

        session.reset();
        assert_eq!(session.phase(), Phase::Idle);
        assert_ne!(session.key(), &old_key);
        assert!(session.history().is_empty());
        assert_eq!(session.score(), 0);
        assert!(session.server_id().is_none());
        assert_eq!(session.remaining(), 10);
    }
}
