use super::Session;
use crate::games::Game;
use crate::types::Phase;

/// Per-turn countdown. A zero budget means the game is untimed and never arms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnTimer {
    budget: u32,
    remaining: u32,
    armed: bool,
    /// Stopped until a new prompt arrives; `resume` leaves it disarmed
    held: bool,
}

impl TurnTimer {
    pub fn new(budget: u32) -> Self {
        Self {
            budget,
            remaining: budget,
            armed: false,
            held: false,
        }
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_timed(&self) -> bool {
        self.budget > 0
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Arm with a full budget (new prompt accepted)
    pub(crate) fn arm_full(&mut self) {
        self.remaining = self.budget;
        self.armed = self.is_timed();
        self.held = false;
    }

    /// Arm again with whatever time was left
    pub(crate) fn resume(&mut self) {
        self.armed = !self.held && self.is_timed() && self.remaining > 0;
    }

    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }

    /// Stop counting until the next `arm_full`
    pub(crate) fn hold(&mut self) {
        self.armed = false;
        self.held = true;
    }

    pub(crate) fn drain(&mut self) {
        self.remaining = 0;
        self.armed = false;
    }

    /// Count down one second. Returns the new remaining time, or None when not armed.
    fn count_down(&mut self) -> Option<u32> {
        if !self.armed {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        Some(self.remaining)
    }
}

/// Result of delivering one clock tick to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer not armed or session not awaiting a move
    Ignored,
    Counted(u32),
    /// Remaining time hit zero and the session was forfeited
    Expired,
}

impl<G: Game> Session<G> {
    /// Deliver one clock tick. At zero the session is forfeited exactly once:
    /// `force_forfeit` disarms the timer, so later ticks are ignored.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::AwaitingMove {
            return TickOutcome::Ignored;
        }

        match self.timer.count_down() {
            None => TickOutcome::Ignored,
            Some(0) => {
                let reason = G::forfeit_reason(self);
                tracing::info!(
                    "{} session {} timed out after {}s",
                    G::NAME,
                    self.key,
                    self.timer.budget()
                );
                self.force_forfeit(reason);
                TickOutcome::Expired
            }
            Some(remaining) => TickOutcome::Counted(remaining),
        }
    }
}
