use super::Session;
use crate::games::Game;
use crate::types::*;

/// Initial prompt returned by the server's start call
#[derive(Debug, Clone)]
pub struct Opening<P> {
    pub server_id: ServerGameId,
    pub prompt: P,
    pub max_attempts: Option<u32>,
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreUpdate {
    Keep,
    Add(u32),
    /// Authoritative total from the server; never lowers the score
    Set(u32),
}

/// Where the session goes after an accepted reply
#[derive(Debug, Clone)]
pub enum Next<P> {
    /// Replace the prompt and re-arm with a full budget
    Prompt(P),
    /// Keep the prompt; the timer resumes with the time that was left
    Retry,
    /// Keep the prompt with the timer stopped until a new prompt arrives
    Hold,
    Over(Verdict),
}

/// A server reply translated into the session's vocabulary by a façade
#[derive(Debug, Clone)]
pub struct MoveResult<G: Game> {
    pub turn: Option<G::Turn>,
    pub score: ScoreUpdate,
    pub attempt_used: bool,
    pub next: Next<G::Prompt>,
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Ticket belongs to a session that was restarted or left
    Stale,
    /// Ticket was already applied, or is not the turn the session expects
    OutOfTurn,
    /// Session is not waiting on this kind of reply
    Unexpected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    Dropped(DropReason),
}

impl Applied {
    pub fn is_applied(&self) -> bool {
        matches!(self, Applied::Applied)
    }
}

impl<G: Game> Session<G> {
    /// Check a reply's ticket against the live session and the expected phase
    fn admit(&self, ticket: &Ticket, expected: &[Phase]) -> Result<(), DropReason> {
        if ticket.session != self.key {
            return Err(DropReason::Stale);
        }
        if ticket.turn != self.next_turn {
            return Err(DropReason::OutOfTurn);
        }
        if !expected.contains(&self.phase) {
            return Err(DropReason::Unexpected);
        }
        Ok(())
    }

    fn dropped(&self, ticket: &Ticket, reason: DropReason) -> Applied {
        tracing::debug!(
            "{} session {}: dropping reply for {}#{} ({:?})",
            G::NAME,
            self.key,
            ticket.session,
            ticket.turn,
            reason
        );
        Applied::Dropped(reason)
    }

    /// `Submitting(Start) -> AwaitingMove`
    pub fn apply_opening(&mut self, ticket: &Ticket, opening: Opening<G::Prompt>) -> Applied {
        if let Err(reason) = self.admit(ticket, &[Phase::Submitting(Pending::Start)]) {
            return self.dropped(ticket, reason);
        }

        self.next_turn += 1;
        self.server_id = Some(opening.server_id);
        self.prompt = Some(opening.prompt);
        self.max_attempts = opening.max_attempts;
        self.prompt_attempts = 0;
        self.notice = opening.notice;
        self.phase = Phase::AwaitingMove;
        self.timer.arm_full();

        tracing::info!(
            "{} session {} started (server game {:?})",
            G::NAME,
            self.key,
            self.server_id
        );
        Applied::Applied
    }

    /// The sole mutator for `Submitting(Move) -> AwaitingMove | Over`
    pub fn apply_move_result(&mut self, ticket: &Ticket, result: MoveResult<G>) -> Applied {
        if let Err(reason) = self.admit(ticket, &[Phase::Submitting(Pending::Move)]) {
            return self.dropped(ticket, reason);
        }

        self.next_turn += 1;

        if let Some(turn) = result.turn {
            self.history.push(turn);
        }
        match result.score {
            ScoreUpdate::Keep => {}
            ScoreUpdate::Add(points) => self.score = self.score.saturating_add(points),
            ScoreUpdate::Set(total) => self.score = self.score.max(total),
        }
        if result.attempt_used {
            self.attempts_used += 1;
            self.prompt_attempts += 1;
        }
        if result.notice.is_some() {
            self.notice = result.notice;
        }

        match result.next {
            Next::Prompt(prompt) => {
                self.prompt = Some(prompt);
                self.prompt_attempts = 0;
                self.phase = Phase::AwaitingMove;
                self.timer.arm_full();
            }
            Next::Retry => {
                self.phase = Phase::AwaitingMove;
                self.timer.resume();
            }
            Next::Hold => {
                self.phase = Phase::AwaitingMove;
                self.timer.hold();
            }
            Next::Over(verdict) => {
                tracing::info!(
                    "{} session {} over: {:?} ({:?})",
                    G::NAME,
                    self.key,
                    verdict.cause,
                    verdict.winner
                );
                self.enter_over(verdict, true);
            }
        }

        tracing::debug!(
            "{} session {} applied turn {} -> {} (score {}, history {})",
            G::NAME,
            self.key,
            ticket.turn,
            self.phase,
            self.score,
            self.history.len()
        );
        Applied::Applied
    }

    /// `Submitting(Hint) -> AwaitingMove`, timer resumes where it stopped
    pub fn complete_hint(&mut self, ticket: &Ticket, notice: Option<Notice>) -> Applied {
        if let Err(reason) = self.admit(ticket, &[Phase::Submitting(Pending::Hint)]) {
            return self.dropped(ticket, reason);
        }

        self.next_turn += 1;
        if notice.is_some() {
            self.notice = notice;
        }
        self.phase = Phase::AwaitingMove;
        self.timer.resume();
        Applied::Applied
    }

    /// Transient network failure: the call is treated as never having happened.
    /// No time is given back; the timer resumes with what was left.
    pub fn apply_failure(&mut self, ticket: &Ticket, message: impl Into<String>) -> Applied {
        let expected = [
            Phase::Submitting(Pending::Start),
            Phase::Submitting(Pending::Move),
            Phase::Submitting(Pending::Hint),
        ];
        if let Err(reason) = self.admit(ticket, &expected) {
            return self.dropped(ticket, reason);
        }

        let message = message.into();
        tracing::warn!(
            "{} session {}: request failed while {}: {}",
            G::NAME,
            self.key,
            self.phase,
            message
        );

        self.next_turn += 1;
        self.notice = Some(Notice::error(message));
        if self.phase == Phase::Submitting(Pending::Start) {
            self.phase = Phase::Idle;
            self.mode = None;
        } else {
            self.phase = Phase::AwaitingMove;
            self.timer.resume();
        }
        Applied::Applied
    }

    /// Local timeout: `AwaitingMove -> Over`, decided without the server
    pub fn force_forfeit(&mut self, reason: impl Into<String>) -> bool {
        if self.phase != Phase::AwaitingMove {
            return false;
        }

        let verdict = Verdict {
            winner: Side::Computer,
            cause: EndCause::Forfeit,
            reason: reason.into(),
        };
        self.notice = Some(Notice::error(verdict.reason.clone()));
        self.enter_over(verdict, false);
        self.timer.drain();
        true
    }

    /// Replace the fallback timeout reason with the server's, when it sent one
    pub fn amend_forfeit(&mut self, ticket: &Ticket, reason: Option<String>) -> Applied {
        if ticket.session != self.key {
            return self.dropped(ticket, DropReason::Stale);
        }
        let Some(outcome) = self.outcome.as_mut() else {
            return self.dropped(ticket, DropReason::Unexpected);
        };
        if outcome.cause != EndCause::Forfeit || outcome.authoritative {
            return self.dropped(ticket, DropReason::Unexpected);
        }

        match reason.filter(|r| !r.trim().is_empty()) {
            Some(reason) => {
                tracing::info!(
                    "{} session {}: server confirmed timeout: {}",
                    G::NAME,
                    self.key,
                    reason
                );
                outcome.reason = reason.clone();
                outcome.authoritative = true;
                self.notice = Some(Notice::error(reason));
                Applied::Applied
            }
            None => Applied::Dropped(DropReason::Unexpected),
        }
    }

    fn enter_over(&mut self, verdict: Verdict, authoritative: bool) {
        self.phase = Phase::Over;
        self.timer.disarm();
        self.outcome = Some(Outcome {
            winner: verdict.winner,
            cause: verdict.cause,
            reason: verdict.reason,
            authoritative,
            ended_at: chrono::Utc::now().to_rfc3339(),
        });
    }
}
