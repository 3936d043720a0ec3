//! Sentence puzzle: put the shuffled words of a sentence back in order.
//!
//! A session is a run of `total_questions` puzzles. Each puzzle is resolved by
//! passing, by running out of attempts, or by skipping; the user then asks for
//! the next one, whose target age moves up after a pass and down otherwise.

use super::{guard_restart, non_empty, open, send, Board, Game};
use crate::api::{
    ApiError, HintLine, PuzzleApi, PuzzleGenerateRequest, PuzzleGenerateResponse, PuzzleHintRequest,
    PuzzleHintResponse, PuzzleSkipRequest, PuzzleSkipResponse, PuzzleSubmitRequest,
    PuzzleSubmitResponse,
};
use crate::session::{MoveResult, Next, Opening, ScoreUpdate, Session};
use crate::submitter::Submitter;
use crate::types::*;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const MIN_AGE: u32 = 4;
pub const MAX_AGE: u32 = 13;

pub fn clamp_age(age: u32) -> u32 {
    age.clamp(MIN_AGE, MAX_AGE)
}

/// Target age for the next puzzle
pub fn adapt_age(age: u32, passed: bool) -> u32 {
    if passed {
        clamp_age(age + 1)
    } else {
        clamp_age(age.saturating_sub(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleMode {
    pub start_age: u32,
    pub user_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PuzzlePrompt {
    pub puzzle_id: String,
    /// 1-based position in the session
    pub number: usize,
    pub age: u32,
    pub title: String,
    pub word_count: usize,
    pub metadata: serde_json::Value,
    pub progress: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PuzzleAttempt {
    pub puzzle_id: String,
    pub number: usize,
    pub answer: String,
    pub passed: bool,
    pub skipped: bool,
    pub similarity: f64,
    pub exact_match: bool,
    pub score: u32,
    pub message: String,
    pub original_sentence: Option<String>,
    pub at: String,
}

/// One resolved puzzle in the adaptive difficulty trail
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelRecord {
    pub question: usize,
    pub age: u32,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resolution {
    pub passed: bool,
    pub original_sentence: Option<String>,
}

#[derive(Debug)]
pub enum PuzzleReply {
    Generated(PuzzleGenerateResponse),
    Checked(PuzzleSubmitResponse),
    Hinted(PuzzleHintResponse),
    Skipped(PuzzleSkipResponse),
}

/// Façade state to commit once the session accepted a reply
enum Effect {
    None,
    Resolved(Resolution),
    NewPuzzle(Board),
}

pub struct PuzzleGame {
    session: Session<PuzzleGame>,
    submitter: Submitter<PuzzleGame>,
    api: Arc<dyn PuzzleApi>,
    total_questions: usize,
    max_attempts: u32,
    age: u32,
    board: Board,
    resolution: Option<Resolution>,
    hints: Vec<HintLine>,
    hints_used: u32,
    max_hints: Option<u32>,
    level_history: Vec<LevelRecord>,
    pending_answer: Option<String>,
}

impl PuzzleGame {
    pub fn new(
        api: Arc<dyn PuzzleApi>,
        turn_seconds: u32,
        total_questions: usize,
        max_attempts: u32,
        submitter: Submitter<PuzzleGame>,
    ) -> Self {
        Self {
            session: Session::new(turn_seconds),
            submitter,
            api,
            total_questions: total_questions.max(1),
            max_attempts: max_attempts.max(1),
            age: MIN_AGE,
            board: Board::default(),
            resolution: None,
            hints: Vec::new(),
            hints_used: 0,
            max_hints: None,
            level_history: Vec::new(),
            pending_answer: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    pub fn hints(&self) -> &[HintLine] {
        &self.hints
    }

    pub fn level_history(&self) -> &[LevelRecord] {
        &self.level_history
    }

    /// Number of puzzles resolved this session
    pub fn completed(&self) -> usize {
        self.level_history.len()
    }

    pub fn start(&mut self, mode: PuzzleMode) -> Result<Ticket, IntentError> {
        let age = clamp_age(mode.start_age);
        let request = PuzzleGenerateRequest {
            age,
            user_id: mode.user_id,
        };
        let api = Arc::clone(&self.api);
        let ticket = open(self, mode, move || {
            async move { api.generate(request).await.map(PuzzleReply::Generated) }.boxed()
        })?;
        self.clear_puzzle();
        self.level_history.clear();
        self.age = age;
        Ok(ticket)
    }

    pub fn restart(&mut self) -> Result<Ticket, IntentError> {
        guard_restart(self)?;
        let mode = self.session.mode().copied().unwrap_or(PuzzleMode {
            start_age: MIN_AGE,
            user_id: 0,
        });
        self.leave();
        self.start(mode)
    }

    /// Move a piece from the pool into the answer
    pub fn place(&mut self, id: &str) -> Result<(), IntentError> {
        self.ensure_editable("place a piece")?;
        self.board.place(id)
    }

    /// Send the piece at `slot` back to the pool
    pub fn unplace(&mut self, slot: usize) -> Result<(), IntentError> {
        self.ensure_editable("remove a piece")?;
        self.board.unplace(slot)
    }

    pub fn clear(&mut self) -> Result<(), IntentError> {
        self.ensure_editable("clear the answer")?;
        self.board.clear();
        Ok(())
    }

    pub fn submit(&mut self) -> Result<Ticket, IntentError> {
        self.ensure_unresolved()?;
        let answer = non_empty(&self.board.answer())?;
        let request = PuzzleSubmitRequest {
            puzzle_id: self.puzzle_id(),
            user_answer: answer.clone(),
        };
        let api = Arc::clone(&self.api);
        let ticket = send(self, Pending::Move, CallKind::Move, move || {
            async move { api.submit(request).await.map(PuzzleReply::Checked) }.boxed()
        })?;
        self.pending_answer = Some(answer);
        Ok(ticket)
    }

    pub fn hint(&mut self) -> Result<Ticket, IntentError> {
        self.ensure_unresolved()?;
        if self.max_hints.is_some_and(|max| self.hints_used >= max) {
            return Err(IntentError::HintsExhausted);
        }
        let request = PuzzleHintRequest {
            puzzle_id: self.puzzle_id(),
            current_answer: self.board.answer(),
        };
        let api = Arc::clone(&self.api);
        send(self, Pending::Hint, CallKind::Hint, move || {
            async move { api.hint(request).await.map(PuzzleReply::Hinted) }.boxed()
        })
    }

    /// Give up on the current puzzle and reveal its sentence
    pub fn skip(&mut self) -> Result<Ticket, IntentError> {
        self.ensure_unresolved()?;
        let request = PuzzleSkipRequest {
            puzzle_id: self.puzzle_id(),
        };
        let api = Arc::clone(&self.api);
        send(self, Pending::Move, CallKind::Skip, move || {
            async move { api.skip(request).await.map(PuzzleReply::Skipped) }.boxed()
        })
    }

    /// Fetch the next puzzle once the current one is resolved
    pub fn next(&mut self) -> Result<Ticket, IntentError> {
        if self.resolution.is_none() {
            return Err(IntentError::PromptUnresolved);
        }
        let request = PuzzleGenerateRequest {
            age: self.age,
            user_id: self.session.mode().map(|m| m.user_id).unwrap_or_default(),
        };
        let api = Arc::clone(&self.api);
        send(self, Pending::Move, CallKind::Advance, move || {
            async move { api.generate(request).await.map(PuzzleReply::Generated) }.boxed()
        })
    }

    fn puzzle_id(&self) -> String {
        self.session
            .prompt()
            .map(|p| p.puzzle_id.clone())
            .unwrap_or_default()
    }

    fn ensure_unresolved(&self) -> Result<(), IntentError> {
        if self.resolution.is_some() {
            return Err(IntentError::PromptResolved);
        }
        Ok(())
    }

    fn ensure_editable(&self, action: &'static str) -> Result<(), IntentError> {
        match self.session.phase() {
            Phase::AwaitingMove => self.ensure_unresolved(),
            Phase::Submitting(_) => Err(IntentError::Busy),
            phase => Err(IntentError::WrongPhase { action, phase }),
        }
    }

    fn clear_puzzle(&mut self) {
        self.board = Board::default();
        self.resolution = None;
        self.hints.clear();
        self.hints_used = 0;
        self.max_hints = None;
        self.pending_answer = None;
    }

    fn prompt_from(&self, response: &PuzzleGenerateResponse, number: usize) -> PuzzlePrompt {
        PuzzlePrompt {
            puzzle_id: response.puzzle_id.clone(),
            number,
            age: response.age,
            title: response.title.clone(),
            word_count: response.word_count,
            metadata: response.metadata.clone(),
            progress: response.session_progress.clone(),
        }
    }

    /// How a resolved puzzle moves the session on
    fn after_resolution(
        &self,
        session_complete: Option<bool>,
        final_score: Option<u32>,
        final_message: Option<String>,
        earned: u32,
        fallback_reason: &str,
    ) -> (ScoreUpdate, Next<PuzzlePrompt>) {
        let resolved = self.completed() + 1;
        if session_complete == Some(true) || resolved >= self.total_questions {
            let total = final_score.unwrap_or(self.session.score().saturating_add(earned));
            tracing::info!(
                "puzzle session {} complete after {} puzzles with {} points",
                self.session.key(),
                resolved,
                total
            );
            let verdict = Verdict {
                winner: Side::User,
                cause: EndCause::Completed,
                reason: final_message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| fallback_reason.to_string()),
            };
            return (ScoreUpdate::Set(total), Next::Over(verdict));
        }
        (ScoreUpdate::Add(earned), Next::Hold)
    }

    fn translate_check(&mut self, response: PuzzleSubmitResponse) -> (MoveResult<PuzzleGame>, Effect) {
        let prompt = self.session.prompt().cloned().unwrap_or_default();
        let earned = if response.passed {
            response.score.unwrap_or(0)
        } else {
            0
        };
        let message = if response.message.trim().is_empty() {
            response.feedback.clone().unwrap_or_default()
        } else {
            response.message.clone()
        };
        let attempt = PuzzleAttempt {
            puzzle_id: prompt.puzzle_id.clone(),
            number: prompt.number,
            answer: self
                .pending_answer
                .take()
                .unwrap_or_else(|| response.user_sentence.clone()),
            passed: response.passed,
            skipped: false,
            similarity: response.similarity,
            exact_match: response.exact_match,
            score: earned,
            message: message.clone(),
            original_sentence: response.original_sentence.clone(),
            at: chrono::Utc::now().to_rfc3339(),
        };

        let limit = self.session.max_attempts().unwrap_or(self.max_attempts);
        let exhausted = self.session.prompt_attempts() + 1 >= limit;
        let notice = if response.passed {
            Notice::success(message.clone())
        } else {
            Notice::error(message.clone())
        };

        if !response.passed && !exhausted {
            let result = MoveResult {
                turn: Some(attempt),
                score: ScoreUpdate::Keep,
                attempt_used: true,
                next: Next::Retry,
                notice: Some(notice),
            };
            return (result, Effect::None);
        }

        let (score, next) = self.after_resolution(
            response.session_complete,
            response.final_score,
            response.final_message.clone(),
            earned,
            &message,
        );
        let result = MoveResult {
            turn: Some(attempt),
            score,
            attempt_used: true,
            next,
            notice: Some(notice),
        };
        let resolution = Resolution {
            passed: response.passed,
            original_sentence: response.original_sentence,
        };
        (result, Effect::Resolved(resolution))
    }

    fn translate_skip(&mut self, response: PuzzleSkipResponse) -> (MoveResult<PuzzleGame>, Effect) {
        let prompt = self.session.prompt().cloned().unwrap_or_default();
        let attempt = PuzzleAttempt {
            puzzle_id: prompt.puzzle_id,
            number: prompt.number,
            answer: String::new(),
            passed: false,
            skipped: true,
            similarity: 0.0,
            exact_match: false,
            score: 0,
            message: response.message.clone(),
            original_sentence: Some(response.original_sentence.clone()),
            at: chrono::Utc::now().to_rfc3339(),
        };
        let (score, next) = self.after_resolution(
            response.session_complete,
            response.final_score,
            response.final_message.clone(),
            0,
            &response.message,
        );
        let result = MoveResult {
            turn: Some(attempt),
            score,
            attempt_used: false,
            next,
            notice: Some(Notice::info(response.message)),
        };
        let resolution = Resolution {
            passed: false,
            original_sentence: Some(response.original_sentence),
        };
        (result, Effect::Resolved(resolution))
    }

    fn translate_generated(&mut self, response: PuzzleGenerateResponse) -> (MoveResult<PuzzleGame>, Effect) {
        let prompt = self.prompt_from(&response, self.completed() + 1);
        let board = Board::new(response.pieces.iter().map(|p| p.word().to_string()));
        let result = MoveResult {
            turn: None,
            score: ScoreUpdate::Keep,
            attempt_used: false,
            next: Next::Prompt(prompt),
            notice: None,
        };
        (result, Effect::NewPuzzle(board))
    }

    fn commit(&mut self, effect: Effect) {
        match effect {
            Effect::None => {}
            Effect::Resolved(resolution) => {
                let question = self.completed() + 1;
                self.level_history.push(LevelRecord {
                    question,
                    age: self.age,
                    passed: resolution.passed,
                });
                if !self.session.is_over() {
                    self.age = adapt_age(self.age, resolution.passed);
                }
                tracing::debug!(
                    "puzzle {} resolved (passed: {}), next age {}",
                    question,
                    resolution.passed,
                    self.age
                );
                self.resolution = Some(resolution);
            }
            Effect::NewPuzzle(board) => {
                self.clear_puzzle();
                self.board = board;
            }
        }
    }
}

impl Game for PuzzleGame {
    const NAME: &'static str = "puzzle";

    type Mode = PuzzleMode;
    type Prompt = PuzzlePrompt;
    type Turn = PuzzleAttempt;
    type Reply = PuzzleReply;

    fn session(&self) -> &Session<Self> {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session<Self> {
        &mut self.session
    }

    fn submitter(&self) -> &Submitter<Self> {
        &self.submitter
    }

    fn submitter_mut(&mut self) -> &mut Submitter<Self> {
        &mut self.submitter
    }

    fn forfeit_reason(session: &Session<Self>) -> String {
        format!(
            "Time is up! The puzzle was not solved within {} seconds.",
            session.timer().budget()
        )
    }

    fn on_reply(&mut self, ticket: Ticket, call: CallKind, reply: PuzzleReply) {
        let (result, effect) = match (call, reply) {
            (CallKind::Start, PuzzleReply::Generated(response)) => {
                let board = Board::new(response.pieces.iter().map(|p| p.word().to_string()));
                let opening = Opening {
                    server_id: response.puzzle_id.clone(),
                    prompt: self.prompt_from(&response, 1),
                    max_attempts: Some(self.max_attempts),
                    notice: None,
                };
                if self.session.apply_opening(&ticket, opening).is_applied() {
                    self.commit(Effect::NewPuzzle(board));
                }
                return;
            }
            (CallKind::Hint, PuzzleReply::Hinted(response)) => {
                let text = response
                    .hints
                    .iter()
                    .map(|h| h.message.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                let notice = (!text.is_empty()).then(|| Notice::info(text));
                if self.session.complete_hint(&ticket, notice).is_applied() {
                    self.hints.extend(response.hints);
                    self.hints_used = response.hints_used;
                    self.max_hints = Some(response.max_hints);
                }
                return;
            }
            (CallKind::Move, PuzzleReply::Checked(response)) => self.translate_check(response),
            (CallKind::Skip, PuzzleReply::Skipped(response)) => self.translate_skip(response),
            (CallKind::Advance, PuzzleReply::Generated(response)) => self.translate_generated(response),
            (call, reply) => {
                tracing::warn!("puzzle: unexpected {:?} reply to {:?} call", reply, call);
                return;
            }
        };

        if self.session.apply_move_result(&ticket, result).is_applied() {
            self.commit(effect);
        }
    }

    fn on_failure(&mut self, ticket: Ticket, call: CallKind, error: ApiError) {
        tracing::warn!("puzzle {:?} call failed: {}", call, error);
        self.pending_answer = None;
        self.session
            .apply_failure(&ticket, super::TRANSIENT_FAILURE_MESSAGE);
    }

    fn leave(&mut self) {
        self.clear_puzzle();
        self.level_history.clear();
        self.submitter.abandon();
        self.session.reset();
    }

    fn extras(&self) -> serde_json::Value {
        serde_json::json!({
            "age": self.age,
            "board": self.board,
            "answer": self.board.answer(),
            "resolution": self.resolution,
            "hints": self.hints.iter().map(|h| h.message.as_str()).collect::<Vec<_>>(),
            "hints_used": self.hints_used,
            "max_hints": self.max_hints,
            "level_history": self.level_history,
            "completed": self.completed(),
            "total_questions": self.total_questions,
        })
    }
}
