//! Word chain (끝말잇기): the user and the computer alternate words, each
//! starting with the last syllable of the previous one.

use super::{guard_restart, non_empty, open, send, Game};
use crate::api::{
    ApiError, ChainApi, ChainMoveRequest, ChainMoveResponse, ChainStartRequest, ChainStartResponse,
};
use crate::session::{MoveResult, Next, Opening, ScoreUpdate, Session};
use crate::submitter::Submitter;
use crate::types::*;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A word with the dictionary definition the server attached to it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainEntry {
    pub word: String,
    pub definition: Option<String>,
}

/// The word the user has to continue from. Empty when the user opens the chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChainPrompt {
    pub current: Option<ChainEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainTurn {
    pub user: ChainEntry,
    pub reply: Option<ChainEntry>,
    pub at: String,
}

#[derive(Debug)]
pub enum ChainReply {
    Started(ChainStartResponse),
    Moved(ChainMoveResponse),
}

pub struct ChainGame {
    session: Session<ChainGame>,
    submitter: Submitter<ChainGame>,
    api: Arc<dyn ChainApi>,
    /// Word of the move currently in flight
    pending_word: Option<String>,
}

impl ChainGame {
    pub fn new(api: Arc<dyn ChainApi>, turn_seconds: u32, submitter: Submitter<ChainGame>) -> Self {
        Self {
            session: Session::new(turn_seconds),
            submitter,
            api,
            pending_word: None,
        }
    }

    pub fn start(&mut self, difficulty: Difficulty) -> Result<Ticket, IntentError> {
        let api = Arc::clone(&self.api);
        let request = ChainStartRequest {
            difficulty: difficulty.as_str().to_string(),
        };
        open(self, difficulty, move || {
            async move { api.start(request).await.map(ChainReply::Started) }.boxed()
        })
    }

    pub fn submit(&mut self, word: &str) -> Result<Ticket, IntentError> {
        let word = non_empty(word)?;
        let request = ChainMoveRequest {
            game_id: self.session.server_id().cloned().unwrap_or_default(),
            word: word.clone(),
            time_up: false,
        };
        let api = Arc::clone(&self.api);
        let ticket = send(self, Pending::Move, CallKind::Move, move || {
            async move { api.submit_move(request).await.map(ChainReply::Moved) }.boxed()
        })?;
        self.pending_word = Some(word);
        Ok(ticket)
    }

    /// Start over with the same difficulty. The old server game is discarded.
    pub fn restart(&mut self) -> Result<Ticket, IntentError> {
        guard_restart(self)?;
        let difficulty = self.session.mode().copied().unwrap_or_default();
        let previous = self.session.server_id().cloned();

        self.leave();
        if let Some(game_id) = previous {
            let api = Arc::clone(&self.api);
            tokio::spawn(async move {
                match api.end(&game_id).await {
                    Ok(()) => tracing::debug!("Deleted word chain game {}", game_id),
                    Err(e) => tracing::warn!("Failed to delete word chain game {}: {}", game_id, e),
                }
            });
        }
        self.start(difficulty)
    }

    fn translate(&mut self, response: ChainMoveResponse) -> MoveResult<ChainGame> {
        let submitted = self.pending_word.take();
        let message = response.message.trim().to_string();

        if !response.success {
            if response.game_over {
                let reason = response
                    .reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| message.clone());
                return MoveResult {
                    turn: None,
                    score: response.score.map(ScoreUpdate::Set).unwrap_or(ScoreUpdate::Keep),
                    attempt_used: true,
                    next: Next::Over(Verdict {
                        winner: Side::from_winner(response.winner.as_deref(), Side::Computer),
                        cause: EndCause::Rejected,
                        reason,
                    }),
                    notice: Some(Notice::error(message)),
                };
            }
            return MoveResult {
                turn: None,
                score: ScoreUpdate::Keep,
                attempt_used: true,
                next: Next::Retry,
                notice: Some(Notice::error(message)),
            };
        }

        let user = ChainEntry {
            word: response.user_word.or(submitted).unwrap_or_default(),
            definition: response.user_definition,
        };
        let reply = response.computer_word.map(|word| ChainEntry {
            word,
            definition: response.computer_definition,
        });
        let turn = ChainTurn {
            user: user.clone(),
            reply: reply.clone(),
            at: chrono::Utc::now().to_rfc3339(),
        };

        let next = if response.game_over {
            Next::Over(Verdict {
                winner: Side::from_winner(response.winner.as_deref(), Side::User),
                cause: EndCause::Completed,
                reason: response
                    .reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| message.clone()),
            })
        } else {
            // Without a computer word the chain continues from the user's word
            Next::Prompt(ChainPrompt {
                current: Some(reply.unwrap_or(user)),
            })
        };

        MoveResult {
            turn: Some(turn),
            score: response.score.map(ScoreUpdate::Set).unwrap_or(ScoreUpdate::Add(1)),
            attempt_used: true,
            next,
            notice: (!message.is_empty()).then(|| Notice::success(message)),
        }
    }

    /// Tell the server the turn timer ran out. The session is already over.
    fn report_time_up(&mut self) {
        let Some(game_id) = self.session.server_id().cloned() else {
            return;
        };
        if self.submitter.ensure_idle().is_err() {
            return;
        }

        let api = Arc::clone(&self.api);
        let request = ChainMoveRequest {
            game_id,
            word: String::new(),
            time_up: true,
        };
        let ticket = self.session.side_ticket();
        self.submitter.dispatch(
            ticket,
            CallKind::TimeUp,
            async move { api.submit_move(request).await.map(ChainReply::Moved) }.boxed(),
        );
    }
}

impl Game for ChainGame {
    const NAME: &'static str = "chain";

    type Mode = Difficulty;
    type Prompt = ChainPrompt;
    type Turn = ChainTurn;
    type Reply = ChainReply;

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
            "Time is up! No word was entered within {} seconds.",
            session.timer().budget()
        )
    }

    fn on_reply(&mut self, ticket: Ticket, call: CallKind, reply: ChainReply) {
        match (call, reply) {
            (CallKind::Start, ChainReply::Started(response)) => {
                let opening = Opening {
                    server_id: response.game_id,
                    prompt: ChainPrompt {
                        current: response.first_word.map(|word| ChainEntry {
                            word,
                            definition: response.first_definition,
                        }),
                    },
                    max_attempts: None,
                    notice: Some(Notice::success(response.message)),
                };
                self.session.apply_opening(&ticket, opening);
            }
            (CallKind::Move, ChainReply::Moved(response)) => {
                let result = self.translate(response);
                self.session.apply_move_result(&ticket, result);
            }
            (CallKind::TimeUp, ChainReply::Moved(response)) => {
                let reason = response
                    .reason
                    .filter(|r| !r.trim().is_empty())
                    .or_else(|| Some(response.message).filter(|m| !m.trim().is_empty()));
                self.session.amend_forfeit(&ticket, reason);
            }
            (call, reply) => {
                tracing::warn!("chain: unexpected {:?} reply to {:?} call", reply, call);
            }
        }
    }

    fn on_failure(&mut self, ticket: Ticket, call: CallKind, error: ApiError) {
        self.pending_word = None;
        tracing::warn!("chain {:?} call failed: {}", call, error);
        if call != CallKind::TimeUp {
            self.session
                .apply_failure(&ticket, super::TRANSIENT_FAILURE_MESSAGE);
        }
    }

    fn on_expired(&mut self) {
        self.report_time_up();
    }

    fn leave(&mut self) {
        self.pending_word = None;
        self.submitter.abandon();
        self.session.reset();
    }

    fn extras(&self) -> serde_json::Value {
        serde_json::json!({
            "difficulty": self.session.mode().map(Difficulty::as_str),
        })
    }
}
