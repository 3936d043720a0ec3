//! Initial-consonant quiz (초성 퀴즈): guess the word from its initials and definition.

use super::{guard_restart, non_empty, open, send, Game};
use crate::api::{
    ApiError, SpellApi, SpellStartRequest, SpellStartResponse, SpellSubmitRequest, SpellSubmitResponse,
};
use crate::session::{MoveResult, Next, Opening, ScoreUpdate, Session};
use crate::submitter::Submitter;
use crate::types::*;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SpellPrompt {
    /// 1-based question number
    pub number: usize,
    pub initial: String,
    pub definition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpellTurn {
    pub number: usize,
    pub initial: String,
    pub answer: String,
    pub correct: bool,
    pub result: Option<String>,
    pub at: String,
}

#[derive(Debug)]
pub enum SpellReply {
    Started(SpellStartResponse),
    Answered(SpellSubmitResponse),
}

pub struct SpellGame {
    session: Session<SpellGame>,
    submitter: Submitter<SpellGame>,
    api: Arc<dyn SpellApi>,
    total_questions: usize,
    /// Initials already asked this session
    used_initials: Vec<String>,
    pending_answer: Option<String>,
}

impl SpellGame {
    pub fn new(
        api: Arc<dyn SpellApi>,
        turn_seconds: u32,
        total_questions: usize,
        submitter: Submitter<SpellGame>,
    ) -> Self {
        Self {
            session: Session::new(turn_seconds),
            submitter,
            api,
            total_questions: total_questions.max(1),
            used_initials: Vec::new(),
            pending_answer: None,
        }
    }

    pub fn total_questions(&self) -> usize {
        self.total_questions
    }

    pub fn start(&mut self, difficulty: Difficulty) -> Result<Ticket, IntentError> {
        let api = Arc::clone(&self.api);
        let request = SpellStartRequest {
            game_id: ulid::Ulid::new().to_string(),
            difficulty: difficulty.as_str().to_string(),
        };
        let ticket = open(self, difficulty, move || {
            async move { api.start(request).await.map(SpellReply::Started) }.boxed()
        })?;
        self.used_initials.clear();
        self.pending_answer = None;
        Ok(ticket)
    }

    pub fn submit(&mut self, answer: &str) -> Result<Ticket, IntentError> {
        let answer = non_empty(answer)?;
        let request = SpellSubmitRequest {
            game_id: self.session.server_id().cloned().unwrap_or_default(),
            answer: answer.clone(),
        };
        let api = Arc::clone(&self.api);
        let ticket = send(self, Pending::Move, CallKind::Move, move || {
            async move { api.submit(request).await.map(SpellReply::Answered) }.boxed()
        })?;
        self.pending_answer = Some(answer);
        Ok(ticket)
    }

    pub fn restart(&mut self) -> Result<Ticket, IntentError> {
        guard_restart(self)?;
        let difficulty = self.session.mode().copied().unwrap_or_default();
        self.leave();
        self.start(difficulty)
    }

    fn translate(&mut self, response: SpellSubmitResponse) -> MoveResult<SpellGame> {
        let answer = self.pending_answer.take().unwrap_or_default();
        let current = self.session.prompt().cloned().unwrap_or_default();
        let feedback = response
            .result
            .clone()
            .or_else(|| response.message.clone())
            .unwrap_or_default();

        let turn = SpellTurn {
            number: current.number,
            initial: current.initial.clone(),
            answer,
            correct: response.correct,
            result: response.result.clone(),
            at: chrono::Utc::now().to_rfc3339(),
        };
        // Retries keep the question number, so only new questions count
        let answered = current.number;
        let local_score = self.session.score().saturating_add(u32::from(response.correct));

        if response.finished || answered >= self.total_questions {
            let final_score = response.score.unwrap_or(local_score);
            tracing::info!(
                "spell session {} finished after {} questions with {} points",
                self.session.key(),
                answered,
                final_score
            );
            return MoveResult {
                turn: Some(turn),
                score: ScoreUpdate::Set(final_score),
                attempt_used: true,
                next: Next::Over(Verdict {
                    winner: Side::User,
                    cause: EndCause::Completed,
                    reason: response.message.unwrap_or_default(),
                }),
                notice: Some(Notice::info(format!("Game over! Final score: {}", final_score))),
            };
        }

        let score = if response.correct {
            ScoreUpdate::Add(1)
        } else {
            ScoreUpdate::Keep
        };
        let notice = if response.correct {
            Notice::success(feedback)
        } else {
            Notice::error(feedback)
        };

        let next = match (response.next_initial, response.next_definition) {
            (Some(initial), Some(_)) if self.used_initials.contains(&initial) => {
                tracing::warn!("spell: server repeated initial {}", initial);
                return MoveResult {
                    turn: Some(turn),
                    score,
                    attempt_used: true,
                    next: Next::Retry,
                    notice: Some(Notice::warning("Received a question that was already asked. Please try again.")),
                };
            }
            (Some(initial), Some(definition)) => {
                self.used_initials.push(initial.clone());
                Next::Prompt(SpellPrompt {
                    number: current.number + 1,
                    initial,
                    definition,
                })
            }
            _ => {
                tracing::warn!("spell: reply carried no next question, keeping the current one");
                Next::Retry
            }
        };

        MoveResult {
            turn: Some(turn),
            score,
            attempt_used: true,
            next,
            notice: Some(notice),
        }
    }
}

impl Game for SpellGame {
    const NAME: &'static str = "spell";

    type Mode = Difficulty;
    type Prompt = SpellPrompt;
    type Turn = SpellTurn;
    type Reply = SpellReply;

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
        format!("Time is up! {} correct answers.", session.score())
    }

    fn on_reply(&mut self, ticket: Ticket, call: CallKind, reply: SpellReply) {
        match (call, reply) {
            (CallKind::Start, SpellReply::Started(response)) => {
                let initial = response.first_initial.unwrap_or_default();
                let opening = Opening {
                    server_id: response.game_id,
                    prompt: SpellPrompt {
                        number: 1,
                        initial: initial.clone(),
                        definition: response.first_definition.unwrap_or_default(),
                    },
                    max_attempts: None,
                    notice: Some(Notice::success(response.message)),
                };
                if self.session.apply_opening(&ticket, opening).is_applied() {
                    self.used_initials = vec![initial];
                }
            }
            (CallKind::Move, SpellReply::Answered(response)) => {
                let result = self.translate(response);
                self.session.apply_move_result(&ticket, result);
            }
            (call, reply) => {
                tracing::warn!("spell: unexpected {:?} reply to {:?} call", reply, call);
            }
        }
    }

    fn on_failure(&mut self, ticket: Ticket, call: CallKind, error: ApiError) {
        tracing::warn!("spell {:?} call failed: {}", call, error);
        self.pending_answer = None;
        self.session
            .apply_failure(&ticket, super::TRANSIENT_FAILURE_MESSAGE);
    }

    fn leave(&mut self) {
        self.pending_answer = None;
        self.used_initials.clear();
        self.submitter.abandon();
        self.session.reset();
    }

    fn extras(&self) -> serde_json::Value {
        serde_json::json!({
            "difficulty": self.session.mode().map(Difficulty::as_str),
            "total_questions": self.total_questions,
            "question": self.session.prompt().map(|p| p.number),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiResult;
    use crate::driver::GameDriver;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedSpell {
        answers: Mutex<VecDeque<ApiResult<SpellSubmitResponse>>>,
        starts: Mutex<Vec<SpellStartRequest>>,
    }

    #[async_trait]
    impl SpellApi for ScriptedSpell {
        async fn start(&self, request: SpellStartRequest) -> ApiResult<SpellStartResponse> {
            let game_id = request.game_id.clone();
            self.starts.lock().unwrap().push(request);
            Ok(SpellStartResponse {
                game_id,
                message: "게임이 시작되었습니다".to_string(),
                difficulty: "medium".to_string(),
                first_initial: Some("ㅅㄱ".to_string()),
                first_definition: Some("사과나무의 열매".to_string()),
            })
        }

        async fn submit(&self, _request: SpellSubmitRequest) -> ApiResult<SpellSubmitResponse> {
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Transport("script exhausted".to_string())))
        }
    }

    fn answer(correct: bool, next: Option<&str>) -> SpellSubmitResponse {
        SpellSubmitResponse {
            correct,
            result: Some(if correct { "정답입니다!" } else { "틀렸습니다" }.to_string()),
            finished: false,
            next_initial: next.map(str::to_string),
            next_definition: next.map(|_| "다음 문제".to_string()),
            score: None,
            message: None,
        }
    }

    async fn started(
        answers: Vec<ApiResult<SpellSubmitResponse>>,
        total: usize,
    ) -> (GameDriver<SpellGame>, Arc<ScriptedSpell>) {
        let api = Arc::new(ScriptedSpell {
            answers: Mutex::new(answers.into()),
            ..Default::default()
        });
        let mut driver = GameDriver::new(Duration::from_secs(1), {
            let api = api.clone();
            move |submitter| SpellGame::new(api, 30, total, submitter)
        });
        driver.act("start", |game| game.start(Difficulty::Medium)).unwrap();
        driver.settle().await;
        (driver, api)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_sends_client_game_id() {
        let (driver, api) = started(vec![], 10).await;
        let sent = api.starts.lock().unwrap()[0].game_id.clone();
        assert!(!sent.is_empty());
        assert_eq!(driver.game().session().server_id(), Some(&sent));
        assert_eq!(driver.game().session().prompt().unwrap().number, 1);
        assert_eq!(driver.game().session().remaining(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_correct_answer_scores_and_advances() {
        let (mut driver, _) = started(vec![Ok(answer(true, Some("ㅂㄴㄴ")))], 10).await;

        driver.act("submit", |game| game.submit("사과")).unwrap();
        driver.settle().await;

        let session = driver.game().session();
        assert_eq!(session.score(), 1);
        assert_eq!(session.history().len(), 1);
        assert!(session.history()[0].correct);
        let prompt = session.prompt().unwrap();
        assert_eq!(prompt.initial, "ㅂㄴㄴ");
        assert_eq!(prompt.number, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_initial_keeps_question() {
        let (mut driver, _) = started(vec![Ok(answer(false, Some("ㅅㄱ")))], 10).await;

        driver.act("submit", |game| game.submit("사고")).unwrap();
        driver.settle().await;

        let session = driver.game().session();
        assert_eq!(session.phase(), Phase::AwaitingMove);
        assert_eq!(session.prompt().unwrap().number, 1);
        assert_eq!(session.notice().map(|n| n.kind), Some(NoticeKind::Warning));
        assert_eq!(session.score(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_takes_server_score() {
        let mut last = answer(true, None);
        last.finished = true;
        last.score = Some(7);
        let (mut driver, _) = started(vec![Ok(last)], 10).await;

        driver.act("submit", |game| game.submit("사과")).unwrap();
        driver.settle().await;

        let session = driver.game().session();
        assert_eq!(session.phase(), Phase::Over);
        assert_eq!(session.score(), 7);
        assert_eq!(session.outcome().unwrap().cause, EndCause::Completed);
        assert!(!driver.clock().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ends_after_total_questions() {
        let answers = vec![Ok(answer(true, Some("ㄱㄴ"))), Ok(answer(false, Some("ㄷㄹ")))];
        let (mut driver, _) = started(answers, 2).await;

        driver.act("submit", |game| game.submit("사과")).unwrap();
        driver.settle().await;
        driver.act("submit", |game| game.submit("가나")).unwrap();
        driver.settle().await;

        let session = driver.game().session();
        assert_eq!(session.phase(), Phase::Over);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.score(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_question_does_not_count_toward_total() {
        let answers = vec![
            Ok(answer(false, Some("ㅅㄱ"))),
            Ok(answer(true, Some("ㄷㄹ"))),
            Ok(answer(true, Some("ㅁㅂ"))),
        ];
        let (mut driver, _) = started(answers, 2).await;

        driver.act("submit", |game| game.submit("사고")).unwrap();
        driver.settle().await;
        driver.act("submit", |game| game.submit("사과")).unwrap();
        driver.settle().await;

        let session = driver.game().session();
        assert_eq!(session.phase(), Phase::AwaitingMove);
        assert_eq!(session.prompt().unwrap().number, 2);
        assert_eq!(driver.game().extras()["question"], 2);

        driver.act("submit", |game| game.submit("다리")).unwrap();
        driver.settle().await;

        let session = driver.game().session();
        assert_eq!(session.phase(), Phase::Over);
        assert_eq!(session.history().len(), 3);
        assert_eq!(session.score(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_keeps_question_and_time() {
        let (mut driver, _) = started(vec![], 10).await;
        for _ in 0..5 {
            driver.step().await;
        }
        assert_eq!(driver.game().session().remaining(), 25);

        driver.act("submit", |game| game.submit("사과")).unwrap();
        driver.settle().await;

        let session = driver.game().session();
        assert_eq!(session.phase(), Phase::AwaitingMove);
        assert_eq!(session.remaining(), 25);
        assert_eq!(session.prompt().unwrap().initial, "ㅅㄱ");
        assert!(session.history().is_empty());
        assert_eq!(session.notice().map(|n| n.kind), Some(NoticeKind::Error));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_local_forfeit() {
        let (mut driver, _) = started(vec![], 10).await;
        driver.run_until_over().await;

        let outcome = driver.game().session().outcome().unwrap();
        assert_eq!(outcome.cause, EndCause::Forfeit);
        assert_eq!(outcome.reason, "Time is up! 0 correct answers.");
        assert!(!outcome.authoritative);
    }
}
