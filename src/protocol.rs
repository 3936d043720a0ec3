use crate::games::Game;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Messages published to whatever renders the game
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum UiMessage {
    /// Full state after a transition
    Session { view: SessionView },
    /// An intent was refused locally; the session did not change
    Rejected { action: String, error: String },
}

/// Read-only snapshot of a session, safe to hand to the UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub seq: u64,
    pub game: String,
    pub key: SessionKey,
    pub server_id: Option<ServerGameId>,
    pub phase: Phase,
    pub score: u32,
    pub attempts_used: u32,
    pub prompt_attempts: u32,
    pub max_attempts: Option<u32>,
    pub remaining: u32,
    pub timed: bool,
    pub prompt: serde_json::Value,
    pub history: serde_json::Value,
    pub notice: Option<Notice>,
    pub outcome: Option<Outcome>,
    /// Variant-specific state (puzzle board, hints, ...)
    #[serde(default)]
    pub extras: serde_json::Value,
    /// Local wall-clock time (RFC3339) when the snapshot was taken
    pub captured_at: String,
}

impl SessionView {
    pub fn capture<G: Game>(game: &G, seq: u64) -> Self {
        let session = game.session();
        Self {
            seq,
            game: G::NAME.to_string(),
            key: session.key().clone(),
            server_id: session.server_id().cloned(),
            phase: session.phase(),
            score: session.score(),
            attempts_used: session.attempts_used(),
            prompt_attempts: session.prompt_attempts(),
            max_attempts: session.max_attempts(),
            remaining: session.remaining(),
            timed: session.timer().is_timed(),
            prompt: to_json(&session.prompt()),
            history: to_json(session.history()),
            notice: session.notice().cloned(),
            outcome: session.outcome().cloned(),
            extras: game.extras(),
            captured_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::warn!("Failed to serialize snapshot field: {}", e);
        serde_json::Value::Null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::started;

    #[test]
    fn test_message_tag() {
        let msg = UiMessage::Rejected {
            action: "submit".to_string(),
            error: "A request is already in flight".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["t"], "rejected");
        assert_eq!(json["action"], "submit");
    }

    #[tokio::test]
    async fn test_capture_started_session() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let probe = crate::session::testing::Probe {
            session: started(10),
            submitter: crate::submitter::Submitter::new(tx),
        };

        let view = SessionView::capture(&probe, 7);
        assert_eq!(view.seq, 7);
        assert_eq!(view.game, "probe");
        assert_eq!(view.phase, Phase::AwaitingMove);
        assert_eq!(view.prompt, serde_json::json!("first"));
        assert_eq!(view.history, serde_json::json!([]));
        assert_eq!(view.remaining, 10);
        assert!(view.timed);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["phase"]["phase"], "AWAITING_MOVE");
    }

    #[test]
    fn test_capture_idle_session_has_no_prompt() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let probe = crate::session::testing::Probe {
            session: crate::session::Session::new(0),
            submitter: crate::submitter::Submitter::new(tx),
        };

        let view = SessionView::capture(&probe, 1);
        assert_eq!(view.phase, Phase::Idle);
        assert_eq!(view.prompt, serde_json::Value::Null);
        assert!(!view.timed);
        assert!(chrono::DateTime::parse_from_rfc3339(&view.captured_at).is_ok());
    }
}
