use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque ID types for type safety
pub type SessionKey = String;
pub type ServerGameId = String;
pub type PieceId = String;

/// Difficulty selected when a chain or spelling session begins
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// What a session is waiting on while in `Phase::Submitting`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pending {
    Start,
    Move,
    Hint,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "phase", content = "pending", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Idle,
    AwaitingMove,
    Submitting(Pending),
    Over,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::AwaitingMove => write!(f, "awaiting a move"),
            Phase::Submitting(Pending::Start) => write!(f, "starting"),
            Phase::Submitting(Pending::Move) => write!(f, "submitting a move"),
            Phase::Submitting(Pending::Hint) => write!(f, "fetching a hint"),
            Phase::Over => write!(f, "over"),
        }
    }
}

/// Kind of network call a ticket was issued for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Start,
    Move,
    Hint,
    Skip,
    Advance,
    /// Post-forfeit notification that the local turn timer ran out
    TimeUp,
}

/// Correlates a reply with the session and turn that issued the request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub session: SessionKey,
    pub turn: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    User,
    Computer,
}

impl Side {
    /// Parse the server's `winner` field, falling back when absent or unknown
    pub fn from_winner(winner: Option<&str>, fallback: Side) -> Side {
        match winner.map(|w| w.trim().to_lowercase()) {
            Some(w) if w == "user" || w == "player" => Side::User,
            Some(w) if w == "computer" || w == "ai" => Side::Computer,
            _ => fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EndCause {
    /// The game ran its course (server said so, or all questions answered)
    Completed,
    /// The server refused a move and ended the game
    Rejected,
    /// The local turn timer expired
    Forfeit,
}

/// Server-side adjudication that ends a session
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub winner: Side,
    pub cause: EndCause,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Outcome {
    pub winner: Side,
    pub cause: EndCause,
    pub reason: String,
    /// False while the reason is the locally synthesized timeout fallback
    pub authoritative: bool,
    pub ended_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
    Info,
    Warning,
}

/// User-facing message attached to the last transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(NoticeKind::Warning, text)
    }
}

/// Locally detectable invalid intents. Never reach the network, never mutate a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntentError {
    #[error("A request is already in flight")]
    Busy,

    #[error("Cannot {action} while the game is {phase}")]
    WrongPhase { action: &'static str, phase: Phase },

    #[error("Move is empty")]
    EmptyMove,

    #[error("Piece {0} is not in the pool")]
    PieceNotInPool(PieceId),

    #[error("No placed piece at slot {0}")]
    NoPlacedPiece(usize),

    #[error("Current puzzle is already resolved")]
    PromptResolved,

    #[error("Current puzzle is not resolved yet")]
    PromptUnresolved,

    #[error("No hints remaining")]
    HintsExhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_parse() {
        assert_eq!(Difficulty::parse(" Hard "), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse("easy"), Some(Difficulty::Easy));
        assert_eq!(Difficulty::parse("extreme"), None);
        assert_eq!(Difficulty::default().as_str(), "medium");
    }

    #[test]
    fn test_side_from_winner() {
        assert_eq!(Side::from_winner(Some("user"), Side::Computer), Side::User);
        assert_eq!(Side::from_winner(Some("Computer"), Side::User), Side::Computer);
        assert_eq!(Side::from_winner(None, Side::User), Side::User);
        assert_eq!(Side::from_winner(Some("draw"), Side::Computer), Side::Computer);
    }

    #[test]
    fn test_phase_serializes_tagged() {
        let json = serde_json::to_value(Phase::Submitting(Pending::Move)).unwrap();
        assert_eq!(json["phase"], "SUBMITTING");
        assert_eq!(json["pending"], "MOVE");

        let json = serde_json::to_value(Phase::Over).unwrap();
        assert_eq!(json["phase"], "OVER");
    }

    #[test]
    fn test_wrong_phase_message() {
        let err = IntentError::WrongPhase {
            action: "submit",
            phase: Phase::Over,
        };
        assert_eq!(err.to_string(), "Cannot submit while the game is over");
    }
}
