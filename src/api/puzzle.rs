use super::{ApiResult, HttpApi};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct PuzzleGenerateRequest {
    pub age: u32,
    pub user_id: i64,
}

/// A piece arrives either as `{"word": ".."}` or as a bare string
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PieceWire {
    Object { word: String },
    Text(String),
}

impl PieceWire {
    pub fn word(&self) -> &str {
        match self {
            PieceWire::Object { word } => word,
            PieceWire::Text(word) => word,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PuzzleGenerateResponse {
    pub puzzle_id: String,
    pub age: u32,
    #[serde(default)]
    pub title: String,
    pub pieces: Vec<PieceWire>,
    #[serde(default)]
    pub word_count: usize,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub session_progress: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PuzzleSubmitRequest {
    pub puzzle_id: String,
    pub user_answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PuzzleSubmitResponse {
    pub passed: bool,
    #[serde(default)]
    pub similarity: f64,
    #[serde(default)]
    pub exact_match: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user_sentence: String,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub original_sentence: Option<String>,
    #[serde(default)]
    pub session_progress: Option<String>,
    #[serde(default)]
    pub session_complete: Option<bool>,
    #[serde(default)]
    pub final_score: Option<u32>,
    #[serde(default)]
    pub final_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PuzzleHintRequest {
    pub puzzle_id: String,
    pub current_answer: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HintLine {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PuzzleHintResponse {
    pub hints: Vec<HintLine>,
    pub hints_used: u32,
    pub max_hints: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PuzzleSkipRequest {
    pub puzzle_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PuzzleSkipResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub original_sentence: String,
    #[serde(default)]
    pub session_progress: Option<String>,
    #[serde(default)]
    pub session_complete: Option<bool>,
    #[serde(default)]
    pub final_score: Option<u32>,
    #[serde(default)]
    pub final_message: Option<String>,
}

/// Sentence puzzle endpoints
#[async_trait]
pub trait PuzzleApi: Send + Sync {
    async fn generate(&self, request: PuzzleGenerateRequest) -> ApiResult<PuzzleGenerateResponse>;

    async fn submit(&self, request: PuzzleSubmitRequest) -> ApiResult<PuzzleSubmitResponse>;

    async fn hint(&self, request: PuzzleHintRequest) -> ApiResult<PuzzleHintResponse>;

    async fn skip(&self, request: PuzzleSkipRequest) -> ApiResult<PuzzleSkipResponse>;
}

#[async_trait]
impl PuzzleApi for HttpApi {
    async fn generate(&self, request: PuzzleGenerateRequest) -> ApiResult<PuzzleGenerateResponse> {
        self.post("/games/puzzle/generate", &request).await
    }

    async fn submit(&self, request: PuzzleSubmitRequest) -> ApiResult<PuzzleSubmitResponse> {
        self.post("/games/puzzle/submit", &request).await
    }

    async fn hint(&self, request: PuzzleHintRequest) -> ApiResult<PuzzleHintResponse> {
        self.post("/games/puzzle/hint", &request).await
    }

    async fn skip(&self, request: PuzzleSkipRequest) -> ApiResult<PuzzleSkipResponse> {
        self.post("/games/puzzle/skip", &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pieces_accept_both_shapes() {
        let json = r#"{
            "puzzle_id": "p-1",
            "age": 5,
            "title": "동물",
            "pieces": [{"word": "고양이가"}, "잠을", {"word": "잡니다"}],
            "word_count": 3,
            "metadata": {"difficulty": "easy"}
        }"#;
        let response: PuzzleGenerateResponse = serde_json::from_str(json).unwrap();
        let words: Vec<&str> = response.pieces.iter().map(PieceWire::word).collect();
        assert_eq!(words, vec!["고양이가", "잠을", "잡니다"]);
        assert_eq!(response.metadata["difficulty"], "easy");
        assert!(response.session_progress.is_none());
    }

    #[test]
    fn test_parse_submit_with_session_end() {
        let json = r#"{
            "passed": true,
            "similarity": 0.97,
            "exact_match": false,
            "message": "잘했어요!",
            "user_sentence": "고양이가 잠을 잡니다",
            "score": 90,
            "session_progress": "10/10",
            "session_complete": true,
            "final_score": 820,
            "final_message": "모든 퍼즐을 완료했습니다"
        }"#;
        let response: PuzzleSubmitResponse = serde_json::from_str(json).unwrap();
        assert!(response.passed);
        assert_eq!(response.session_complete, Some(true));
        assert_eq!(response.final_score, Some(820));
    }

    #[test]
    fn test_parse_hint() {
        let json = r#"{
            "hints": [{"type": "first_word", "message": "첫 단어는 '고양이가'입니다."}],
            "hints_used": 1,
            "max_hints": 3
        }"#;
        let response: PuzzleHintResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.hints[0].kind.as_deref(), Some("first_word"));
        assert_eq!(response.max_hints, 3);
    }
}
