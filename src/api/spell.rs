use super::{ApiResult, HttpApi};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct SpellStartRequest {
    /// Generated by the client
    pub game_id: String,
    pub difficulty: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpellStartResponse {
    pub game_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub first_initial: Option<String>,
    #[serde(default)]
    pub first_definition: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpellSubmitRequest {
    pub game_id: String,
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpellSubmitResponse {
    pub correct: bool,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub next_initial: Option<String>,
    #[serde(default)]
    pub next_definition: Option<String>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Initial-consonant quiz endpoints
#[async_trait]
pub trait SpellApi: Send + Sync {
    async fn start(&self, request: SpellStartRequest) -> ApiResult<SpellStartResponse>;

    async fn submit(&self, request: SpellSubmitRequest) -> ApiResult<SpellSubmitResponse>;
}

#[async_trait]
impl SpellApi for HttpApi {
    async fn start(&self, request: SpellStartRequest) -> ApiResult<SpellStartResponse> {
        self.post("/games/wordspell/start", &request).await
    }

    async fn submit(&self, request: SpellSubmitRequest) -> ApiResult<SpellSubmitResponse> {
        self.post("/games/wordspell/submit", &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_response() {
        let json = r#"{
            "game_id": "01J0000000000000000000000",
            "message": "게임 시작",
            "difficulty": "medium",
            "first_initial": "ㅅㄱ",
            "first_definition": "사과나무의 열매"
        }"#;
        let response: SpellStartResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.first_initial.as_deref(), Some("ㅅㄱ"));
    }

    #[test]
    fn test_parse_finished_response() {
        let json = r#"{"correct": true, "result": "정답입니다!", "finished": true, "score": 8}"#;
        let response: SpellSubmitResponse = serde_json::from_str(json).unwrap();
        assert!(response.correct);
        assert!(response.finished);
        assert_eq!(response.score, Some(8));
        assert!(response.next_initial.is_none());
    }
}
