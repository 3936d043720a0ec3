use super::{ApiResult, HttpApi};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ChainStartRequest {
    pub difficulty: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainStartResponse {
    pub game_id: String,
    pub message: String,
    pub difficulty: String,
    #[serde(default)]
    pub first_word: Option<String>,
    #[serde(default)]
    pub first_definition: Option<String>,
    #[serde(default)]
    pub computer_starts: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainMoveRequest {
    pub game_id: String,
    pub word: String,
    /// Set when reporting that the local turn timer ran out
    pub time_up: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainMoveResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub game_over: bool,
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub user_word: Option<String>,
    #[serde(default)]
    pub user_definition: Option<String>,
    #[serde(default)]
    pub computer_word: Option<String>,
    #[serde(default)]
    pub computer_definition: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub score: Option<u32>,
}

/// Word chain endpoints
#[async_trait]
pub trait ChainApi: Send + Sync {
    async fn start(&self, request: ChainStartRequest) -> ApiResult<ChainStartResponse>;

    async fn submit_move(&self, request: ChainMoveRequest) -> ApiResult<ChainMoveResponse>;

    /// Discard a server-side game
    async fn end(&self, game_id: &str) -> ApiResult<()>;
}

#[async_trait]
impl ChainApi for HttpApi {
    async fn start(&self, request: ChainStartRequest) -> ApiResult<ChainStartResponse> {
        self.post("/games/wordchain/start", &request).await
    }

    async fn submit_move(&self, request: ChainMoveRequest) -> ApiResult<ChainMoveResponse> {
        self.post("/games/wordchain/move", &request).await
    }

    async fn end(&self, game_id: &str) -> ApiResult<()> {
        self.delete(&format!("/games/wordchain/{}", game_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_response() {
        let json = r#"{
            "game_id": "g-1",
            "message": "게임을 시작합니다",
            "difficulty": "easy",
            "first_word": "사과",
            "first_definition": "사과나무의 열매",
            "computer_starts": true
        }"#;
        let response: ChainStartResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.game_id, "g-1");
        assert_eq!(response.first_word.as_deref(), Some("사과"));
        assert!(response.computer_starts);
    }

    #[test]
    fn test_parse_minimal_move_response() {
        let response: ChainMoveResponse =
            serde_json::from_str(r#"{"success": false, "message": "사전에 없는 단어입니다"}"#).unwrap();
        assert!(!response.success);
        assert!(!response.game_over);
        assert!(response.winner.is_none());
        assert!(response.score.is_none());
    }

    #[test]
    fn test_parse_game_over_response() {
        let json = r#"{
            "success": true,
            "message": "컴퓨터가 단어를 찾지 못했습니다",
            "game_over": true,
            "winner": "user",
            "user_word": "과자",
            "chisa_message": "",
            "reason": "no_words_left",
            "score": 4
        }"#;
        let response: ChainMoveResponse = serde_json::from_str(json).unwrap();
        assert!(response.game_over);
        assert_eq!(response.winner.as_deref(), Some("user"));
        assert_eq!(response.score, Some(4));
    }

    #[test]
    fn test_move_request_wire_shape() {
        let request = ChainMoveRequest {
            game_id: "g-1".to_string(),
            word: String::new(),
            time_up: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["game_id"], "g-1");
        assert_eq!(json["time_up"], true);
    }
}
