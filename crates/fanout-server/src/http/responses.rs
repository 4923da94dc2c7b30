//! HTTP request and response types.

use fanout_supervisor::{AggregatedResult, PromptRequest};
use serde::{Deserialize, Serialize};

/// Request body for the prompt endpoints.
#[derive(Debug, Deserialize)]
pub struct PromptBody {
    /// Free-text instruction.
    pub prompt: String,

    /// Optional explicit URLs to fan out over the scraper workers.
    #[serde(default)]
    pub urls: Vec<String>,

    /// Optional caller-supplied session id, reused as the run id.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl PromptBody {
    pub fn into_request(self) -> PromptRequest {
        let mut request = PromptRequest::new(self.prompt).with_urls(self.urls);
        if let Some(session_id) = self.session_id {
            request = request.with_session_id(session_id);
        }
        request
    }
}

/// Response body for the synchronous prompt endpoint.
#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub response: String,
    pub session_id: String,

    /// Present and true when the run deadline forced a partial aggregation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,

    /// Order id extracted from an action reply, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl From<AggregatedResult> for PromptResponse {
    fn from(result: AggregatedResult) -> Self {
        Self {
            response: result.response,
            session_id: result.run_id.into_inner(),
            partial: result.partial.then_some(true),
            order_id: result.order_id,
        }
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_body_defaults() {
        let body: PromptBody =
            serde_json::from_str(r#"{"prompt": "how much coffee?"}"#).unwrap();
        assert!(body.urls.is_empty());
        assert!(body.session_id.is_none());

        let request = body.into_request();
        assert_eq!(request.prompt, "how much coffee?");
    }

    #[test]
    fn test_partial_omitted_when_false() {
        let response = PromptResponse {
            response: "5000 lbs".to_string(),
            session_id: "s-1".to_string(),
            partial: None,
            order_id: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("partial"));
        assert!(!json.contains("order_id"));
    }
}
