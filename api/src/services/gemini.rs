//! Gemini `generateContent` client with Google Maps grounding.
//!
//! Sends a single user prompt with the `googleMaps` tool enabled and returns
//! the reply text together with the map places the answer was grounded on.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Reply text plus the places it cites.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundedReply {
    pub text: String,
    pub places: Vec<GroundedPlace>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroundedPlace {
    /// Absent when the grounding chunk carried no title.
    pub title: Option<String>,
    pub uri: String,
}

// --- Gemini request types ---

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    tools: Vec<RequestTool>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct RequestTool {
    #[serde(rename = "googleMaps")]
    google_maps: serde_json::Map<String, serde_json::Value>,
}

// --- Gemini response types ---

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
    #[serde(rename = "groundingMetadata")]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroundingMetadata {
    #[serde(rename = "groundingChunks", default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    maps: Option<MapsChunk>,
}

#[derive(Debug, Deserialize)]
struct MapsChunk {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct GroundedSearchClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GroundedSearchClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Ask the model `prompt` with Maps grounding enabled.
    pub async fn search(&self, prompt: &str) -> Result<GroundedReply, AppError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
            tools: vec![RequestTool {
                google_maps: serde_json::Map::new(),
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map_or(body, |envelope| envelope.error.message);
            return Err(AppError::ExternalServiceError(format!(
                "Gemini API error ({}): {}",
                status.as_u16(),
                message
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Gemini JSON parse error: {}", e))
        })?;

        Ok(into_reply(body))
    }
}

impl Debug for GroundedSearchClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GroundedSearchClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Concatenate the first candidate's text parts and collect its map places.
fn into_reply(body: GenerateContentResponse) -> GroundedReply {
    let Some(candidate) = body.candidates.into_iter().next() else {
        return GroundedReply {
            text: String::new(),
            places: Vec::new(),
        };
    };

    let text = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default();

    let places = candidate
        .grounding_metadata
        .map(|m| m.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|chunk| chunk.maps)
        .map(|maps| GroundedPlace {
            title: maps.title,
            uri: maps.uri.unwrap_or_default(),
        })
        .collect();

    GroundedReply { text, places }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GroundedSearchClient {
        GroundedSearchClient::new(
            &server.uri(),
            "test-key",
            "gemini-2.5-flash",
            "airguard-test",
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_search_sends_maps_tool_and_parses_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "where is it" }] }],
                "tools": [{ "googleMaps": {} }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [
                            { "text": "LOCATION: Ferry Building | " },
                            { "text": "COORDS: [37.7955, -122.3937]" }
                        ]
                    },
                    "groundingMetadata": {
                        "groundingChunks": [
                            { "maps": { "uri": "https://maps.google.com/?cid=1", "title": "Ferry Building" } },
                            { "web": { "uri": "https://example.org" } },
                            { "maps": { "uri": "https://maps.google.com/?cid=2" } }
                        ]
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server).search("where is it").await.unwrap();

        assert_eq!(
            reply.text,
            "LOCATION: Ferry Building | COORDS: [37.7955, -122.3937]"
        );
        assert_eq!(reply.places.len(), 2);
        assert_eq!(reply.places[0].title.as_deref(), Some("Ferry Building"));
        assert_eq!(reply.places[1].title, None);
        assert_eq!(reply.places[1].uri, "https://maps.google.com/?cid=2");
    }

    #[tokio::test]
    async fn test_empty_candidates_is_empty_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let reply = client(&server).search("anything").await.unwrap();
        assert!(reply.text.is_empty());
        assert!(reply.places.is_empty());
    }

    #[tokio::test]
    async fn test_api_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT" }
            })))
            .mount(&server)
            .await;

        let err = client(&server).search("anything").await.unwrap_err();
        match err {
            AppError::ExternalServiceError(msg) => {
                assert_eq!(msg, "Gemini API error (400): API key not valid")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let c = GroundedSearchClient::new(
            "http://localhost",
            "secret",
            "m",
            "ua",
            Duration::from_secs(1),
        );
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("[REDACTED]"));
    }
}
