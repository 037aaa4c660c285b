//! Gemini REST client.
//!
//! Thin wrapper over `models/{model}:generateContent` and
//! `models/{model}:streamGenerateContent?alt=sse`. Response parsing and the
//! SSE line decoder are plain functions so they can be tested without a
//! server.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT_SECS: u64 = 120;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Incremental text fragments of a streamed response, in generation order.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

// =============================================================================
// REQUEST TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

/// One conversation turn. `role` is `"user"` or `"model"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: &str) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part { text: text.to_string() }],
        }
    }

    pub fn model(text: &str) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part { text: text.to_string() }],
        }
    }
}

/// A provider-neutral description of one generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub contents: Vec<Content>,
    pub system_instruction: Option<String>,
    /// When set, the response is constrained to JSON matching this schema
    pub response_schema: Option<serde_json::Value>,
}

impl GenerateRequest {
    pub fn prompt(model: &str, prompt: &str) -> Self {
        Self {
            model: model.to_string(),
            contents: vec![Content::user(prompt)],
            system_instruction: None,
            response_schema: None,
        }
    }
}

/// The wire seam between the generation client and the remote service
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    /// Single-shot generation; returns the full response text
    async fn generate(&self, api_key: &str, request: &GenerateRequest) -> Result<String, GenerationError>;

    /// Streaming generation; the stream ends after the final fragment
    async fn stream(&self, api_key: &str, request: &GenerateRequest) -> Result<TextStream, GenerationError>;
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest<'a> {
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn build_body(request: &GenerateRequest) -> ApiRequest<'_> {
    ApiRequest {
        contents: &request.contents,
        system_instruction: request.system_instruction.as_ref().map(|text| SystemInstruction {
            parts: vec![Part { text: text.clone() }],
        }),
        generation_config: request.response_schema.as_ref().map(|schema| GenerationConfig {
            response_mime_type: "application/json",
            response_schema: schema,
        }),
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Concatenated text of the first candidate, or `None` if it carries none
fn candidate_text(json: &str) -> Result<Option<String>, GenerationError> {
    let api: ApiResponse = serde_json::from_str(json).map_err(|e| GenerationError::ApiParse(e.to_string()))?;

    let text: String = api
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    Ok(if text.is_empty() { None } else { Some(text) })
}

pub fn parse_response(json: &str) -> Result<String, GenerationError> {
    candidate_text(json)?.ok_or(GenerationError::EmptyResponse)
}

/// Splits a Server-Sent Events byte stream into text fragments.
///
/// Bytes are buffered until a full line is available, so events and UTF-8
/// sequences split across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk; returns the fragments completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, GenerationError>> {
        self.buffer.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            if let Some(fragment) = decode_line(&line) {
                out.push(fragment);
            }
        }
        out
    }

    /// Flush a trailing line that was not newline-terminated
    pub fn finish(&mut self) -> Vec<Result<String, GenerationError>> {
        let line = std::mem::take(&mut self.buffer);
        decode_line(&line).into_iter().collect()
    }
}

fn decode_line(raw: &[u8]) -> Option<Result<String, GenerationError>> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\r', '\n']);

    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    match candidate_text(data) {
        Ok(Some(text)) => Some(Ok(text)),
        Ok(None) => None,
        Err(e) => Some(Err(e)),
    }
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(base_url: &str) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| GenerationError::HttpClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, url: &str, api_key: &str, request: &GenerateRequest) -> Result<reqwest::Response, GenerationError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&build_body(request))
            .send()
            .await
            .map_err(|e| GenerationError::ApiRequest(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::ApiResponse { status, body });
        }

        Ok(response)
    }
}

#[async_trait]
impl GenerationTransport for GeminiClient {
    async fn generate(&self, api_key: &str, request: &GenerateRequest) -> Result<String, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);

        let response = self.post(&url, api_key, request).await?;
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::ApiRequest(e.to_string()))?;

        parse_response(&text)
    }

    async fn stream(&self, api_key: &str, request: &GenerateRequest) -> Result<TextStream, GenerationError> {
        let url = format!("{}/models/{}:streamGenerateContent?alt=sse", self.base_url, request.model);

        let response = self.post(&url, api_key, request).await?;
        let bytes = Box::pin(response.bytes_stream());

        let state = (bytes, SseDecoder::new(), VecDeque::new(), false);
        let stream: TextStream = Box::pin(futures_util::stream::unfold(state, |(mut bytes, mut decoder, mut pending, mut done)| async move {
            loop {
                if let Some(item) = pending.pop_front() {
                    return Some((item, (bytes, decoder, pending, done)));
                }
                if done {
                    return None;
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => pending.extend(decoder.push(&chunk)),
                    Some(Err(e)) => {
                        done = true;
                        pending.push_back(Err(GenerationError::ApiRequest(e.to_string())));
                    }
                    None => {
                        done = true;
                        pending.extend(decoder.finish());
                    }
                }
            }
        }));

        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(text: &str) -> String {
        format!(
            "data: {{\"candidates\":[{{\"content\":{{\"role\":\"model\",\"parts\":[{{\"text\":{}}}]}}}}]}}\r\n\r\n",
            serde_json::to_string(text).unwrap()
        )
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}],"role":"model"}}]}"#;
        assert_eq!(parse_response(json).unwrap(), "Hello world");
    }

    #[test]
    fn test_parse_response_without_candidates_is_empty() {
        let err = parse_response(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
    }

    #[test]
    fn test_parse_response_rejects_garbage() {
        assert!(matches!(parse_response("<html>"), Err(GenerationError::ApiParse(_))));
    }

    #[test]
    fn test_sse_decoder_handles_split_events() {
        let stream = format!("{}{}", event("Hel"), event("lo"));
        let bytes = stream.as_bytes();
        let (a, b) = bytes.split_at(17);

        let mut decoder = SseDecoder::new();
        let mut fragments: Vec<String> = decoder.push(a).into_iter().map(Result::unwrap).collect();
        assert!(fragments.is_empty());
        fragments.extend(decoder.push(b).into_iter().map(Result::unwrap));
        fragments.extend(decoder.finish().into_iter().map(Result::unwrap));

        assert_eq!(fragments, vec!["Hel", "lo"]);
    }

    #[test]
    fn test_sse_decoder_keeps_multibyte_chars_split_across_chunks() {
        let stream = event("Minas Gerais: Varginha, 1996 ☄");
        let bytes = stream.as_bytes();
        let comet = stream.find('☄').unwrap();
        let (a, b) = bytes.split_at(comet + 1);

        let mut decoder = SseDecoder::new();
        assert!(decoder.push(a).is_empty());
        let out: Vec<String> = decoder.push(b).into_iter().map(Result::unwrap).collect();
        assert_eq!(out, vec!["Minas Gerais: Varginha, 1996 ☄"]);
    }

    #[test]
    fn test_sse_decoder_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        let line = event(" world");
        let trimmed = line.trim_end();
        assert!(decoder.push(trimmed.as_bytes()).is_empty());
        let out: Vec<String> = decoder.finish().into_iter().map(Result::unwrap).collect();
        assert_eq!(out, vec![" world"]);
    }

    #[test]
    fn test_sse_decoder_skips_non_data_and_textless_events() {
        let mut decoder = SseDecoder::new();
        let input = ": keep-alive\nevent: message\ndata: {\"candidates\":[{\"finishReason\":\"STOP\"}]}\n\n";
        assert!(decoder.push(input.as_bytes()).is_empty());
    }

    #[test]
    fn test_sse_decoder_reports_malformed_event() {
        let mut decoder = SseDecoder::new();
        let out = decoder.push(b"data: {oops\n");
        assert_eq!(out.len(), 1);
        assert!(out[0].is_err());
    }

    #[test]
    fn test_request_body_shape() {
        let mut request = GenerateRequest::prompt("gemini-2.5-flash", "hi");
        request.system_instruction = Some("be terse".to_string());
        request.response_schema = Some(serde_json::json!({"type": "OBJECT"}));

        let body = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be terse");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_plain_request_omits_optional_sections() {
        let request = GenerateRequest::prompt("gemini-2.5-flash", "hi");
        let body = serde_json::to_value(build_body(&request)).unwrap();
        assert!(body.get("systemInstruction").is_none());
        assert!(body.get("generationConfig").is_none());
    }
}
