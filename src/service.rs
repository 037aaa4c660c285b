//! Research operations on top of the generation transport.
//!
//! Every operation degrades instead of failing: a missing credential or a
//! remote error is logged and turned into an empty list or a fixed message.

use std::sync::Arc;

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::credentials::CredentialProvider;
use crate::gemini::{Content, GenerateRequest, GenerationTransport};
use crate::model::NewsArticle;

pub const NEWS_PROMPT: &str = "List the top 5 most significant news articles or developments about UFOs or UAPs from the last week. For each, provide a title, a direct URL, and a one or two-sentence summary.";

pub const CHAT_SYSTEM_INSTRUCTION: &str = "You are a highly intelligent research assistant specializing in UFOlogy, UAP phenomena, and analysis of government documents. Your goal is to help the user find connections, analyze data, draft Freedom of Information Act (FOIA) requests, and explore hypotheses. Be objective, analytical, and cite sources when possible.";

pub const MISSING_KEY_MESSAGE: &str = "API key not configured. Please set it in the setup screen.";
pub const MISSING_TOPIC_MESSAGE: &str = "Please provide a topic.";
pub const IDEAS_FAILED_MESSAGE: &str = "An error occurred while generating ideas. Please try again.";
pub const ANALYSIS_FAILED_MESSAGE: &str = "Failed to analyze the document. Please try again.";

/// Output schema for the news request: `{articles: [{title, uri, summary}]}`
pub fn news_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "articles": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "uri": { "type": "STRING" },
                        "summary": { "type": "STRING" }
                    },
                    "required": ["title", "uri", "summary"]
                }
            }
        }
    })
}

#[derive(Deserialize)]
struct NewsPayload {
    #[serde(default)]
    articles: Vec<NewsArticle>,
}

/// Parse the structured news payload. Any malformed item fails the whole parse.
pub fn parse_news(json: &str) -> Result<Vec<NewsArticle>, serde_json::Error> {
    let payload: NewsPayload = serde_json::from_str(json)?;
    Ok(payload.articles)
}

pub fn social_ideas_prompt(topic: &str) -> String {
    format!(
        "Generate 5 creative and engaging social media post ideas about {}. Include a mix of formats like questions, facts, and story prompts. Format the output as a markdown list.",
        topic
    )
}

pub fn analysis_prompt(file_name: &str, content: &str) -> String {
    format!(
        "As a UFO research analyst, analyze the following document named \"{file_name}\". Provide a concise summary that includes:
1. Key entities (people, places, organizations).
2. A brief timeline of events if applicable.
3. Any potential connections to other known UAP cases, technologies, or phenomena.
4. An overall assessment of the document's significance.

Document Content:
---
{content}
---
"
    )
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct GenerationClient {
    transport: Arc<dyn GenerationTransport>,
    credentials: Arc<dyn CredentialProvider>,
    model: String,
}

impl GenerationClient {
    pub fn new(
        transport: Arc<dyn GenerationTransport>,
        credentials: Arc<dyn CredentialProvider>,
        model: &str,
    ) -> Self {
        Self {
            transport,
            credentials,
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn fetch_recent_news(&self) -> Vec<NewsArticle> {
        let Some(api_key) = self.credentials.credential() else {
            warn!("news: no API key configured");
            return Vec::new();
        };

        let mut request = GenerateRequest::prompt(&self.model, NEWS_PROMPT);
        request.response_schema = Some(news_schema());

        let text = match self.transport.generate(&api_key, &request).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "news: request failed");
                return Vec::new();
            }
        };

        match parse_news(&text) {
            Ok(articles) => {
                info!(count = articles.len(), "news: fetched");
                articles
            }
            Err(e) => {
                error!(error = %e, body_len = text.len(), "news: could not parse structured response");
                Vec::new()
            }
        }
    }

    /// Start a conversation; `None` when no credential is configured
    pub fn init_chat(&self) -> Option<ChatSession> {
        let Some(api_key) = self.credentials.credential() else {
            warn!("chat: no API key configured");
            return None;
        };

        Some(ChatSession {
            transport: Arc::clone(&self.transport),
            api_key,
            model: self.model.clone(),
            history: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub async fn generate_social_post_ideas(&self, topic: &str) -> String {
        let Some(api_key) = self.credentials.credential() else {
            return MISSING_KEY_MESSAGE.to_string();
        };
        if topic.trim().is_empty() {
            return MISSING_TOPIC_MESSAGE.to_string();
        }

        let request = GenerateRequest::prompt(&self.model, &social_ideas_prompt(topic));
        match self.transport.generate(&api_key, &request).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "ideas: request failed");
                IDEAS_FAILED_MESSAGE.to_string()
            }
        }
    }

    pub async fn analyze_file_content(&self, file_name: &str, content: &str) -> String {
        let Some(api_key) = self.credentials.credential() else {
            return MISSING_KEY_MESSAGE.to_string();
        };

        let request = GenerateRequest::prompt(&self.model, &analysis_prompt(file_name, content));
        match self.transport.generate(&api_key, &request).await {
            Ok(text) => {
                info!(file_name, content_len = content.len(), "analysis: complete");
                text
            }
            Err(e) => {
                error!(error = %e, file_name, "analysis: request failed");
                ANALYSIS_FAILED_MESSAGE.to_string()
            }
        }
    }
}

// =============================================================================
// CHAT SESSION
// =============================================================================

/// Progress of one streamed reply. A send yields any number of fragments
/// followed by exactly one `Completed` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Fragment(String),
    Completed,
    Failed(String),
}

/// A stateful conversation. Clones share the same history.
#[derive(Clone)]
pub struct ChatSession {
    transport: Arc<dyn GenerationTransport>,
    api_key: String,
    model: String,
    history: Arc<Mutex<Vec<Content>>>,
}

impl ChatSession {
    #[cfg(test)]
    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }

    /// Send `message` and report the reply through `on_event`.
    ///
    /// The history lock is held for the whole exchange, so concurrent sends on
    /// one session are serialized. History only grows when the reply completes.
    pub async fn send_message_stream<F>(&self, message: &str, mut on_event: F)
    where
        F: FnMut(ChatEvent) + Send,
    {
        let mut history = self.history.lock().await;

        let mut contents = history.clone();
        contents.push(Content::user(message));
        let request = GenerateRequest {
            model: self.model.clone(),
            contents,
            system_instruction: Some(CHAT_SYSTEM_INSTRUCTION.to_string()),
            response_schema: None,
        };

        let mut stream = match self.transport.stream(&self.api_key, &request).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "chat: could not open stream");
                on_event(ChatEvent::Failed(e.to_string()));
                return;
            }
        };

        let mut reply = String::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => {
                    reply.push_str(&fragment);
                    on_event(ChatEvent::Fragment(fragment));
                }
                Err(e) => {
                    error!(error = %e, received = reply.len(), "chat: stream failed");
                    on_event(ChatEvent::Failed(e.to_string()));
                    return;
                }
            }
        }

        // Empty model turns never enter history
        if reply.is_empty() {
            warn!("chat: stream ended without text");
            on_event(ChatEvent::Failed("empty reply".to_string()));
            return;
        }

        history.push(Content::user(message));
        history.push(Content::model(&reply));
        info!(turns = history.len(), "chat: reply complete");
        on_event(ChatEvent::Completed);
    }
}
