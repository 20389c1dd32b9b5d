//! OpenAI-compatible chat-completions client.
//!
//! Works against any endpoint speaking the `/chat/completions` wire format,
//! which covers hosted OpenAI as well as local servers exposing the same API.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use runsight_protocol::{Intent, IntentClassification};
use serde::Deserialize;
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;

use crate::client::{ModelClient, TokenStream};
use crate::error::{ModelError, Result};
use crate::prompt::{self, Prompt};

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_owned(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_owned(),
            temperature: 0.2,
            max_tokens: 1024,
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct OpenAiClient {
    config: OpenAiConfig,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ModelError::Configuration("missing api key".to_owned()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    fn request_body(&self, prompt: &Prompt, stream: bool) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "stream": stream,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user},
            ],
        })
    }

    async fn post(&self, prompt: &Prompt, stream: bool) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(prompt, stream))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let response = self.post(prompt, false).await?;
        let completion: Completion = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ModelError::InvalidResponse("empty choices".to_owned()))
    }

    async fn complete_streaming(&self, prompt: &Prompt) -> Result<TokenStream> {
        let response = self.post(prompt, true).await?;
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<String>>(32);

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();
            while let Some(part) = bytes.next().await {
                let part = match part {
                    Ok(part) => part,
                    Err(err) => {
                        let _ = tx.send(Err(ModelError::Streaming(err.to_string()))).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&part));
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_owned();
                    buffer.drain(..=pos);
                    match parse_sse_line(&line) {
                        SseEvent::Token(token) => {
                            if tx.send(Ok(token)).await.is_err() {
                                // Caller went away; stop reading.
                                return;
                            }
                        }
                        SseEvent::Done => return,
                        SseEvent::Ignore => {}
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn classify_intent(
        &self,
        text: &str,
        context: Option<&str>,
    ) -> Result<IntentClassification> {
        let completion = self.complete(&prompt::classification(text, context)).await?;
        parse_classification(&completion)
    }
}

#[derive(Debug, PartialEq)]
enum SseEvent {
    Token(String),
    Done,
    Ignore,
}

fn parse_sse_line(line: &str) -> SseEvent {
    let Some(data) = line.strip_prefix("data:") else {
        return SseEvent::Ignore;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseEvent::Done;
    }
    let Ok(value) = serde_json::from_str::<serde_json::Value>(data) else {
        log::warn!("Unparseable SSE event dropped: {data}");
        return SseEvent::Ignore;
    };
    match value["choices"][0]["delta"]["content"].as_str() {
        Some(token) if !token.is_empty() => SseEvent::Token(token.to_owned()),
        _ => SseEvent::Ignore,
    }
}

/// Parse the classification JSON out of a completion, tolerating markdown
/// fences around the object.
fn parse_classification(completion: &str) -> Result<IntentClassification> {
    let start = completion.find('{');
    let end = completion.rfind('}');
    let (Some(start), Some(end)) = (start, end) else {
        return Err(ModelError::InvalidResponse(
            "no JSON object in classification output".to_owned(),
        ));
    };
    let value: serde_json::Value = serde_json::from_str(&completion[start..=end])?;

    let intent_str = value["intent"]
        .as_str()
        .ok_or_else(|| ModelError::InvalidResponse("missing intent".to_owned()))?;
    let intent = Intent::parse(intent_str)
        .ok_or_else(|| ModelError::InvalidResponse(format!("unknown intent {intent_str}")))?;

    let mut filters = std::collections::BTreeMap::new();
    if let Some(map) = value["filters"].as_object() {
        for (key, val) in map {
            let rendered = match val {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => continue,
            };
            filters.insert(key.clone(), rendered);
        }
    }

    let confidence = value["confidence"].as_f64().unwrap_or(0.0) as f32;
    Ok(IntentClassification {
        intent,
        filters,
        confidence,
    })
}
