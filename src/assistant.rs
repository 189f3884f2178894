// src/assistant.rs
use crate::error::{DashboardError, Result};
use crate::insight::{InsightRequest, InsightSource};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FALLBACK_REPLY: &str =
    "I apologize, but I'm having trouble connecting right now. Please try again in a moment.";

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub coin_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub role: &'static str,
    pub content: String,
    /// Set when the collaborator failed and the stock apology was returned.
    pub degraded: bool,
}

pub fn greeting(coin_context: Option<&str>) -> String {
    match coin_context {
        Some(coin) => format!(
            "Hi! I'm your AI crypto assistant. I see you're looking at {}. What would you like to know about it?",
            coin
        ),
        None => "Hi! I'm your AI crypto assistant. Ask me anything about cryptocurrencies, market trends, or investment strategies!".to_string(),
    }
}

fn build_prompt(question: &str, coin_context: Option<&str>) -> String {
    let context = coin_context
        .map(|coin| format!("The user is currently viewing {}.\n", coin))
        .unwrap_or_default();
    format!(
        "You are a concise, well-informed cryptocurrency assistant.\n{}\nQuestion: {}\n\n\
         Answer in under 200 words. When discussing prices or predictions, add a short note \
         that crypto markets are volatile.",
        context, question
    )
}

/// The service may answer with a bare string or wrap it in an object.
fn reply_text(reply: &Value) -> Option<String> {
    let text = match reply {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => ["response", "content", "answer"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    };
    text.filter(|s| !s.trim().is_empty())
}

pub async fn answer(source: &dyn InsightSource, request: ChatRequest) -> Result<ChatReply> {
    let question = request.message.trim();
    if question.is_empty() {
        return Err(DashboardError::InvalidInput("message must not be empty".into()));
    }

    let context = request
        .coin_context
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let outcome = source
        .invoke(InsightRequest {
            prompt: build_prompt(question, context),
            add_context_from_internet: true,
            response_json_schema: None,
        })
        .await;

    let content = match outcome {
        Ok(reply) => reply_text(&reply),
        Err(e) => {
            warn!("Assistant request failed: {}", e);
            None
        }
    };

    Ok(match content {
        Some(content) => ChatReply {
            role: "assistant",
            content,
            degraded: false,
        },
        None => ChatReply {
            role: "assistant",
            content: FALLBACK_REPLY.to_string(),
            degraded: true,
        },
    })
}
