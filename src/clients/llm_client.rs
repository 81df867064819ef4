//! LLM reasoning client
//!
//! The stages never talk to a model directly; they hand a prompt plus
//! structured context to a [`Reasoner`] and get structured JSON back.
//!
//! ## Stack
//! - `async-openai` for the chat completion call
//! - works with any OpenAI-compatible endpoint (Azure, Gemini, Doubao, local gateways)

use std::fmt;
use std::sync::OnceLock;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};

/// Pipeline stage a prompt belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    StandardExtractor,
    EvidenceMapper,
    ReportGenerator,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::StandardExtractor => "standard_extractor",
            Stage::EvidenceMapper => "evidence_mapper",
            Stage::ReportGenerator => "report_generator",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A natural-language instruction for one stage
#[derive(Debug, Clone)]
pub struct ReasoningPrompt {
    pub stage: Stage,
    pub system: String,
    pub instruction: String,
}

/// Opaque text-reasoning capability
///
/// No determinism guarantee: callers validate the shape of whatever comes back.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn reason(&self, prompt: &ReasoningPrompt, context: &Value) -> AppResult<Value>;
}

/// Reasoner backed by an OpenAI-compatible chat completion API
pub struct OpenAiReasoner {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: Option<f32>,
    max_tokens: u32,
}

impl OpenAiReasoner {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
        }
    }

    /// Send one system + user exchange and return the trimmed reply text
    pub async fn send_to_llm(&self, user_message: &str, system_message: &str) -> AppResult<String> {
        debug!("Calling LLM API, model: {}", self.model_name);
        debug!("User message length: {} chars", user_message.len());

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_message)
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        let messages = vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ];

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model_name)
            .messages(messages)
            .max_tokens(self.max_tokens);
        if let Some(temperature) = self.temperature {
            builder.temperature(temperature);
        }
        let request = builder
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API call failed: {}", e);
            AppError::llm_api_failed(&self.model_name, e)
        })?;

        debug!("LLM API call succeeded");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl Reasoner for OpenAiReasoner {
    async fn reason(&self, prompt: &ReasoningPrompt, context: &Value) -> AppResult<Value> {
        let context_json = serde_json::to_string_pretty(context)?;
        let user_message = format!(
            "{}\n\nContext (JSON):\n{}\n\nRespond with JSON only.",
            prompt.instruction, context_json
        );

        debug!("[{}] reasoning over {} bytes of context", prompt.stage, context_json.len());

        let response = self.send_to_llm(&user_message, &prompt.system).await?;
        parse_json_output(&response)
    }
}

/// Parse model output as JSON, tolerating a surrounding Markdown code fence
pub fn parse_json_output(response: &str) -> AppResult<Value> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").expect("fence pattern is valid")
    });

    let body = fence
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(response)
        .trim();

    serde_json::from_str(body).map_err(|e| {
        AppError::Llm(LlmError::InvalidJson {
            reason: format!("{} (response: {})", e, crate::utils::truncate_text(response, 200)),
        })
    })
}

/// Pull the array out of `[...]` or `{"<key>": [...]}`
pub fn unwrap_array(value: Value, key: &str) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}
