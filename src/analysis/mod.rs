//! LLM analysis of transcripts.

use crate::config::AnalysisSettings;
use crate::error::{Result, TubelensError};
use crate::openai::{create_client, is_api_key_configured};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

/// A language-model completion gateway.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Run one completion and return the model's text unmodified.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Chat-completion analyzer backed by the OpenAI API.
pub struct OpenAIAnalyzer {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIAnalyzer {
    pub fn new(model: &str, temperature: f32, max_tokens: u32) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            temperature,
            max_tokens,
        })
    }

    pub fn from_settings(settings: &AnalysisSettings) -> Result<Self> {
        Self::new(&settings.model, settings.temperature, settings.max_tokens)
    }
}

#[async_trait]
impl Analyzer for OpenAIAnalyzer {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        if !is_api_key_configured() {
            return Err(TubelensError::Analysis("OPENAI_API_KEY is not set".to_string()));
        }

        info!("Requesting analysis ({} prompt chars)", user.chars().count());

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system.to_string())
                .build()
                .map_err(|e| TubelensError::Analysis(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user.to_string())
                .build()
                .map_err(|e| TubelensError::Analysis(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens)
            .build()
            .map_err(|e| TubelensError::Analysis(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| TubelensError::OpenAI(format!("Failed to generate analysis: {}", e)))?;

        let analysis = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| TubelensError::Analysis("Empty response from LLM".to_string()))?
            .clone();

        debug!("Received {} characters of analysis", analysis.chars().count());
        Ok(analysis)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records prompts and returns a canned answer.
    pub(crate) struct MockAnalyzer {
        reply: Option<String>,
        pub(crate) prompts: Mutex<Vec<(String, String)>>,
    }

    impl MockAnalyzer {
        pub(crate) fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn last_user_prompt(&self) -> Option<String> {
            self.prompts.lock().unwrap().last().map(|(_, user)| user.clone())
        }

        pub(crate) fn call_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Analyzer for MockAnalyzer {
        async fn complete(&self, system: &str, user: &str) -> Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            self.reply
                .clone()
                .ok_or_else(|| TubelensError::OpenAI("model overloaded".to_string()))
        }
    }

    #[tokio::test]
    async fn test_mock_records_prompts() {
        let analyzer = MockAnalyzer::replying("## Summary\nok");
        let reply = analyzer.complete("sys", "user").await.unwrap();
        assert_eq!(reply, "## Summary\nok");
        assert_eq!(analyzer.last_user_prompt().as_deref(), Some("user"));
        assert_eq!(analyzer.call_count(), 1);
    }
}
