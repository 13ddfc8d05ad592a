//! One entry point per route: analyze, chat, suggest, summarize.
//!
//! A [`Relay`] owns the shared [`ChatClient`] and the model settings. It holds
//! no credential; every operation takes the [`Credential`] resolved for the
//! current request.

use std::sync::Arc;

use tracing::{debug, info};

use crate::DEFAULT_MODEL;
use crate::Message;
use crate::client::{ChatClient, CompletionError, CompletionRequest, SamplingParams};
use crate::credential::Credential;
use crate::interpret::{CompletionResult, classify_level, interpret};
use crate::prompt::{
    Refinement, ThinkingMode, USER_INSTRUCTION, compose, refine, suggestion_messages,
};
use crate::summarize::{self, DialogTurn, SummarizeError};

/// Model and feature settings shared by all requests.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Model for every upstream call. Default: `"gpt-4o"`.
    pub model: String,
    /// Replace the reported thinking level with a second, classifying
    /// completion. Default: `false`.
    pub classify_level: bool,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            classify_level: false,
        }
    }
}

/// Inputs for [`Relay::analyze`].
#[derive(Debug, Clone, Default)]
pub struct AnalyzeInput {
    /// Conversation log, oldest first.
    pub dialog: Vec<String>,
    /// The assistant's most recent reply.
    pub last_reply: String,
    pub mode: Option<ThinkingMode>,
    /// Rework a question produced earlier, on top of the mode.
    pub refinement: Option<Refinement>,
}

pub struct Relay {
    client: Arc<dyn ChatClient>,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(client: Arc<dyn ChatClient>, settings: RelaySettings) -> Self {
        Self { client, settings }
    }

    /// Compose, complete, and interpret a follow-up question.
    ///
    /// Upstream failures propagate. A reply that does not parse does not:
    /// it comes back as the sentinel [`CompletionResult`].
    pub async fn analyze(
        &self,
        credential: &Credential,
        input: AnalyzeInput,
    ) -> Result<CompletionResult, CompletionError> {
        let head: Vec<&String> = input.dialog.iter().take(2).collect();
        let reply_preview: String = input.last_reply.chars().take(100).collect();
        debug!(
            "Analyze: {} turn(s), first: {head:?}, reply: {reply_preview:?}, mode: {:?}, refine: {}",
            input.dialog.len(),
            input.mode,
            input.refinement.is_some()
        );

        let mut system = compose(&input.dialog, &input.last_reply, input.mode);
        if let Some(refinement) = &input.refinement {
            system = refine(system, refinement);
        }

        let request = CompletionRequest::instructed(
            &self.settings.model,
            system,
            USER_INSTRUCTION,
            SamplingParams::PROMPT_GENERATION,
        );
        let completion = self.client.complete(&request, credential).await?;

        let mut result = interpret(&completion.text, input.mode, completion.total_tokens);
        if self.settings.classify_level && !result.is_fallback() {
            let level = classify_level(
                self.client.as_ref(),
                credential,
                &self.settings.model,
                &result.prompt,
            )
            .await;
            result.thinking_level = level.selector();
        }

        info!(
            "Analyze finished: level {}, {} tokens, fallback: {}",
            result.thinking_level,
            result.token_usage,
            result.is_fallback()
        );
        Ok(result)
    }

    /// Relay a single user prompt and return the trimmed reply.
    pub async fn chat(&self, credential: &Credential, prompt: &str) -> Result<String, CompletionError> {
        let request = CompletionRequest::new(
            &self.settings.model,
            vec![Message::user(prompt)],
            SamplingParams::RELAY,
        );
        Ok(self.client.complete(&request, credential).await?.text)
    }

    /// Rewrite `prompt` in the `talce` talking style, optionally following on
    /// from the assistant's last reply.
    pub async fn suggest(
        &self,
        credential: &Credential,
        prompt: &str,
        talce: &str,
        gpt_reply: Option<&str>,
    ) -> Result<String, CompletionError> {
        let messages = suggestion_messages(prompt, talce, gpt_reply);
        debug!(
            "Suggest: {} prompt (talce: {talce:?})",
            if gpt_reply.is_some() { "dialog-based" } else { "standalone" }
        );
        let request = CompletionRequest::new(&self.settings.model, messages, SamplingParams::RELAY);
        Ok(self.client.complete(&request, credential).await?.text)
    }

    /// Summarize a conversation.
    pub async fn summarize(
        &self,
        credential: &Credential,
        history: &[DialogTurn],
    ) -> Result<String, SummarizeError> {
        summarize::summarize(
            self.client.as_ref(),
            credential,
            &self.settings.model,
            history,
        )
        .await
    }
}
