//! Conversation summaries.
//!
//! [`summarize`] turns role-tagged turns into chat messages, appends a fixed
//! summarization instruction, and returns the model's free-text answer.
//! [`parse_transcript`] converts the `Speaker: text` transcript format some
//! clients send into turns.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Message;
use crate::client::{ChatClient, CompletionError, CompletionRequest, SamplingParams};
use crate::credential::Credential;

/// Trailing instruction appended after the conversation.
pub const SUMMARY_INSTRUCTION: &str =
    "Summarize the key points of the above conversation concisely.";

/// Who said a turn. Anything other than `user` is treated as the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    User,
    Assistant,
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("user") {
            Role::User
        } else {
            Role::Assistant
        }
    }
}

/// One utterance in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogTurn {
    pub role: Role,
    pub text: String,
}

impl DialogTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }

    fn to_message(&self) -> Message {
        match self.role {
            Role::User => Message::user(&self.text),
            Role::Assistant => Message::assistant(&self.text),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("conversation history is empty")]
    EmptyHistory,

    #[error(transparent)]
    Completion(#[from] CompletionError),
}

impl SummarizeError {
    pub fn code(&self) -> &'static str {
        match self {
            SummarizeError::EmptyHistory => "EMPTY_HISTORY",
            SummarizeError::Completion(e) => e.code(),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            SummarizeError::EmptyHistory => 400,
            SummarizeError::Completion(e) => e.status(),
        }
    }
}

fn speaker_role(speaker: &str) -> Option<Role> {
    match speaker.trim() {
        "ユーザー" | "User" | "user" => Some(Role::User),
        "GPT" | "Assistant" | "assistant" => Some(Role::Assistant),
        _ => None,
    }
}

/// Parse a newline-delimited `Speaker: text` transcript.
///
/// Blank lines and lines whose speaker is not recognized are dropped.
///
/// ```
/// use travius::summarize::{DialogTurn, parse_transcript};
///
/// let turns = parse_transcript("ユーザー: hi\nGPT: hello\nnoise");
/// assert_eq!(turns, vec![DialogTurn::user("hi"), DialogTurn::assistant("hello")]);
/// ```
pub fn parse_transcript(text: &str) -> Vec<DialogTurn> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let (speaker, said) = line.split_once([':', '：'])?;
            let role = speaker_role(speaker)?;
            Some(DialogTurn {
                role,
                text: said.trim().to_string(),
            })
        })
        .collect()
}

/// Build the upstream request for a summary of `history`.
pub fn summary_request(
    history: &[DialogTurn],
    model: &str,
) -> Result<CompletionRequest, SummarizeError> {
    if history.is_empty() {
        return Err(SummarizeError::EmptyHistory);
    }
    let mut messages: Vec<Message> = history.iter().map(DialogTurn::to_message).collect();
    messages.push(Message::system(SUMMARY_INSTRUCTION));
    Ok(CompletionRequest::new(model, messages, SamplingParams::SUMMARY))
}

/// Summarize `history`. Fails with [`SummarizeError::EmptyHistory`] before
/// any network call when there is nothing to summarize.
pub async fn summarize(
    client: &dyn ChatClient,
    credential: &Credential,
    model: &str,
    history: &[DialogTurn],
) -> Result<String, SummarizeError> {
    let request = summary_request(history, model)?;
    debug!(
        "Summarizing {} turn(s), {} message(s) including instruction",
        history.len(),
        request.messages.len()
    );

    let completion = client.complete(&request, credential).await?;
    let preview: String = completion.text.chars().take(300).collect();
    debug!("Summary (first 300 chars): {preview}");
    Ok(completion.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageRole;
    use crate::testing::{ScriptedClient, test_credential};

    #[test]
    fn transcript_roles_are_mapped() {
        let turns = parse_transcript("ユーザー: hi\nGPT: hello");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, "hi");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].text, "hello");
    }

    #[test]
    fn transcript_drops_blank_and_unknown_lines() {
        let turns = parse_transcript("\n  \nUser: a\nSomeone: b\nno colon here\n Assistant：c \n");
        assert_eq!(turns, vec![DialogTurn::user("a"), DialogTurn::assistant("c")]);
    }

    #[test]
    fn transcript_keeps_colons_in_text() {
        let turns = parse_transcript("GPT: ratio is 3:2");
        assert_eq!(turns[0].text, "ratio is 3:2");
    }

    #[test]
    fn history_roles_deserialize_leniently() {
        let turns: Vec<DialogTurn> = serde_json::from_str(
            r#"[{"role":"user","text":"q"},{"role":"gpt","text":"a"},{"role":"assistant","text":"b"}]"#,
        )
        .unwrap();
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[2].role, Role::Assistant);
    }

    #[test]
    fn request_appends_instruction_last() {
        let history = vec![DialogTurn::user("q"), DialogTurn::assistant("a")];
        let request = summary_request(&history, "gpt-4o").unwrap();
        assert_eq!(request.params, SamplingParams::SUMMARY);
        let roles: Vec<MessageRole> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::User, MessageRole::Assistant, MessageRole::System]
        );
        assert_eq!(request.messages[2].content, SUMMARY_INSTRUCTION);
    }

    #[tokio::test]
    async fn empty_history_makes_no_call() {
        let client = ScriptedClient::new().reply("unused");
        let err = summarize(&client, &test_credential(), "gpt-4o", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::EmptyHistory));
        assert_eq!(err.code(), "EMPTY_HISTORY");
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn returns_completion_text() {
        let client = ScriptedClient::new().reply("They discussed flywheels.");
        let summary = summarize(
            &client,
            &test_credential(),
            "gpt-4o",
            &[DialogTurn::user("What is a flywheel?")],
        )
        .await
        .unwrap();
        assert_eq!(summary, "They discussed flywheels.");
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let client = ScriptedClient::new().fail(503);
        let err = summarize(&client, &test_credential(), "gpt-4o", &[DialogTurn::user("q")])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UPSTREAM_ERROR");
        assert_eq!(err.status(), 502);
    }
}
