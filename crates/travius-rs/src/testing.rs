//! Scripted [`ChatClient`] for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::client::{ChatClient, Completion, CompletionError, CompletionFuture, CompletionRequest};
use crate::credential::Credential;

pub(crate) const TEST_KEY: &str = "sk-test-0123456789abcdefghij";

pub(crate) fn test_credential() -> Credential {
    Credential::new(TEST_KEY)
}

/// Replays queued replies in order and records every request it receives.
/// Once the queue is empty, further calls fail as upstream errors.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    replies: Mutex<VecDeque<Result<Completion, CompletionError>>>,
    pub(crate) requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, text: &str) -> Self {
        self.reply_with_usage(text, 0)
    }

    pub(crate) fn reply_with_usage(self, text: &str, total_tokens: u32) -> Self {
        self.replies.lock().unwrap().push_back(Ok(Completion {
            text: text.to_string(),
            total_tokens,
        }));
        self
    }

    pub(crate) fn fail(self, status: u16) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(CompletionError::Upstream {
                status: Some(status),
                detail: "scripted failure".into(),
            }));
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl ChatClient for ScriptedClient {
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
        _credential: &'a Credential,
    ) -> CompletionFuture<'a> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(CompletionError::Upstream {
                        status: None,
                        detail: "no scripted reply left".into(),
                    })
                })
        })
    }
}
