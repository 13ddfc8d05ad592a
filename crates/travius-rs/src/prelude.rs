//! Convenience re-exports for the common relay workflow.
//!
//! ```ignore
//! use travius::prelude::*;
//! ```

pub use crate::client::{
    ChatClient, Completion, CompletionError, CompletionRequest, OpenAiClient, SamplingParams,
};
pub use crate::credential::{
    Credential, CredentialError, CredentialResolver, CredentialSource, DirectoryResolver,
    RequestResolver, ResolverSettings, StaticResolver, build_resolver,
};
pub use crate::interpret::{CompletionResult, Explanation, GENERATION_FAILED};
pub use crate::prompt::{Refinement, ThinkingMode};
pub use crate::relay::{AnalyzeInput, Relay, RelaySettings};
pub use crate::summarize::{DialogTurn, Role, SummarizeError, parse_transcript};
pub use crate::{DEFAULT_MODEL, Message, MessageRole, OPENAI_BASE_URL};
