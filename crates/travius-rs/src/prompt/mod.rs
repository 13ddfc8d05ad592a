//! System instruction composition.
//!
//! - [`SystemPromptBuilder`] joins a preamble and `## Section` blocks.
//! - [`ThinkingMode`] holds the four framing presets and their fragments.
//! - [`compose`] renders the follow-up question instruction; [`refine`],
//!   [`suggestion_messages`], and [`classification_instruction`] cover the
//!   other upstream calls.

pub mod builder;
pub mod composer;
pub mod modes;

pub use builder::SystemPromptBuilder;
pub use composer::{
    EMPTY_LOG, Refinement, USER_INSTRUCTION, classification_instruction, compose, refine,
    render_dialog, suggestion_messages,
};
pub use modes::{FALLBACK_INSTRUCTION, ThinkingMode, level_for};
