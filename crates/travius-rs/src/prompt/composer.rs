//! Renders the system instructions sent upstream.
//!
//! Every function here is pure: same inputs, same text.

use crate::Message;

use super::builder::SystemPromptBuilder;
use super::modes::{FALLBACK_INSTRUCTION, ThinkingMode};

/// Fixed user instruction that accompanies a composed system instruction.
pub const USER_INSTRUCTION: &str = "Respond in the format described above.";

/// Placeholder rendered when the conversation log is empty.
pub const EMPTY_LOG: &str = "(no prior turns)";

const ADVISOR_PREAMBLE: &str = "\
You are an AI advisor who thinks in structures.

You move back and forth between the abstract and the concrete to rebuild meaning. \
You treat events and friction points as structured relationships, stay aware of \
where each question sits in a hierarchy of thought, use abstraction to organize \
concepts and concreteness to look for applications, and can jump to a different \
context without losing the thread.";

const OUTPUT_ORDER: &str = "\
Good questions deepen in this order:
- Structure: break the situation into elements, relationships, and background conditions.
- Essence: from that structure, surface the abstract meaning, such as habits of \
judgement, values, or mismatched assumptions.
- Expansion: use that meaning to re-pose the question in another context, for other \
people, or for the future.";

const QUALITY_BAR: &str = "\
A question is satisfying when:
- the path between abstract and concrete is smooth, with no unexplained leaps;
- it carries an essence the reader could apply to their own situation;
- it leaves room to think instead of asserting a conclusion;
- it gives a sense of structural clarity or discovery.";

const HYPOTHESIS_PROFILES: &str = "\
When forming a starting hypothesis, lean on one of four profiles, formed by an \
internal or external origin crossed with a structural or symbolic reading:
- Internal × Structural: clarify inner causes and decision criteria.
- Internal × Symbolic: dig into meaning through feelings, memories, and metaphors.
- External × Structural: reason from social background and relationship structures.
- External × Symbolic: read the symbolic meaning behind events and remarks.";

const TASK: &str = "\
Based on the assistant's previous reply below, compose the one question the user \
should send to the assistant next: a question that goes one step further and \
deepens their thinking.";

const CONSTRAINTS: &str = "\
- Word the question so a person could send it to the assistant as-is: clear and approachable.
- Never address the user directly.
- Output exactly one question for the assistant, in a single sentence.";

const OUTPUT_FORMAT: &str = "\
Output JSON only, as exactly one object with a single string field named \"prompt\":

{
  \"prompt\": \"(the one-sentence question for the assistant)\"
}

Detect the language used in the assistant's previous reply and write the question \
in that language. If languages are mixed, use the one used most.";

/// Render the conversation log as a numbered list in input order.
///
/// ```
/// use travius::prompt::render_dialog;
///
/// let lines = vec!["hello".to_string(), "how are you".to_string()];
/// assert_eq!(render_dialog(&lines), "turn 1: hello\nturn 2: how are you");
/// assert_eq!(render_dialog(&[]), "(no prior turns)");
/// ```
pub fn render_dialog(dialog: &[String]) -> String {
    if dialog.is_empty() {
        return EMPTY_LOG.to_string();
    }
    dialog
        .iter()
        .enumerate()
        .map(|(idx, line)| format!("turn {}: {line}", idx + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

fn mode_section(mode: Option<ThinkingMode>) -> String {
    match mode {
        Some(mode) => format!(
            "Use mode {} for this question.\n{}\nFollowing this mode, compose one deep, \
             structured question to send back to the assistant next.",
            mode.selector(),
            mode.instruction()
        ),
        None => FALLBACK_INSTRUCTION.to_string(),
    }
}

/// Build the system instruction for follow-up question generation.
///
/// Never fails: an absent mode uses the generic fallback fragment and an
/// empty log renders a placeholder.
pub fn compose(dialog: &[String], last_reply: &str, mode: Option<ThinkingMode>) -> String {
    SystemPromptBuilder::new(ADVISOR_PREAMBLE)
        .section("How Output Unfolds", OUTPUT_ORDER)
        .section("Quality Bar", QUALITY_BAR)
        .section("Hypothesis Profiles", HYPOTHESIS_PROFILES)
        .section("Thinking Mode", mode_section(mode))
        .section("Task", TASK)
        .section("Constraints", CONSTRAINTS)
        .section("Output Format", OUTPUT_FORMAT)
        .section("Conversation Log", render_dialog(dialog))
        .section("Previous Assistant Reply", last_reply)
        .build()
}

/// A request to rework a question produced earlier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refinement {
    pub previous_prompt: String,
    pub supplement: Option<String>,
}

/// Layer a refinement request on top of a composed instruction.
///
/// The base instruction, including its thinking mode, stays intact; the
/// refinement adds the earlier question and optional extra guidance.
pub fn refine(base: String, refinement: &Refinement) -> String {
    let supplement = refinement
        .supplement
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    SystemPromptBuilder::new(base)
        .section(
            "Refinement",
            format!(
                "A question was already produced for this conversation:\n{}\n\n\
                 Improve on it instead of repeating it. Keep the output format above.",
                refinement.previous_prompt.trim()
            ),
        )
        .section_opt("Additional Guidance", supplement)
        .build()
}

/// Messages for the `/suggest` relay.
///
/// With `gpt_reply`, the suggestion builds on the assistant's last answer;
/// without it, the prompt is restyled on its own. `talce` is the requested
/// talking style.
pub fn suggestion_messages(prompt: &str, talce: &str, gpt_reply: Option<&str>) -> Vec<Message> {
    let base = SystemPromptBuilder::new(
        "You help a user write the next message they will send to an AI assistant.",
    )
    .section("Talking Style", talce.trim())
    .section(
        "Task",
        "Rewrite the user's draft so it keeps its intent, reads naturally in the \
         talking style above, and is ready to send as-is. Reply with the rewritten \
         message only, in the language of the draft.",
    );

    let system = match gpt_reply.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reply) => base
            .section(
                "Context",
                "The draft answers the assistant reply below. Make the rewritten \
                 message follow on from it.",
            )
            .section("Previous Assistant Reply", reply)
            .build(),
        None => base.build(),
    };

    vec![Message::system(system), Message::user(prompt)]
}

/// System and user instructions for the thinking-level classifier.
pub fn classification_instruction(question: &str) -> (String, String) {
    let labels = ThinkingMode::ALL
        .iter()
        .map(|m| format!("- \"{}\"", m.label()))
        .collect::<Vec<_>>()
        .join("\n");

    let system = SystemPromptBuilder::new(
        "You classify a question by the kind of thinking it asks for.",
    )
    .section("Categories", labels)
    .section(
        "Output Format",
        "Output JSON only, as exactly one object: {\"level\": \"<one category above>\"}",
    )
    .build();

    (system, format!("Question:\n{question}"))
}
