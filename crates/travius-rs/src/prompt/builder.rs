//! Structured system prompt builder.
//!
//! [`SystemPromptBuilder`] assembles a preamble and `## Heading` sections into
//! one instruction string. Empty sections are skipped, so optional content can
//! be passed straight through without the caller branching.

/// Builder for multi-section system prompts.
///
/// Sections are joined with double newlines.
///
/// # Example
///
/// ```
/// use travius::prompt::SystemPromptBuilder;
///
/// let prompt = SystemPromptBuilder::new("You are a careful advisor.")
///     .section("Task", "Write one question.")
///     .section_opt("Missing", None::<String>)
///     .build();
///
/// assert!(prompt.starts_with("You are a careful advisor."));
/// assert!(prompt.contains("## Task\n\nWrite one question."));
/// assert!(!prompt.contains("## Missing"));
/// ```
#[derive(Debug, Clone)]
pub struct SystemPromptBuilder {
    sections: Vec<String>,
}

impl SystemPromptBuilder {
    /// Create a new builder with an initial preamble section.
    ///
    /// The preamble is included as-is (no heading).
    pub fn new(preamble: impl Into<String>) -> Self {
        let preamble = preamble.into();
        let sections = if preamble.is_empty() {
            Vec::new()
        } else {
            vec![preamble]
        };
        Self { sections }
    }

    /// Append a `## heading` section. Skipped if `content` is empty.
    pub fn section(mut self, heading: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.sections.push(format!("## {heading}\n\n{content}"));
        }
        self
    }

    /// Append a section only if the content is `Some`.
    pub fn section_opt(self, heading: &str, content: Option<impl Into<String>>) -> Self {
        match content {
            Some(c) => self.section(heading, c),
            None => self,
        }
    }

    /// Join all sections with blank lines.
    pub fn build(self) -> String {
        self.sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_keep_insertion_order() {
        let prompt = SystemPromptBuilder::new("Preamble")
            .section("First", "one")
            .section_opt("Middle", Some("mid"))
            .section("Second", "two")
            .build();
        assert_eq!(
            prompt,
            "Preamble\n\n## First\n\none\n\n## Middle\n\nmid\n\n## Second\n\ntwo"
        );
    }

    #[test]
    fn empty_content_is_skipped() {
        let prompt = SystemPromptBuilder::new("Preamble")
            .section("Empty", "")
            .section_opt("Absent", None::<String>)
            .section_opt("Blank", Some(""))
            .build();
        assert_eq!(prompt, "Preamble");
    }

    #[test]
    fn empty_preamble_starts_with_first_section() {
        let prompt = SystemPromptBuilder::new("").section("Only", "body").build();
        assert_eq!(prompt, "## Only\n\nbody");
    }
}
