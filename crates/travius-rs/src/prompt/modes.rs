//! The four thinking modes and their instruction fragments.

use serde_json::Value;

/// Instruction used when no valid mode was selected.
pub const FALLBACK_INSTRUCTION: &str = "\
No thinking mode was selected. Choose whichever angle (clarifying the facts, \
shifting perspective, analysing structure, or revisiting the purpose) would \
deepen this conversation the most right now, and compose one question from it.";

/// A cognitive framing preset applied when composing a follow-up question.
///
/// The numeric selector (1–4) is what callers send as `selectedMode` and
/// what is reported back as the thinking level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThinkingMode {
    /// Organize the facts and terms without analysis.
    Clarify = 1,
    /// Bring in the viewpoints of other stakeholders.
    Perspective = 2,
    /// Decompose into elements and causal structure.
    Structure = 3,
    /// Question the purpose and underlying values.
    Purpose = 4,
}

impl ThinkingMode {
    pub const ALL: [ThinkingMode; 4] = [
        ThinkingMode::Clarify,
        ThinkingMode::Perspective,
        ThinkingMode::Structure,
        ThinkingMode::Purpose,
    ];

    pub fn from_number(n: u64) -> Option<Self> {
        match n {
            1 => Some(ThinkingMode::Clarify),
            2 => Some(ThinkingMode::Perspective),
            3 => Some(ThinkingMode::Structure),
            4 => Some(ThinkingMode::Purpose),
            _ => None,
        }
    }

    /// Parse a `selectedMode` value as sent by clients.
    ///
    /// Accepts an integral JSON number or a numeric string. Anything else,
    /// including out-of-range numbers, yields `None`.
    ///
    /// ```
    /// use serde_json::json;
    /// use travius::prompt::ThinkingMode;
    ///
    /// assert_eq!(ThinkingMode::from_selector(Some(&json!(3))), Some(ThinkingMode::Structure));
    /// assert_eq!(ThinkingMode::from_selector(Some(&json!("2"))), Some(ThinkingMode::Perspective));
    /// assert_eq!(ThinkingMode::from_selector(Some(&json!(5))), None);
    /// assert_eq!(ThinkingMode::from_selector(Some(&json!("x"))), None);
    /// assert_eq!(ThinkingMode::from_selector(None), None);
    /// ```
    pub fn from_selector(value: Option<&Value>) -> Option<Self> {
        match value? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                        .map(|f| f as u64)
                })
                .and_then(Self::from_number),
            Value::String(s) => s.trim().parse::<u64>().ok().and_then(Self::from_number),
            _ => None,
        }
    }

    /// Numeric selector, 1–4.
    pub fn selector(self) -> u8 {
        self as u8
    }

    /// Instruction fragment for this mode.
    pub fn instruction(self) -> &'static str {
        match self {
            ThinkingMode::Clarify => {
                "Compose a question that briefly organizes the current situation, the \
                 meaning of the terms involved, and the facts. Stay at the level of \
                 surface information: do not dig into positions, structure, causes, or \
                 purposes, and do not ask who thinks what, why it happens, or what it is for."
            }
            ThinkingMode::Perspective => {
                "Explicitly bring in the viewpoints of stakeholders and of people in \
                 different positions, and compose a question that focuses on how their \
                 interpretations and priorities differ."
            }
            ThinkingMode::Structure => {
                "Break the problem or situation down into its constituent elements and \
                 compose a question that focuses on their causal relationships and \
                 structural mechanics, bringing the underlying mechanism to light."
            }
            ThinkingMode::Purpose => {
                "Re-examine the purpose and the values being taken for granted, and \
                 compose a question that draws out a new perspective by asking what this \
                 is for in the first place and what meaning it ought to carry."
            }
        }
    }

    /// Category label used by the thinking-level classifier.
    pub fn label(self) -> &'static str {
        match self {
            ThinkingMode::Clarify => "situational clarification",
            ThinkingMode::Perspective => "perspective shift",
            ThinkingMode::Structure => "structural/causal analysis",
            ThinkingMode::Purpose => "purpose/value redesign",
        }
    }

    /// Inverse of [`label`](Self::label). Case and surrounding whitespace are
    /// ignored.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim().to_lowercase();
        Self::ALL.into_iter().find(|m| m.label() == wanted)
    }
}

/// Thinking level reported for a request: the selector, or 1 when no valid
/// mode was given.
pub fn level_for(mode: Option<ThinkingMode>) -> u8 {
    mode.map_or(ThinkingMode::Clarify.selector(), ThinkingMode::selector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selectors_round_trip() {
        for mode in ThinkingMode::ALL {
            assert_eq!(ThinkingMode::from_number(mode.selector() as u64), Some(mode));
        }
    }

    #[test]
    fn invalid_selectors_are_none() {
        for value in [json!(0), json!(5), json!(-1), json!(2.5), json!("x"), json!(null), json!([3])] {
            assert_eq!(ThinkingMode::from_selector(Some(&value)), None, "{value}");
        }
    }

    #[test]
    fn float_and_padded_string_selectors_parse() {
        assert_eq!(
            ThinkingMode::from_selector(Some(&json!(4.0))),
            Some(ThinkingMode::Purpose)
        );
        assert_eq!(
            ThinkingMode::from_selector(Some(&json!(" 1 "))),
            Some(ThinkingMode::Clarify)
        );
    }

    #[test]
    fn fragments_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for mode in ThinkingMode::ALL {
            assert!(seen.insert(mode.instruction()));
            assert_ne!(mode.instruction(), FALLBACK_INSTRUCTION);
        }
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(
            ThinkingMode::from_label("  Perspective Shift "),
            Some(ThinkingMode::Perspective)
        );
        assert_eq!(ThinkingMode::from_label("vibes"), None);
    }

    #[test]
    fn level_defaults_to_one() {
        assert_eq!(level_for(None), 1);
        assert_eq!(level_for(Some(ThinkingMode::Structure)), 3);
    }
}
