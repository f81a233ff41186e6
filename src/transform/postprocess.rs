//! Per-item post-processing applied to split output parts.
//!
//! These are locale-dependent heuristics. They run after splitting and before
//! the result is stored, and carry no guarantees of their own.

/// Fixup applied to one output part, given the source text it came from.
pub trait PostProcessor: Send + Sync {
    fn process(&self, source: &str, output: String) -> String;
}

/// Keeps the case of the first letter in line with the source.
///
/// Remote services like to capitalize fragments ("file" → "Datei" is fine,
/// "save" → "Speichern" inside a sentence is not). When the source does not
/// begin with an uppercase letter but the output does, the output's first
/// letter is lowercased. Leading whitespace is preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseMatch;

impl PostProcessor for CaseMatch {
    fn process(&self, source: &str, output: String) -> String {
        let source_upper = source.chars().next().map(char::is_uppercase).unwrap_or(false);
        if source_upper {
            return output;
        }
        let Some((pos, first)) = output.char_indices().find(|(_, c)| !c.is_whitespace()) else {
            return output;
        };
        if !first.is_uppercase() {
            return output;
        }
        let mut fixed = String::with_capacity(output.len());
        fixed.push_str(&output[..pos]);
        fixed.extend(first.to_lowercase());
        fixed.push_str(&output[pos + first.len_utf8()..]);
        fixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_when_source_is_lowercase() {
        assert_eq!(CaseMatch.process("save", "Speichern".into()), "speichern");
        assert_eq!(CaseMatch.process("open", "  Öffnen".into()), "  öffnen");
    }

    #[test]
    fn test_keeps_case_when_source_is_uppercase() {
        assert_eq!(CaseMatch.process("Save", "Speichern".into()), "Speichern");
    }

    #[test]
    fn test_leaves_lowercase_and_blank_outputs_alone() {
        assert_eq!(CaseMatch.process("save", "speichern".into()), "speichern");
        assert_eq!(CaseMatch.process("save", "   ".into()), "   ");
        assert_eq!(CaseMatch.process("", "Text".into()), "text");
    }

    #[test]
    fn test_digits_are_not_touched() {
        assert_eq!(CaseMatch.process("3 files", "3 Dateien".into()), "3 Dateien");
    }
}
