use once_cell::sync::Lazy;
use regex::Regex;

/// Number of prompt words used for a default project name.
pub const DEFAULT_NAME_WORDS: usize = 4;

/// Upper bound on the length of a default project name.
pub const MAX_DEFAULT_NAME_CHARS: usize = 40;

/// Name used when a prompt contains no words.
pub const UNTITLED_NAME: &str = "Untitled Game";

/// Suggest a project name from the opening words of a prompt.
pub fn default_name(prompt: &str) -> String {
    static WORD_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"[\p{L}\p{N}'-]+").expect("invalid word regex"));

    let words: Vec<&str> = WORD_RE
        .find_iter(prompt)
        .map(|m| m.as_str())
        .take(DEFAULT_NAME_WORDS)
        .collect();
    if words.is_empty() {
        return UNTITLED_NAME.to_string();
    }

    let joined = words.join(" ");
    let truncated: String = joined.chars().take(MAX_DEFAULT_NAME_CHARS).collect();
    truncated.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_leading_words() {
        assert_eq!(
            default_name("Space shooter with aliens and lasers"),
            "Space shooter with aliens"
        );
    }

    #[test]
    fn ignores_punctuation_and_extra_whitespace() {
        assert_eq!(default_name("  Snake!!   but,  faster "), "Snake but faster");
    }

    #[test]
    fn falls_back_when_no_words() {
        assert_eq!(default_name(""), UNTITLED_NAME);
        assert_eq!(default_name("?! ..."), UNTITLED_NAME);
    }

    #[test]
    fn caps_length() {
        let prompt = format!("{} b c d", "x".repeat(60));
        assert_eq!(default_name(&prompt).chars().count(), MAX_DEFAULT_NAME_CHARS);
    }
}
