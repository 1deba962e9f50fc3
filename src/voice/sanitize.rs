//! Text cleanup before speech synthesis

use std::sync::LazyLock;

use regex::Regex;

/// Markdown emphasis, heading, and list markers
static MARKDOWN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*#\-_]+").expect("valid regex"));

/// JSON structural punctuation
static JSON_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[{}\[\]:",]+"#).expect("valid regex"));

/// Strip formatting artifacts so the synthesizer doesn't read them aloud
///
/// Returns an empty string when nothing speakable remains.
#[must_use]
pub fn sanitize_for_speech(text: &str) -> String {
    let without_markdown = MARKDOWN_REGEX.replace_all(text, " ");
    let without_json = JSON_REGEX.replace_all(&without_markdown, " ");
    without_json.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markdown() {
        assert_eq!(
            sanitize_for_speech("## Projects\n\n- **ReguLens**: compliance _search_"),
            "Projects ReguLens compliance search"
        );
    }

    #[test]
    fn test_strips_json_punctuation() {
        assert_eq!(
            sanitize_for_speech(r#"{"skills": ["Rust", "Python"]}"#),
            "skills Rust Python"
        );
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(sanitize_for_speech("  hello \t\n  world  "), "hello world");
    }

    #[test]
    fn test_formatting_only_becomes_empty() {
        assert_eq!(sanitize_for_speech("**  --- ## {}"), "");
        assert_eq!(sanitize_for_speech(""), "");
    }

    #[test]
    fn test_plain_sentence_untouched() {
        let text = "I built a retrieval pipeline in 2024. It was fast!";
        assert_eq!(sanitize_for_speech(text), text);
    }
}
