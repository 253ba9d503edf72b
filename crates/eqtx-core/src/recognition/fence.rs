//! Removal of a markdown code-fence wrapper from service output.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Opening fence with an optional language tag, lazily matched body,
    // closing fence. Surrounding whitespace is tolerated.
    static ref CODE_FENCE: Regex = Regex::new(
        r"(?s)\A\s*```(?:[A-Za-z0-9_+\-]*[ \t]*\r?\n)?(.*?)(?:\r?\n)?```\s*\z"
    ).unwrap();
}

/// Strip a code fence wrapping the whole text.
///
/// The inner content is returned byte-identical; text that is not wrapped in
/// a fence is returned unchanged. Applying this twice equals applying it once
/// unless the inner content is itself a complete fence.
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_with_language_tag() {
        assert_eq!(strip_code_fence("```latex\nE=mc^2\n```"), "E=mc^2");
    }

    #[test]
    fn test_fence_without_language_tag() {
        assert_eq!(strip_code_fence("```\n\\frac{a}{b}\n```"), "\\frac{a}{b}");
        assert_eq!(strip_code_fence("```x + y```"), "x + y");
    }

    #[test]
    fn test_unfenced_text_unchanged() {
        let text = "\\mathbf{v}=\\mathbf{u}+\\mathbf{w}";
        assert_eq!(strip_code_fence(text), text);
        assert_eq!(strip_code_fence(""), "");
    }

    #[test]
    fn test_idempotent() {
        let once = strip_code_fence("```tex\n\\begin{align*}\na &= b\\\\\nc &= d\n\\end{align*}\n```\n");
        assert_eq!(once, "\\begin{align*}\na &= b\\\\\nc &= d\n\\end{align*}");
        assert_eq!(strip_code_fence(once), once);
    }

    #[test]
    fn test_inner_whitespace_preserved() {
        assert_eq!(strip_code_fence("```latex\n  x  \n```"), "  x  ");
    }
}
