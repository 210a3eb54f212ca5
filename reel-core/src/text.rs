//! Text helpers for model output.

/// Strip a single surrounding markdown code fence from model output.
///
/// Models often wrap code in ```` ```jsx ... ``` ```` even when told not to.
/// Text without a leading fence is returned trimmed and otherwise unchanged.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    // Drop the language tag line (```jsx, ```javascript, or bare ```).
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => "",
    };

    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fenced_block_with_language() {
        let text = "```jsx\nconst GameZone = () => null;\nexport default GameZone;\n```";
        assert_eq!(
            strip_code_fences(text),
            "const GameZone = () => null;\nexport default GameZone;"
        );
    }

    #[test]
    fn test_strip_bare_fence() {
        assert_eq!(strip_code_fences("```\nlet a = 1;\n```\n"), "let a = 1;");
    }

    #[test]
    fn test_unfenced_text_only_trimmed() {
        assert_eq!(strip_code_fences("  let a = 1;\n"), "let a = 1;");
    }

    #[test]
    fn test_unterminated_fence() {
        assert_eq!(strip_code_fences("```js\nlet a = 1;"), "let a = 1;");
    }
}
