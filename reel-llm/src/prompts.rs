//! Prompt construction and response parsing for idea and code generation.

use crate::CompletionPrompt;
use reel_core::Idea;

/// Longest idea we keep; anything beyond is truncated at a char boundary.
pub const MAX_IDEA_CHARS: usize = 80;

pub(crate) fn idea_prompt() -> CompletionPrompt {
    CompletionPrompt {
        system: "You invent tiny browser games for a vertical scrolling feed. \
                 Each game must be playable in under a minute with a mouse or keyboard."
            .to_string(),
        user: "Give me one new mini-game idea as a short catchy title, optionally followed \
               by ' - ' and a one-line hook. Reply with that single line only."
            .to_string(),
        max_tokens: 40,
        temperature: 1.0,
    }
}

pub(crate) fn code_prompt(idea: &Idea, component_name: &str) -> CompletionPrompt {
    CompletionPrompt {
        system: format!(
            "You write self-contained React components. Output only JavaScript source, \
             no prose. The file must start with `import React` (hooks may be imported \
             alongside), define a component named `{name}` that renders a complete playable \
             game using only React and the browser DOM/canvas, and end with \
             `export default {name};`. No external assets or packages.",
            name = component_name
        ),
        user: format!("Build this game: {}", idea),
        max_tokens: 4000,
        temperature: 0.7,
    }
}

/// Extract a single idea from a model reply.
///
/// Takes the first non-blank line, drops list markers, an `Idea:` label and
/// surrounding quotes. Returns `None` when nothing usable remains.
pub fn parse_idea(reply: &str) -> Option<Idea> {
    let line = reply.lines().map(str::trim).find(|l| !l.is_empty())?;

    let line = line.trim_start_matches(|c: char| c == '-' || c == '*' || c == '#');
    let line = strip_numbering(line.trim_start());
    let line = strip_label(line);
    let line = line
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '`')
        .trim();

    if line.is_empty() {
        return None;
    }

    let idea: String = line.chars().take(MAX_IDEA_CHARS).collect();
    Some(Idea::new(idea.trim_end()))
}

fn strip_numbering(line: &str) -> &str {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return line;
    }
    match line[digits..].strip_prefix(['.', ')']) {
        Some(rest) => rest.trim_start(),
        None => line,
    }
}

fn strip_label(line: &str) -> &str {
    let lower = line.to_ascii_lowercase();
    for label in ["idea:", "title:", "game:"] {
        if lower.starts_with(label) {
            return &line[label.len()..];
        }
    }
    line
}
