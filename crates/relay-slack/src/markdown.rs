//! Translates agent-reply markdown into Slack mrkdwn.

use std::sync::OnceLock;

use regex::Regex;

fn fence_language_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?m)^```[^\n]*\n").expect("fence regex is valid"))
}

fn link_regex() -> &'static Regex {
    static LINK: OnceLock<Regex> = OnceLock::new();
    LINK.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("link regex is valid"))
}

fn emphasis_regex() -> &'static Regex {
    static EMPHASIS: OnceLock<Regex> = OnceLock::new();
    EMPHASIS.get_or_init(|| {
        // Single-line only, so a list bullet asterisk never pairs with
        // an emphasis marker on a later line.
        Regex::new(r"\*\*([^*\n]+)\*\*|\*([^*\n]+)\*").expect("emphasis regex is valid")
    })
}

fn underscore_italic_regex() -> &'static Regex {
    static ITALIC: OnceLock<Regex> = OnceLock::new();
    ITALIC.get_or_init(|| Regex::new(r"_([^_\n]+)_").expect("italic regex is valid"))
}

fn bullet_regex() -> &'static Regex {
    static BULLET: OnceLock<Regex> = OnceLock::new();
    BULLET.get_or_init(|| Regex::new(r"(?m)^\s*[-*]\s").expect("bullet regex is valid"))
}

/// Rewrites markdown into Slack's mrkdwn dialect. Rules apply in a fixed
/// order, each one globally over the text:
///
/// 1. fenced code openers lose their language word,
/// 2. `[text](url)` links become `<url|text>`,
/// 3. `**bold**` becomes `*bold*` and plain `*italic*` becomes
///    `_italic_` (one alternation pass, so translated bold is not
///    re-translated into italic),
/// 4. underscore italics are normalized (no-op on well-formed input),
/// 5. leading `-`/`*` list bullets become a bullet glyph.
///
/// The fence and bullet rules are idempotent; emphasis and link rules
/// assume single-pass application.
pub fn render_slack_markdown(text: &str) -> String {
    let text = fence_language_regex().replace_all(text, "```\n");
    let text = link_regex().replace_all(&text, "<$2|$1>");
    let text = emphasis_regex().replace_all(&text, |captures: &regex::Captures<'_>| {
        match captures.get(1) {
            Some(bold) => format!("*{}*", bold.as_str()),
            None => format!("_{}_", &captures[2]),
        }
    });
    let text = underscore_italic_regex().replace_all(&text, "_${1}_");
    bullet_regex().replace_all(&text, "\u{2022} ").into_owned()
}
