//! Mention-token helpers for Slack message text (`<@U012ABCDEF>`).

use std::sync::OnceLock;

use regex::Regex;

fn mention_regex() -> &'static Regex {
    static MENTION: OnceLock<Regex> = OnceLock::new();
    MENTION.get_or_init(|| Regex::new(r"<@([A-Z0-9]+)>").expect("mention regex is valid"))
}

/// Extracts the user ids referenced by mention tokens in `text`.
pub fn mention_ids(text: &str) -> Vec<String> {
    mention_regex()
        .captures_iter(text)
        .map(|captures| captures[1].to_string())
        .collect()
}

/// Compiles a pattern matching mentions of one specific user id.
/// Case-sensitive, matches anywhere in the text.
pub fn mention_pattern(user_id: &str) -> Regex {
    Regex::new(&format!("<@{}>", regex::escape(user_id))).expect("escaped mention regex is valid")
}

/// Replaces every mention token with the name `resolve` returns for its
/// user id; unresolved mentions degrade to the raw id.
pub fn replace_mentions(text: &str, resolve: impl Fn(&str) -> Option<String>) -> String {
    mention_regex()
        .replace_all(text, |captures: &regex::Captures<'_>| {
            let user_id = &captures[1];
            resolve(user_id).unwrap_or_else(|| user_id.to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_all_mentioned_ids() {
        let ids = mention_ids("<@U1> hey <@U2AB34>, see <@U1>");
        assert_eq!(ids, vec!["U1", "U2AB34", "U1"]);
    }

    #[test]
    fn ignores_malformed_tokens() {
        assert!(mention_ids("<@> <@lower> @U1 <#C1>").is_empty());
    }

    #[test]
    fn pattern_matches_only_the_given_user() {
        let pattern = mention_pattern("UBOT");
        assert!(pattern.is_match("hey <@UBOT> ping"));
        assert!(!pattern.is_match("hey <@UOTHER> ping"));
    }

    #[test]
    fn replaces_resolved_and_degrades_unresolved() {
        let replaced = replace_mentions("<@U1> and <@U2>", |id| {
            (id == "U1").then(|| "Alice".to_string())
        });
        assert_eq!(replaced, "Alice and U2");
    }
}
