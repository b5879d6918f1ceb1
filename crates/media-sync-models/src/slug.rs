use regex::Regex;
use std::sync::OnceLock;

fn disallowed() -> &'static Regex {
    static DISALLOWED: OnceLock<Regex> = OnceLock::new();
    DISALLOWED.get_or_init(|| Regex::new(r"[^-a-z0-9]+").expect("static pattern is valid"))
}

/// Derive the target list id from a source list's display name.
///
/// Lowercases, joins whitespace-separated words with a single `-`, then
/// drops every character outside `[a-z0-9-]`. Applying it twice is a no-op.
pub fn list_slug(name: &str) -> String {
    let joined = name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    disallowed().replace_all(&joined, "").into_owned()
}
