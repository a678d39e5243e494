use regex::Regex;
use std::sync::OnceLock;

fn separator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static slug pattern is valid"))
}

/// URL-safe protocol identifier: lowercase, non-alphanumeric runs collapsed to `-`.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    separator_pattern()
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}
