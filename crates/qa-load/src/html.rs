//! HTML tag stripping for question and answer bodies.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("static regex is valid"))
}

/// Remove everything that looks like an HTML tag.
///
/// Entities (`&lt;` etc.) are left as they are.
pub fn strip_html(text: &str) -> Cow<'_, str> {
    tag_pattern().replace_all(text, "")
}
