use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashMap;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{(\w+)\}\}").unwrap();
}

/// Replaces `{{key}}` placeholders with values from `vars`. Unknown keys are
/// left in place so a template author notices a typo instead of getting an
/// empty blank.
pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            vars.get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Minimal escaping for plain text embedded into the HTML fallback body.
pub fn escape_html(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}
