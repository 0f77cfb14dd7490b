//! Rule table machinery.
//!
//! A rule set is a fixed, ordered slice of named rules. Each rule is a
//! plain function over the document so it can be tested on its own; the
//! runner only threads the text through them in order.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::rewrite::RewriteContext;

/// One rewrite step.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub apply: for<'a> fn(&'a str, &RewriteContext) -> Cow<'a, str>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Apply `rules` in order.
pub fn run(rules: &[Rule], html: &str, ctx: &RewriteContext) -> String {
    let mut current = html.to_string();
    for rule in rules {
        let next = match (rule.apply)(&current, ctx) {
            Cow::Borrowed(_) => continue,
            Cow::Owned(next) => next,
        };
        tracing::trace!(rule = rule.name, "Rewrite rule changed document");
        current = next;
    }
    current
}

static HEAD_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<head(?:\s[^>]*)?>").expect("valid regex"));
static HTML_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<html(?:\s[^>]*)?>").expect("valid regex"));
static DOUBLE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"/_proxy/(?:_proxy/)+").expect("valid regex"));

/// Byte offset just after the `<head>` opening tag, falling back to the
/// `<html>` opening tag, then to the start of the document.
pub fn head_insertion_point(html: &str) -> usize {
    HEAD_OPEN
        .find(html)
        .or_else(|| HTML_OPEN.find(html))
        .map(|m| m.end())
        .unwrap_or(0)
}

/// Insert `snippet` at byte offset `at`.
pub fn insert_at(html: &str, at: usize, snippet: &str) -> String {
    let mut out = String::with_capacity(html.len() + snippet.len());
    out.push_str(&html[..at]);
    out.push_str(snippet);
    out.push_str(&html[at..]);
    out
}

/// `/_proxy/_proxy/` collapses to `/_proxy/`.
pub fn collapse_double_prefix<'a>(html: &'a str, _ctx: &RewriteContext) -> Cow<'a, str> {
    DOUBLE_PREFIX.replace_all(html, "/_proxy/")
}

/// Quote a string as a JavaScript string literal.
pub fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}
