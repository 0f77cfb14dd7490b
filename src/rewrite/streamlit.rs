//! Rule set for Streamlit-rendered documents.
//!
//! Streamlit builds its URLs at runtime relative to the page, so a base tag
//! breaks it. Instead its relative assets and its two internal route
//! prefixes are prefixed explicitly, and its sockets are sent to the
//! WebSocket proxy.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::rewrite::rules::{collapse_double_prefix, head_insertion_point, insert_at, Rule};
use crate::rewrite::websocket::{shim_script, SHIM_MARKER};
use crate::rewrite::RewriteContext;

pub const STREAMLIT_RULES: &[Rule] = &[
    Rule { name: "relative_static_assets", apply: relative_static_assets },
    Rule { name: "internal_routes", apply: internal_routes },
    Rule { name: "websocket_constructor_literals", apply: websocket_constructor_literals },
    Rule { name: "fetch_xhr_literals", apply: fetch_xhr_literals },
    Rule { name: "websocket_string_literals", apply: websocket_string_literals },
    Rule { name: "collapse_double_prefix", apply: collapse_double_prefix },
    Rule { name: "inject_websocket_shim", apply: inject_websocket_shim },
];

static RELATIVE_ASSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(["'(])\./(static/|favicon\.png)"#).expect("valid regex")
});
static INTERNAL_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(["'(`])/(_stcore/|media/)"#).expect("valid regex")
});
static CONSTRUCTOR_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(new\s+WebSocket\(\s*)(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});
static FETCH_XHR_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(fetch\(\s*|\.open\(\s*["'][A-Za-z]+["']\s*,\s*)(?:"(wss?://[^"]*)"|'(wss?://[^']*)')"#)
        .expect("valid regex")
});
static WS_STRING_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"()(?:"(wss?://[^"]*)"|'(wss?://[^']*)')"#).expect("valid regex")
});

/// Shared replacer for the literal-URL patterns. Group 1 is the call-site
/// prefix; groups 2 and 3 are the double- and single-quoted URL.
fn relocate_literal(caps: &Captures, ctx: &RewriteContext) -> String {
    let (quote, url) = match (caps.get(2), caps.get(3)) {
        (Some(url), _) => ('"', url.as_str()),
        (None, Some(url)) => ('\'', url.as_str()),
        (None, None) => return caps[0].to_string(),
    };
    match ctx.ws.relocate(url) {
        Some(target) => format!("{}{}{}{}", &caps[1], quote, target, quote),
        None => caps[0].to_string(),
    }
}

/// `./static/...` and `./favicon.png`.
pub fn relative_static_assets<'a>(html: &'a str, ctx: &RewriteContext) -> Cow<'a, str> {
    let base = ctx.base_path();
    RELATIVE_ASSET.replace_all(html, |caps: &Captures| format!("{}{}{}", &caps[1], base, &caps[2]))
}

/// Absolute `/_stcore/` and `/media/` routes.
pub fn internal_routes<'a>(html: &'a str, ctx: &RewriteContext) -> Cow<'a, str> {
    let base = ctx.base_path();
    INTERNAL_ROUTE.replace_all(html, |caps: &Captures| format!("{}{}{}", &caps[1], base, &caps[2]))
}

/// `new WebSocket("...")` call sites, relative or absolute.
pub fn websocket_constructor_literals<'a>(html: &'a str, ctx: &RewriteContext) -> Cow<'a, str> {
    CONSTRUCTOR_LITERAL.replace_all(html, |caps: &Captures| relocate_literal(caps, ctx))
}

/// `fetch("ws://...")` and `xhr.open("GET", "ws://...")`.
pub fn fetch_xhr_literals<'a>(html: &'a str, ctx: &RewriteContext) -> Cow<'a, str> {
    FETCH_XHR_LITERAL.replace_all(html, |caps: &Captures| relocate_literal(caps, ctx))
}

/// Any remaining quoted `ws://` / `wss://` literal.
pub fn websocket_string_literals<'a>(html: &'a str, ctx: &RewriteContext) -> Cow<'a, str> {
    WS_STRING_LITERAL.replace_all(html, |caps: &Captures| relocate_literal(caps, ctx))
}

pub fn inject_websocket_shim<'a>(html: &'a str, ctx: &RewriteContext) -> Cow<'a, str> {
    if html.contains(SHIM_MARKER) {
        return Cow::Borrowed(html);
    }
    Cow::Owned(insert_at(html, head_insertion_point(html), &shim_script(&ctx.ws)))
}
