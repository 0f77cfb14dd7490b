//! Rule set for ordinary web apps (SPA bundles, dev servers, server-rendered
//! pages) that assume they own `/`.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::rewrite::rules::{collapse_double_prefix, head_insertion_point, insert_at, js_string, Rule};
use crate::rewrite::RewriteContext;

/// Marker proving the flags script is already present.
pub const PROXY_FLAGS_MARKER: &str = "window.__PROXY_MODE__";

pub const GENERIC_RULES: &[Rule] = &[
    Rule { name: "inject_proxy_flags", apply: inject_proxy_flags },
    Rule { name: "base_tag", apply: base_tag },
    Rule { name: "root_relative_attributes", apply: root_relative_attributes },
    Rule { name: "css_urls", apply: css_urls },
    Rule { name: "dev_server_paths", apply: dev_server_paths },
    Rule { name: "collapse_double_prefix", apply: collapse_double_prefix },
];

static BASE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<base\b[^>]*>").expect("valid regex"));
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(href|src|action)(\s*=\s*["'])/([^"']*)"#).expect("valid regex")
});
static CSS_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)url\(\s*(["']?)/([^)"'\s]*)"#).expect("valid regex")
});
static DEV_SERVER_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(["'`])/(_next/|@vite/|@react-refresh|@fs/|__webpack_hmr|node_modules/|sockjs-node/)"#)
        .expect("valid regex")
});

fn flags_script(ctx: &RewriteContext) -> String {
    format!(
        "<script>{}=true;window.__TOOL_SLUG__={};window.__PROXY_BASE_PATH__={};</script>",
        PROXY_FLAGS_MARKER,
        js_string(&ctx.tool_slug),
        js_string(ctx.base_path().trim_end_matches('/')),
    )
}

fn base_element(ctx: &RewriteContext) -> String {
    format!("<base href=\"{}\">", ctx.base_path())
}

/// A root-relative target still pointing outside the proxy prefix.
fn needs_prefix(rest: &str) -> bool {
    !rest.starts_with('/') && !rest.starts_with("_proxy/")
}

/// Expose proxy-mode flags to the page, ahead of any base tag.
pub fn inject_proxy_flags<'a>(html: &'a str, ctx: &RewriteContext) -> Cow<'a, str> {
    if html.contains(PROXY_FLAGS_MARKER) {
        return Cow::Borrowed(html);
    }
    let at = BASE_TAG
        .find(html)
        .map(|m| m.start())
        .unwrap_or_else(|| head_insertion_point(html));
    Cow::Owned(insert_at(html, at, &flags_script(ctx)))
}

/// Replace the first base tag, or add one right after the flags script.
pub fn base_tag<'a>(html: &'a str, ctx: &RewriteContext) -> Cow<'a, str> {
    let base = base_element(ctx);
    if let Some(existing) = BASE_TAG.find(html) {
        if existing.as_str() == base {
            return Cow::Borrowed(html);
        }
        let mut out = String::with_capacity(html.len() + base.len());
        out.push_str(&html[..existing.start()]);
        out.push_str(&base);
        out.push_str(&html[existing.end()..]);
        return Cow::Owned(out);
    }

    let at = html
        .find(PROXY_FLAGS_MARKER)
        .and_then(|start| html[start..].find("</script>").map(|end| start + end + "</script>".len()))
        .unwrap_or_else(|| head_insertion_point(html));
    Cow::Owned(insert_at(html, at, &base))
}

/// `href`, `src` and form `action` values starting with `/`.
pub fn root_relative_attributes<'a>(html: &'a str, ctx: &RewriteContext) -> Cow<'a, str> {
    let base = ctx.base_path();
    ATTRIBUTE.replace_all(html, |caps: &Captures| {
        let rest = &caps[3];
        if needs_prefix(rest) {
            format!("{}{}{}{}", &caps[1], &caps[2], base, rest)
        } else {
            caps[0].to_string()
        }
    })
}

/// CSS `url(/...)`, quoted or bare.
pub fn css_urls<'a>(html: &'a str, ctx: &RewriteContext) -> Cow<'a, str> {
    let base = ctx.base_path();
    CSS_URL.replace_all(html, |caps: &Captures| {
        let rest = &caps[2];
        if needs_prefix(rest) {
            format!("url({}{}{}", &caps[1], base, rest)
        } else {
            caps[0].to_string()
        }
    })
}

/// Absolute dev-server paths embedded in script strings.
pub fn dev_server_paths<'a>(html: &'a str, ctx: &RewriteContext) -> Cow<'a, str> {
    let base = ctx.base_path();
    DEV_SERVER_PATH.replace_all(html, |caps: &Captures| format!("{}{}{}", &caps[1], base, &caps[2]))
}
