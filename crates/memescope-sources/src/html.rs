//! Title and visible-text extraction from raw HTML.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"));

static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body[^>]*>(.*)</body>").expect("valid body regex"));

static HIDDEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<!--.*?-->|<script\b[^>]*>.*?</script>|<style\b[^>]*>.*?</style>|<noscript\b[^>]*>.*?</noscript>|<template\b[^>]*>.*?</template>|<head\b[^>]*>.*?</head>",
    )
    .expect("valid hidden-content regex")
});

static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|tr|h[1-6]|section|article|header|footer|ul|ol|table)\s*>")
        .expect("valid line-break regex")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid tags regex"));

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").expect("valid entity regex")
});

/// Text of the first `<title>` element, whitespace-collapsed.
#[must_use]
pub fn extract_title(html: &str) -> String {
    let Some(cap) = TITLE_RE.captures(html) else {
        return String::new();
    };
    clean_text(&decode_entities(cap.get(1).map_or("", |m| m.as_str())))
}

/// Visible text of the page, one line per block element.
///
/// Comments, `<head>`, and script/style/noscript/template bodies are dropped.
/// Blank lines are removed.
#[must_use]
pub fn visible_text(html: &str) -> String {
    let body = BODY_RE
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map_or(html, |m| m.as_str());

    let without_hidden = HIDDEN_RE.replace_all(body, " ");
    let with_breaks = BREAK_RE.replace_all(&without_hidden, "\n");
    let without_tags = TAG_RE.replace_all(&with_breaks, " ");
    let decoded = decode_entities(&without_tags);

    decoded
        .lines()
        .map(clean_text)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapses whitespace runs to single spaces and trims.
#[must_use]
pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(input: &str) -> String {
    ENTITY_RE
        .replace_all(input, |caps: &Captures<'_>| {
            let name = &caps[1];
            decode_entity(name).map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(hex) = name
        .strip_prefix("#x")
        .or_else(|| name.strip_prefix("#X"))
    {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(dec) = name.strip_prefix('#') {
        return dec.parse::<u32>().ok().and_then(char::from_u32);
    }
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "middot" => Some('·'),
        "hellip" => Some('…'),
        "mdash" => Some('—'),
        "ndash" => Some('–'),
        "ldquo" => Some('“'),
        "rdquo" => Some('”'),
        "lsquo" => Some('‘'),
        "rsquo" => Some('’'),
        "copy" => Some('©'),
        _ => None,
    }
}
