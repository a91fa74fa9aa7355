use super::traits::{has_extension, Preprocessor};
use crate::error::Result;
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;

// Pre-compiled regexes for tag stripping.
// Attribute bodies skip over quoted values, so a `>` inside quotes does not end the tag.
static SKIPPED_BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<script\b(?:[^>"']|"[^"]*"|'[^']*')*>.*?</script\s*>|<style\b(?:[^>"']|"[^"]*"|'[^']*')*>.*?</style\s*>|<!--.*?-->"#,
    )
    .unwrap()
});

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<[!/?]?[A-Za-z](?:[^>"']|"[^"]*"|'[^']*')*>"#).unwrap()
});

static ENTITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z]+);").unwrap());

/// HTML pages reduced to their visible text nodes
pub struct HtmlPreprocessor;

fn decode_entity(caps: &Captures) -> String {
    let name = &caps[1];
    let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => None,
        }
    };
    decoded
        .map(String::from)
        .unwrap_or_else(|| caps[0].to_string())
}

/// Text nodes of `html`, separated by single spaces
pub fn html_to_text(html: &str) -> String {
    let without_blocks = SKIPPED_BLOCK_REGEX.replace_all(html, " ");
    TAG_REGEX
        .split(&without_blocks)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| ENTITY_REGEX.replace_all(segment, decode_entity).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

impl Preprocessor for HtmlPreprocessor {
    fn extract(&self, path: &Path) -> Result<String> {
        let html = std::fs::read_to_string(path)?;
        Ok(html_to_text(&html))
    }

    fn name(&self) -> &str {
        "HtmlPreprocessor"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        has_extension(path, &["html", "htm"])
    }
}
