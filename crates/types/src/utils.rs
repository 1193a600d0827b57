use chrono::{DateTime, Local, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static BR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid <br> pattern"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new("<[^>]*>").expect("valid tag pattern"));

const PREVIEW_CHARS: usize = 100;

/// Turns post markup into plain text. Line breaks survive as `\n`, every
/// other tag is dropped, and entities are decoded last so that escaped
/// markup stays inert text.
pub fn remove_html(input: &str) -> String {
    let with_breaks = BR_RE.replace_all(input, "\n");
    let stripped = TAG_RE.replace_all(&with_breaks, "");
    decode_entities(&stripped)
}

fn decode_entities(input: &str) -> String {
    match html_entities::decode_html_entities(input) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!("Falling back to basic entity decoding: {:?}", e);
            input
                .replace("&gt;", ">")
                .replace("&lt;", "<")
                .replace("&quot;", "\"")
                .replace("&#039;", "'")
                .replace("&amp;", "&")
        }
    }
}

/// Cuts `text` to `limit` characters, appending `...` when anything was cut.
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// One-line catalog preview of a post body.
pub fn preview_text(com: Option<&str>) -> String {
    let text = com
        .map(remove_html)
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        "No preview available".to_string()
    } else {
        truncate(&text, PREVIEW_CHARS)
    }
}

/// `dd/mm/yy HH:MM` in local time.
pub fn format_timestamp(unix_time: i64) -> String {
    match Local.timestamp_opt(unix_time, 0).single() {
        Some(dt) => format_datetime(&dt),
        None => String::new(),
    }
}

pub fn format_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.format("%d/%m/%y %H:%M").to_string()
}
