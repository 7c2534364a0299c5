//! Plain-text approximation of appended markup
//!
//! The server interprets markup fully; locally we only need the text it will
//! produce: paragraph and break tags become newlines, other tags vanish and
//! entities are decoded.

use crate::errors::EditorResult;
use regex::{Captures, Regex};

/// Text content of `markup`
pub fn parse_markup(markup: &str) -> EditorResult<String> {
    let tag = Regex::new(r"<\s*(/)?\s*([A-Za-z][A-Za-z0-9]*)[^>]*>")?;
    let text = tag.replace_all(markup, |caps: &Captures| {
        let closing = caps.get(1).is_some();
        let name = &caps[2];
        if !closing && (name.eq_ignore_ascii_case("p") || name.eq_ignore_ascii_case("br")) {
            "\n"
        } else {
            ""
        }
    });
    Ok(html_escape::decode_html_entities(&text).into_owned())
}
