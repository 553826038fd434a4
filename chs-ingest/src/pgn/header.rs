//! PGN tag-pair parsing

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\[([A-Za-z0-9_]+)\s+"((?:[^"\\]|\\.)*)"\s*\]$"#)
        .expect("tag line regex is valid")
});

/// Header block of one chunk plus the movetext that follows it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitChunk<'a> {
    /// Tags in document order, duplicates kept
    pub headers: Vec<(String, String)>,
    pub movetext: &'a str,
}

/// Split a chunk into tag pairs and movetext
///
/// Tag lines and blank lines are consumed until the first line that is
/// neither; everything from there on is movetext.
pub fn parse_headers(chunk: &str) -> SplitChunk<'_> {
    let mut headers = Vec::new();
    let mut offset = 0;

    for line in chunk.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            offset += line.len();
            continue;
        }
        match parse_tag_line(trimmed) {
            Some(tag) => {
                headers.push(tag);
                offset += line.len();
            }
            None => break,
        }
    }

    SplitChunk {
        headers,
        movetext: chunk[offset..].trim(),
    }
}

/// Parse a single `[Key "Value"]` line
pub fn parse_tag_line(line: &str) -> Option<(String, String)> {
    let caps = TAG_LINE.captures(line)?;
    Some((caps[1].to_string(), unescape(&caps[2])))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// First value for `key`
pub fn tag<'h>(headers: &'h [(String, String)], key: &str) -> Option<&'h str> {
    headers
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
