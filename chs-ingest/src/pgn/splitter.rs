//! Splits a blob of concatenated PGN records into per-game chunks

use tracing::debug;

/// Line prefix that opens a new game record
pub const GAME_MARKER: &str = "[Event ";

/// Lazy iterator over trimmed game chunks, in document order
pub struct Chunks<'a> {
    rest: &'a str,
}

/// Split `blob` into game chunks
///
/// Each line starting with `[Event ` begins a new chunk. Text before the
/// first marker is dropped. A non-blank blob without any marker is one chunk.
pub fn split_games(blob: &str) -> Chunks<'_> {
    let rest = match find_marker(blob, true) {
        Some(0) => blob,
        Some(start) => {
            let preamble = &blob[..start];
            if !preamble.trim().is_empty() {
                debug!(bytes = preamble.len(), "Dropping text before first game marker");
            }
            &blob[start..]
        }
        None => blob,
    };
    Chunks { rest }
}

/// Byte offset of the first marker line, optionally counting one at offset 0
fn find_marker(text: &str, include_start: bool) -> Option<usize> {
    if include_start && text.starts_with(GAME_MARKER) {
        return Some(0);
    }
    let mut search = 0;
    while let Some(pos) = text[search..].find('\n') {
        let line_start = search + pos + 1;
        if text[line_start..].starts_with(GAME_MARKER) {
            return Some(line_start);
        }
        search = line_start;
    }
    None
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            if self.rest.is_empty() {
                return None;
            }

            // Search past the current chunk's own marker
            let end = find_marker(self.rest, false).unwrap_or(self.rest.len());
            let chunk = &self.rest[..end];
            self.rest = &self.rest[end..];

            let trimmed = chunk.trim();
            if !trimmed.is_empty() {
                return Some(trimmed);
            }
        }
    }
}
