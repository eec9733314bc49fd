//! Splitting generated answers into delivery chunks.

/// Splits an answer into the ordered chunks sent as separate chat messages.
///
/// The answer is trimmed, then cut at every newline together with the
/// whitespace that follows it. Whitespace before a newline stays with its
/// segment, except the `\r` of a CRLF line ending. Blank segments are
/// dropped. A non-blank answer always yields at least one chunk; a blank
/// answer yields none.
#[must_use]
pub fn split_reply(answer: &str) -> Vec<String> {
    answer
        .trim()
        .split('\n')
        .map(|segment| {
            let segment = segment.trim_start();
            segment.strip_suffix('\r').unwrap_or(segment)
        })
        .filter(|segment| !segment.trim().is_empty())
        .map(str::to_string)
        .collect()
}
