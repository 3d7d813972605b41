//! Highlight ranges: which characters of a raw value matched the query.

use crate::normalize::Normalizer;

/// Whitespace-separated tokens of `raw` with their starting character index.
fn tokens_with_offsets(raw: &str) -> Vec<(usize, &str)> {
    let mut tokens = Vec::new();
    let mut start: Option<(usize, usize)> = None;
    let mut chars = 0usize;
    for (byte, c) in raw.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some((char_start, byte_start))) => {
                tokens.push((char_start, &raw[byte_start..byte]));
                start = None;
            }
            (false, None) => start = Some((chars, byte)),
            _ => {}
        }
        chars += 1;
    }
    if let Some((char_start, byte_start)) = start {
        tokens.push((char_start, &raw[byte_start..]));
    }
    tokens
}

/// Inclusive character ranges of `raw` covered by the tokens of `query`.
///
/// `query` is already normalized. For each of its tokens the first raw token
/// whose normalized form starts with it is highlighted, from its first
/// character up to the character whose normalization completes the query
/// token. Query tokens without a match contribute nothing.
pub fn overlap(normalizer: &dyn Normalizer, query: &str, raw: &str) -> Vec<(usize, usize)> {
    let tokens = tokens_with_offsets(raw);
    let mut ranges = Vec::new();

    for wanted in query.split_whitespace() {
        let Some((start, token)) = tokens
            .iter()
            .find(|(_, token)| normalizer.normalize(token).starts_with(wanted))
        else {
            continue;
        };

        let wanted_len = wanted.chars().count();
        let mut covered = 0usize;
        let mut end = *start;
        for (i, c) in token.chars().enumerate() {
            covered += normalizer.normalize(c.encode_utf8(&mut [0; 4])).chars().count();
            end = start + i;
            if covered >= wanted_len {
                break;
            }
        }
        ranges.push((*start, end));
    }

    ranges
}
