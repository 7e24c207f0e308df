//! Hard cap on message size.

/// The maximum character length allowed for a single Discord message.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Makes every chunk fit in a Discord message.
///
/// Chunks within the limit pass through untouched; longer ones are cut into
/// consecutive slices of exactly [`MAX_MESSAGE_LENGTH`] characters (the last
/// one may be shorter). Nothing is added or removed, so concatenating the
/// output reproduces the concatenated input.
pub fn enforce_length(chunks: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if chunk.chars().count() <= MAX_MESSAGE_LENGTH {
            out.push(chunk);
        } else {
            out.extend(split_by_length(&chunk).map(str::to_string));
        }
    }
    out
}

/// Yields consecutive slices of at most [`MAX_MESSAGE_LENGTH`] characters,
/// always cut on a character boundary.
fn split_by_length(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest
            .char_indices()
            .nth(MAX_MESSAGE_LENGTH)
            .map_or(rest.len(), |(idx, _)| idx);
        let (slice, tail) = rest.split_at(end);
        rest = tail;
        Some(slice)
    })
}
