//! Deterministic paragraph splitter used whenever the provider cannot help.

/// Separator between paragraphs, also used to re-join them.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";
/// Chunks grow paragraph by paragraph until they would pass this many characters.
pub const SOFT_TARGET: usize = 800;

/// Splits `reply` at paragraph boundaries into chunks of roughly
/// [`SOFT_TARGET`] characters.
///
/// Paragraphs are never cut, so a single huge paragraph stays whole (the
/// length enforcer deals with it). When no split happens the reply comes back
/// untouched; a blank reply yields nothing.
pub fn split_paragraphs(reply: &str) -> Vec<String> {
    if reply.trim().is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for paragraph in reply.split(PARAGRAPH_SEPARATOR).map(str::trim) {
        if paragraph.is_empty() {
            continue;
        }
        let paragraph_len = paragraph.chars().count();

        if current_len > 0
            && current_len + PARAGRAPH_SEPARATOR.len() + paragraph_len > SOFT_TARGET
        {
            chunks.push(std::mem::take(&mut current).trim().to_string());
            current_len = 0;
        }

        if current_len > 0 {
            current.push_str(PARAGRAPH_SEPARATOR);
            current_len += PARAGRAPH_SEPARATOR.len();
        }
        current.push_str(paragraph);
        current_len += paragraph_len;
    }

    if current_len > 0 {
        chunks.push(current.trim().to_string());
    }

    if chunks.len() <= 1 {
        return vec![reply.to_string()];
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn paragraph(ch: char, len: usize) -> String {
        std::iter::repeat_n(ch, len).collect()
    }

    #[test_case("" ; "empty")]
    #[test_case("   \n\n  \n" ; "whitespace only")]
    fn test_blank_reply_yields_nothing(reply: &str) {
        assert!(split_paragraphs(reply).is_empty());
    }

    #[test]
    fn test_no_separator_returns_input() {
        let reply = "one long line without any paragraph break ".repeat(40);
        assert_eq!(split_paragraphs(&reply), vec![reply.clone()]);
    }

    #[test]
    fn test_short_paragraphs_stay_together_unchanged() {
        let reply = "Pizza is great.\n\nThe crust matters most.\n\nBrooklyn style wins.";
        assert_eq!(split_paragraphs(reply), vec![reply.to_string()]);
    }

    #[test]
    fn test_three_large_paragraphs_split_in_order() {
        let a = paragraph('a', 600);
        let b = paragraph('b', 600);
        let c = paragraph('c', 600);
        let reply = format!("{a}\n\n{b}\n\n{c}");

        let chunks = split_paragraphs(&reply);

        assert_eq!(chunks, vec![a, b, c]);
    }

    #[test]
    fn test_paragraphs_pack_up_to_soft_target() {
        let a = paragraph('a', 390);
        let b = paragraph('b', 390);
        let c = paragraph('c', 390);
        let reply = format!("{a}\n\n{b}\n\n{c}");

        let chunks = split_paragraphs(&reply);

        assert_eq!(chunks, vec![format!("{a}\n\n{b}"), c]);
        assert!(chunks.iter().all(|c| c.chars().count() <= SOFT_TARGET));
    }

    #[test]
    fn test_exact_soft_target_is_not_exceeded() {
        // 399 + 2 + 399 == 800 fits; the next paragraph does not.
        let a = paragraph('a', 399);
        let b = paragraph('b', 399);
        let c = paragraph('c', 10);
        let reply = format!("{a}\n\n{b}\n\n{c}");

        let chunks = split_paragraphs(&reply);

        assert_eq!(chunks[0].chars().count(), SOFT_TARGET);
        assert_eq!(chunks[1], c);
    }

    #[test]
    fn test_oversized_paragraph_is_kept_whole() {
        let small = paragraph('s', 100);
        let huge = paragraph('h', 2500);
        let reply = format!("{small}\n\n{huge}");

        assert_eq!(split_paragraphs(&reply), vec![small, huge]);
    }

    #[test]
    fn test_empty_paragraphs_and_padding_are_dropped() {
        let a = paragraph('a', 700);
        let b = paragraph('b', 700);
        let reply = format!("  {a}  \n\n\n\n   \n\n{b}\n");

        assert_eq!(split_paragraphs(&reply), vec![a, b]);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // 300 three-byte characters per paragraph: 900 bytes, 300 characters.
        let a = paragraph('€', 300);
        let b = paragraph('€', 300);
        let reply = format!("{a}\n\n{b}");

        assert_eq!(split_paragraphs(&reply), vec![reply.clone()]);
    }
}
