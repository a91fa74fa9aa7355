/// Per-request ceiling of the translation service, in characters
pub const DEFAULT_CHUNK_CHARS: usize = 5000;

/// Cut `text` into contiguous slices of at most `max_chars` characters.
///
/// Slicing ignores word boundaries, so a word can straddle two chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (index, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(text[start..index].to_string());
            start = index;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(text[start..].to_string());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_at_character_limit() {
        let text = "a".repeat(12_000);
        let sizes: Vec<usize> = chunk_text(&text, DEFAULT_CHUNK_CHARS)
            .iter()
            .map(String::len)
            .collect();
        assert_eq!(sizes, vec![5000, 5000, 2000]);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let chunks = chunk_text("žluťoučký kůň", 4);
        assert_eq!(chunks, vec!["žluť", "oučk", "ý ků", "ň"]);
    }

    #[test]
    fn test_concatenation_is_lossless() {
        let text = "Příliš žluťoučký kůň úpěl ďábelské ódy. ".repeat(37);
        for max in [1, 3, 7, 100, 5000] {
            let chunks = chunk_text(&text, max);
            assert_eq!(chunks.concat(), text);
            assert!(chunks.iter().all(|c| c.chars().count() <= max));
        }
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk_text("", 10).is_empty());
        assert_eq!(chunk_text("abc", 10), vec!["abc"]);
    }
}
