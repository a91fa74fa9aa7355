//! Spreading translated words back over the original text lines.
//!
//! A translation rarely has the same word count as its source. With `n`
//! words over `m` lines every line gets `n / m` words, and the first
//! `n % m` lines take one extra. Words are consumed front to back, so no
//! word moves out of order.

/// Batch sizes for `word_count` words over `line_count` lines
pub fn batch_sizes(word_count: usize, line_count: usize) -> Vec<usize> {
    if line_count == 0 {
        return Vec::new();
    }
    let base = word_count / line_count;
    let remainder = word_count % line_count;
    (0..line_count)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Whitespace-split `text` and deal the words over `line_count` lines
pub fn distribute_words(text: &str, line_count: usize) -> Vec<Vec<&str>> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut rest = words.as_slice();
    batch_sizes(words.len(), line_count)
        .into_iter()
        .map(|size| {
            let (batch, tail) = rest.split_at(size);
            rest = tail;
            batch.to_vec()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_words_two_lines() {
        assert_eq!(distribute_words("w1 w2 w3", 2), vec![vec!["w1", "w2"], vec!["w3"]]);
    }

    #[test]
    fn test_fewer_words_than_lines() {
        assert_eq!(batch_sizes(2, 4), vec![1, 1, 0, 0]);
        assert_eq!(batch_sizes(0, 2), vec![0, 0]);
        assert!(batch_sizes(5, 0).is_empty());
        assert!(distribute_words("a b", 0).is_empty());
    }

    #[test]
    fn test_extra_words_go_to_earliest_lines() {
        assert_eq!(batch_sizes(10, 4), vec![3, 3, 2, 2]);
        let lines = distribute_words("a b c d e f g", 3);
        assert_eq!(lines, vec![vec!["a", "b", "c"], vec!["d", "e"], vec!["f", "g"]]);
    }

    #[test]
    fn test_counts_hold_for_all_sizes() {
        for n in 0..40 {
            let text: Vec<String> = (0..n).map(|i| format!("t{i}")).collect();
            let text = text.join("  \n");
            for m in 1..12 {
                let batches = distribute_words(&text, m);
                assert_eq!(batches.len(), m);

                let base = n / m;
                let larger = batches.iter().filter(|b| b.len() == base + 1).count();
                assert!(batches.iter().all(|b| b.len() == base || b.len() == base + 1));
                assert_eq!(larger, n % m);

                let flat: Vec<&str> = batches.concat();
                assert_eq!(flat, text.split_whitespace().collect::<Vec<_>>());
            }
        }
    }
}
