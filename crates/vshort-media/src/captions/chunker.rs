use vshort_models::{CaptionChunk, TimedWord};

/// Group consecutive words into chunks of `chunk_size` (the last may be shorter).
///
/// A size of zero is treated as one.
pub fn chunk_words(words: &[TimedWord], chunk_size: usize) -> Vec<CaptionChunk> {
    words
        .chunks(chunk_size.max(1))
        .filter_map(|group| {
            let first = group.first()?;
            let last = group.last()?;
            Some(CaptionChunk {
                text: group
                    .iter()
                    .map(|w| w.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
                start: first.start,
                end: last.end,
                word_count: group.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> Vec<TimedWord> {
        (0..n)
            .map(|i| TimedWord {
                text: format!("W{}", i),
                start: i as f64,
                end: i as f64 + 1.0,
            })
            .collect()
    }

    #[test]
    fn test_chunks_of_two() {
        let chunks = chunk_words(&words(5), 2);
        let sizes: Vec<_> = chunks.iter().map(|c| c.word_count).collect();
        assert_eq!(sizes, [2, 2, 1]);
        assert_eq!(chunks[0].text, "W0 W1");
        assert_eq!(chunks[2].text, "W4");
        assert_eq!((chunks[1].start, chunks[1].end), (2.0, 4.0));
    }

    #[test]
    fn test_empty_input() {
        assert!(chunk_words(&[], 2).is_empty());
    }

    #[test]
    fn test_zero_chunk_size() {
        assert_eq!(chunk_words(&words(3), 0).len(), 3);
    }
}
