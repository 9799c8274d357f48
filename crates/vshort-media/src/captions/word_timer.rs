use vshort_models::{TimedWord, TranscriptSegment};

/// Split transcript segments inside `[window_start, window_end]` into timed words.
///
/// Only segments lying entirely within the window are used. Each segment's
/// duration is shared equally between its whitespace-separated tokens, and
/// the resulting times are relative to `window_start`. Text is upper-cased.
pub fn expand_words(
    segments: &[TranscriptSegment],
    window_start: f64,
    window_end: f64,
) -> Vec<TimedWord> {
    let mut words = Vec::new();

    for segment in segments
        .iter()
        .filter(|s| s.start >= window_start && s.end <= window_end)
    {
        let tokens: Vec<&str> = segment.text.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        let step = (segment.end - segment.start) / tokens.len() as f64;
        for (i, token) in tokens.iter().enumerate() {
            let start = segment.start + step * i as f64;
            words.push(TimedWord {
                text: token.to_uppercase(),
                start: start - window_start,
                end: start + step - window_start,
            });
        }
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str, start: f64, end: f64) -> TranscriptSegment {
        TranscriptSegment::new(text, start, end)
    }

    #[test]
    fn test_uniform_split() {
        let words = expand_words(&[segment("a b c", 0.0, 3.0)], 0.0, 60.0);
        let texts: Vec<_> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, ["A", "B", "C"]);
        for (i, word) in words.iter().enumerate() {
            assert!((word.start - i as f64).abs() < 1e-9);
            assert!((word.end - (i + 1) as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn test_times_are_relative_to_window() {
        let words = expand_words(&[segment("hello world", 12.0, 13.0)], 10.0, 70.0);
        assert_eq!(words.len(), 2);
        assert!((words[0].start - 2.0).abs() < 1e-9);
        assert!((words[1].start - 2.5).abs() < 1e-9);
        assert!((words[1].end - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_partially_overlapping_segments_are_dropped() {
        let segments = [
            segment("before", 5.0, 11.0),
            segment("inside", 11.0, 12.0),
            segment("after", 69.0, 71.0),
        ];
        let words = expand_words(&segments, 10.0, 70.0);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "INSIDE");
    }

    #[test]
    fn test_blank_segments_are_skipped() {
        let words = expand_words(&[segment("   ", 1.0, 2.0), segment("ok", 2.0, 3.0)], 0.0, 5.0);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "OK");
    }
}
