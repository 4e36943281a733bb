use std::iter::Peekable;
use std::str::SplitWhitespace;

/// Greedily packs the whitespace-separated words of `text` into lines whose
/// measured width stays within `max_width`.
///
/// A word that is wider than `max_width` on its own is kept whole on a line
/// of its own.
pub fn wrap<F>(text: &str, max_width: f32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    wrap_lines(text, max_width, measure).collect()
}

/// Lazy form of [`wrap`]. Each line is measured only when it is pulled, so a
/// caller that stops early never measures the rest of the text.
pub fn wrap_lines<F>(text: &str, max_width: f32, measure: F) -> WrapLines<'_, F>
where
    F: Fn(&str) -> f32,
{
    WrapLines {
        words: text.split_whitespace().peekable(),
        max_width,
        measure,
    }
}

pub struct WrapLines<'a, F> {
    words: Peekable<SplitWhitespace<'a>>,
    max_width: f32,
    measure: F,
}

impl<F> Iterator for WrapLines<'_, F>
where
    F: Fn(&str) -> f32,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut current = self.words.next()?.to_string();
        while let Some(word) = self.words.peek() {
            let trial = format!("{} {}", current, word);
            if (self.measure)(&trial) > self.max_width {
                break;
            }
            current = trial;
            self.words.next();
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars_times_ten(text: &str) -> f32 {
        text.chars().count() as f32 * 10.0
    }

    #[test]
    fn empty_and_blank_text_yield_no_lines() {
        assert!(wrap("", 720.0, chars_times_ten).is_empty());
        assert!(wrap(" \t \n ", 720.0, chars_times_ten).is_empty());
    }

    #[test]
    fn wraps_greedily_at_width() {
        let lines = wrap("the quick brown fox jumps over the lazy dog", 100.0, chars_times_ten);
        insta::assert_snapshot!(lines.join("\n"), @r"
        the quick
        brown fox
        jumps over
        the lazy
        dog
        ");
    }

    #[test]
    fn collapses_runs_of_whitespace() {
        let lines = wrap("  alpha \t beta   gamma ", 1000.0, chars_times_ten);
        assert_eq!(lines, vec!["alpha beta gamma".to_string()]);
    }

    #[test]
    fn overwide_word_stays_whole_on_its_own_line() {
        let long = "x".repeat(2000);
        let text = format!("a {} b", long);
        let lines = wrap(&text, 720.0, chars_times_ten);
        assert_eq!(lines, vec!["a".to_string(), long.clone(), "b".to_string()]);

        let single = wrap(&long, 720.0, chars_times_ten);
        assert_eq!(single, vec![long]);
    }

    #[test]
    fn lines_preserve_word_sequence_and_fit() {
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod \
                    tempor incididunt ut labore et dolore magna aliqua. Supercalifragilistic \
                    words appear here";
        for max_width in [10.0, 55.0, 120.0, 333.0, 720.0] {
            let lines = wrap(text, max_width, chars_times_ten);
            let rejoined = lines.join(" ");
            let original: Vec<&str> = text.split_whitespace().collect();
            let produced: Vec<&str> = rejoined.split_whitespace().collect();
            assert_eq!(original, produced, "width {}", max_width);
            for line in &lines {
                let single_word = !line.contains(' ');
                assert!(
                    single_word || chars_times_ten(line) <= max_width,
                    "line {:?} exceeds {}",
                    line,
                    max_width
                );
            }
        }
    }

    #[test]
    fn candidate_line_is_measured_as_joined_text() {
        let measured = std::cell::RefCell::new(Vec::new());
        let lines = wrap("ab cd ef", 50.0, |text| {
            measured.borrow_mut().push(text.to_string());
            chars_times_ten(text)
        });
        assert_eq!(lines, vec!["ab cd".to_string(), "ef".to_string()]);
        assert_eq!(*measured.borrow(), vec!["ab cd", "ab cd ef"]);
    }

    #[test]
    fn lazy_lines_measure_only_what_is_pulled() {
        let calls = std::cell::Cell::new(0);
        let text = "word ".repeat(10_000);
        let first: Vec<String> = wrap_lines(&text, 100.0, |candidate| {
            calls.set(calls.get() + 1);
            chars_times_ten(candidate)
        })
        .take(2)
        .collect();
        assert_eq!(first, vec!["word word".to_string(), "word word".to_string()]);
        assert_eq!(calls.get(), 4);
    }
}
