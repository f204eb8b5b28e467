//! Cross-title word frequency analysis over translated headlines.

use std::collections::{BTreeMap, HashSet};

/// Words too common to be interesting in an English headline.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
    "our", "out", "has", "him", "his", "how", "its", "new", "now", "old", "see", "two", "way",
    "who", "did", "get", "may", "say", "she", "use", "that", "with", "have", "this", "will",
    "your", "from", "they", "been", "were", "what", "when", "more", "than", "into", "over",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// Count how many titles each word appears in, and keep the words seen in
/// more than two of them.
///
/// A word counts at most once per title. Words of two characters or fewer,
/// pure numbers, and common stop words are ignored. Results are sorted by
/// count descending, then alphabetically.
pub fn repeated_words<'a, I>(titles: I) -> Vec<WordCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for title in titles {
        let mut seen = HashSet::new();
        for raw in title.split_whitespace() {
            let word: String = raw
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();

            if word.len() <= 2
                || word.chars().all(|c| c.is_ascii_digit())
                || STOP_WORDS.contains(&word.as_str())
            {
                continue;
            }
            if seen.insert(word.clone()) {
                *counts.entry(word).or_insert(0) += 1;
            }
        }
    }

    let mut out: Vec<WordCount> = counts
        .into_iter()
        .filter(|(_, count)| *count > 2)
        .map(|(word, count)| WordCount { word, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_once_per_title_and_applies_threshold() {
        let titles = [
            "Europe votes on Europe Europe today",
            "Europe faces a budget crisis",
            "Budget talks stall across Europe",
            "A quiet budget summer",
        ];
        let out = repeated_words(titles);
        // "europe" appears in 3 titles (repeats inside one title count once),
        // "budget" also in 3; both clear the >2 bar.
        assert_eq!(
            out,
            vec![
                WordCount {
                    word: "budget".into(),
                    count: 3
                },
                WordCount {
                    word: "europe".into(),
                    count: 3
                },
            ]
        );
    }

    #[test]
    fn short_words_numbers_and_stop_words_are_ignored() {
        let titles = [
            "The 2026 vote is on",
            "The 2026 vote is on",
            "The 2026 vote is on",
            "The 2026 vote is on",
        ];
        let out = repeated_words(titles);
        assert_eq!(
            out,
            vec![WordCount {
                word: "vote".into(),
                count: 4
            }]
        );
    }

    #[test]
    fn below_threshold_yields_nothing() {
        let out = repeated_words(["Europe votes", "Europe decides"]);
        assert!(out.is_empty());
    }

    #[test]
    fn punctuation_is_stripped_before_matching() {
        let titles = ["Inflation, again", "Inflation?", "inflation!"];
        let out = repeated_words(titles);
        assert_eq!(out[0].word, "inflation");
        assert_eq!(out[0].count, 3);
    }
}
