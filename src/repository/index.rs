//! Word → ISBN inverted index over book titles and authors

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word regex"));

/// Split `text` into normalized search words: maximal runs of word
/// characters longer than one character, lower-cased, de-duplicated.
/// Order of first occurrence is kept.
pub fn search_words(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|w| w.chars().count() > 1)
        .map(|w| w.to_lowercase())
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Append-only inverted index. Entries are never removed except by `clear`.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    words: HashMap<String, HashSet<String>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `isbn` under every search word of `text`
    pub fn index(&mut self, isbn: &str, text: &str) {
        for word in search_words(text) {
            self.words.entry(word).or_default().insert(isbn.to_string());
        }
    }

    /// ISBNs whose text contains all of `words` (already normalized).
    /// An empty word list matches nothing.
    pub fn query(&self, words: &[String]) -> HashSet<String> {
        let Some((first, rest)) = words.split_first() else {
            return HashSet::new();
        };
        let mut isbns = match self.words.get(first) {
            Some(set) => set.clone(),
            None => return HashSet::new(),
        };
        for word in rest {
            match self.words.get(word) {
                Some(set) => isbns.retain(|isbn| set.contains(isbn)),
                None => return HashSet::new(),
            }
            if isbns.is_empty() {
                break;
            }
        }
        isbns
    }

    /// Number of distinct words indexed
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }
}
