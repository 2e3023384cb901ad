//! Bidirectional checkout ledger

use std::collections::{HashMap, HashSet};

/// Active loans indexed both by book and by patron. Every (isbn, patron)
/// pair is present in both maps or in neither, and no empty set is kept.
///
/// The ledger does not enforce lending rules; callers check availability
/// and duplicates before calling [`LendingLedger::checkout`].
#[derive(Debug, Default)]
pub struct LendingLedger {
    by_book: HashMap<String, HashSet<String>>,
    by_patron: HashMap<String, HashSet<String>>,
}

impl LendingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of copies of `isbn` currently out
    pub fn active_count(&self, isbn: &str) -> usize {
        self.by_book.get(isbn).map_or(0, HashSet::len)
    }

    pub fn has_loan(&self, isbn: &str, patron_id: &str) -> bool {
        self.by_book
            .get(isbn)
            .is_some_and(|patrons| patrons.contains(patron_id))
    }

    pub fn checkout(&mut self, isbn: &str, patron_id: &str) {
        let new_for_book = self
            .by_book
            .entry(isbn.to_string())
            .or_default()
            .insert(patron_id.to_string());
        let new_for_patron = self
            .by_patron
            .entry(patron_id.to_string())
            .or_default()
            .insert(isbn.to_string());
        assert_eq!(
            new_for_book, new_for_patron,
            "lending ledger diverged on checkout of {} by {}",
            isbn, patron_id
        );
    }

    /// Remove the loan, returning whether it existed
    pub fn return_loan(&mut self, isbn: &str, patron_id: &str) -> bool {
        let removed_for_book = remove_pair(&mut self.by_book, isbn, patron_id);
        let removed_for_patron = remove_pair(&mut self.by_patron, patron_id, isbn);
        assert_eq!(
            removed_for_book, removed_for_patron,
            "lending ledger diverged on return of {} by {}",
            isbn, patron_id
        );
        removed_for_book
    }

    /// Patrons currently holding `isbn`, sorted
    pub fn patrons_of(&self, isbn: &str) -> Vec<String> {
        sorted(self.by_book.get(isbn))
    }

    /// Books currently held by `patron_id`, sorted
    pub fn books_of(&self, patron_id: &str) -> Vec<String> {
        sorted(self.by_patron.get(patron_id))
    }

    pub fn is_empty(&self) -> bool {
        self.by_book.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_book.clear();
        self.by_patron.clear();
    }
}

fn remove_pair(map: &mut HashMap<String, HashSet<String>>, key: &str, value: &str) -> bool {
    let Some(set) = map.get_mut(key) else {
        return false;
    };
    let removed = set.remove(value);
    if set.is_empty() {
        map.remove(key);
    }
    removed
}

fn sorted(set: Option<&HashSet<String>>) -> Vec<String> {
    let mut values: Vec<String> = set.into_iter().flatten().cloned().collect();
    values.sort();
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_and_counts() {
        let mut ledger = LendingLedger::new();
        assert_eq!(ledger.active_count("isbn-1"), 0);

        ledger.checkout("isbn-1", "alice");
        ledger.checkout("isbn-1", "bob");
        ledger.checkout("isbn-2", "alice");

        assert_eq!(ledger.active_count("isbn-1"), 2);
        assert!(ledger.has_loan("isbn-1", "alice"));
        assert!(!ledger.has_loan("isbn-2", "bob"));
        assert_eq!(ledger.patrons_of("isbn-1"), vec!["alice", "bob"]);
        assert_eq!(ledger.books_of("alice"), vec!["isbn-1", "isbn-2"]);
    }

    #[test]
    fn test_return_restores_state() {
        let mut ledger = LendingLedger::new();
        ledger.checkout("isbn-1", "alice");
        assert!(ledger.return_loan("isbn-1", "alice"));

        assert!(!ledger.has_loan("isbn-1", "alice"));
        assert_eq!(ledger.active_count("isbn-1"), 0);
        assert!(ledger.is_empty());
        assert!(ledger.books_of("alice").is_empty());
    }

    #[test]
    fn test_return_unknown_loan() {
        let mut ledger = LendingLedger::new();
        ledger.checkout("isbn-1", "alice");
        assert!(!ledger.return_loan("isbn-1", "bob"));
        assert!(!ledger.return_loan("isbn-9", "alice"));
        assert_eq!(ledger.active_count("isbn-1"), 1);
    }
}
