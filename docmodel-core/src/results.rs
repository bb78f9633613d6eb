//! Ordered result collections returned by multi-document queries.
//!
//! [`ResultList`] keeps storage cursor order (or insertion order when built locally) and
//! adds a few functional conveniences on top of a plain vector.
//!
//! # Example
//!
//! ```ignore
//! let names = User::class()
//!     .find(Filter::gt("age", 30), FindOptions::default())
//!     .await?
//!     .filter(|u| u.get_str("name").is_some())
//!     .map(|u| u.get_str("name").unwrap_or_default().to_string());
//! ```

use indexmap::IndexMap;
use rand::seq::SliceRandom;
use std::{cmp::Ordering, fmt, hash::Hash, ops::Deref};

/// An ordered, list-like collection of query results.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultList<T> {
    items: Vec<T>,
}

impl<T> ResultList<T> {
    /// Creates a result list from the given items, keeping their order.
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    /// Returns the first item, or `None` if the list is empty.
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    /// Returns the last item, or `None` if the list is empty.
    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// Consumes the list and returns its first item.
    pub fn into_first(self) -> Option<T> {
        self.items.into_iter().next()
    }

    /// Keeps only the items matching `predicate`, preserving order.
    pub fn filter(self, mut predicate: impl FnMut(&T) -> bool) -> ResultList<T> {
        self.items
            .into_iter()
            .filter(|item| predicate(item))
            .collect()
    }

    /// Transforms every item, preserving order.
    pub fn map<U>(self, mapper: impl FnMut(T) -> U) -> ResultList<U> {
        self.items
            .into_iter()
            .map(mapper)
            .collect()
    }

    /// Folds the list using the first item as the seed.
    ///
    /// Returns `None` for an empty list.
    pub fn reduce(self, reducer: impl FnMut(T, T) -> T) -> Option<T> {
        self.items
            .into_iter()
            .reduce(reducer)
    }

    /// Folds the list starting from `initial`.
    pub fn reduce_with<A>(self, initial: A, reducer: impl FnMut(A, T) -> A) -> A {
        self.items
            .into_iter()
            .fold(initial, reducer)
    }

    /// Sorts in place by a key. The sort is stable in both directions: items with equal
    /// keys keep their relative order.
    pub fn sort_by_key<K: Ord>(&mut self, mut key: impl FnMut(&T) -> K, descending: bool) {
        self.sort_by(|a, b| key(a).cmp(&key(b)), descending);
    }

    /// Sorts in place with a comparator, stable in both directions.
    pub fn sort_by(&mut self, mut compare: impl FnMut(&T, &T) -> Ordering, descending: bool) {
        if descending {
            self.items.sort_by(|a, b| compare(b, a));
        } else {
            self.items.sort_by(|a, b| compare(a, b));
        }
    }

    /// Groups items by key. Groups appear in first-seen order and members keep their
    /// relative order within each group.
    pub fn group_by<K: Eq + Hash>(&self, mut key: impl FnMut(&T) -> K) -> IndexMap<K, Vec<&T>> {
        let mut groups: IndexMap<K, Vec<&T>> = IndexMap::new();

        for item in &self.items {
            groups
                .entry(key(item))
                .or_default()
                .push(item);
        }

        groups
    }

    /// Picks a uniformly random item, or `None` if the list is empty.
    pub fn random(&self) -> Option<&T> {
        self.items.choose(&mut rand::thread_rng())
    }

    /// Consumes the list and returns the underlying vector.
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: Ord> ResultList<T> {
    /// Sorts in place by natural order, stable in both directions.
    pub fn sort(&mut self, descending: bool) {
        self.sort_by(T::cmp, descending);
    }
}

impl<T> Default for ResultList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Deref for ResultList<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<T> From<Vec<T>> for ResultList<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> FromIterator<T> for ResultList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for ResultList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ResultList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: fmt::Display> fmt::Display for ResultList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}
