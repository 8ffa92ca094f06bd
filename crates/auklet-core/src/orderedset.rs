// Copyright (c) the auklet contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Insertion-order-preserving unique collection.
//!
//! Search-based generation needs reproducible enumeration order: the pools
//! of accessible objects, dependency types, and candidate values must
//! iterate the same way on every run so that generated suites are
//! deterministic and diffable. A hash-only set cannot guarantee this, so
//! `OrderedSet` keeps elements in first-insertion order and makes equality
//! order-sensitive.
//!
//! Membership tests go through an internal index from element hash to
//! candidate positions, resolved by `==`, so they stay O(1) expected even
//! under hash collisions.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::ops::{BitAnd, BitOr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An ordered set: unique elements, iterated in first-insertion order.
///
/// Unlike a mathematical set, equality is order-sensitive:
/// `OrderedSet` of `[1, 2, 3]` and of `[1, 3, 2]` are *not* equal.
///
/// Union (`|`) keeps the left operand's elements in their order, followed
/// by the right operand's elements not already present, in their order.
/// Intersection (`&`) keeps the left operand's elements, in their order,
/// that are also present in the right operand.
pub struct OrderedSet<T> {
    items: Vec<T>,
    /// Element hash -> positions in `items` with that hash.
    index: HashMap<u64, Vec<usize>>,
    hasher: RandomState,
}

impl<T: Eq + Hash> OrderedSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        OrderedSet {
            items: Vec::new(),
            index: HashMap::new(),
            hasher: RandomState::new(),
        }
    }

    /// Create an empty set with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        OrderedSet {
            items: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            hasher: RandomState::new(),
        }
    }

    fn hash_of(&self, value: &T) -> u64 {
        self.hasher.hash_one(value)
    }

    /// Whether `value` is an element of the set.
    pub fn contains(&self, value: &T) -> bool {
        match self.index.get(&self.hash_of(value)) {
            Some(positions) => positions.iter().any(|&i| self.items[i] == *value),
            None => false,
        }
    }

    /// Insert `value` at the end if it is not already present.
    ///
    /// Returns `true` if the element was inserted, `false` if it was
    /// already in the set (the stored element and its position are kept).
    pub fn insert(&mut self, value: T) -> bool {
        if self.contains(&value) {
            return false;
        }
        let hash = self.hash_of(&value);
        self.index.entry(hash).or_default().push(self.items.len());
        self.items.push(value);
        true
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate in insertion order.
    ///
    /// The iterator is double-ended, so `iter().rev()` gives reverse
    /// insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// The elements as an ordered slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: Eq + Hash + Clone> OrderedSet<T> {
    /// Union: `self`'s elements in their order, then `other`'s elements
    /// not already present, in their order.
    pub fn union(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.extend(other.iter().cloned());
        result
    }

    /// Intersection: `self`'s elements, in their order, that are also
    /// present in `other`. Elements exclusive to `other` never appear.
    pub fn intersection(&self, other: &Self) -> Self {
        self.iter()
            .filter(|item| other.contains(item))
            .cloned()
            .collect()
    }
}

impl<T: Eq + Hash> Default for OrderedSet<T> {
    fn default() -> Self {
        OrderedSet::new()
    }
}

impl<T: Eq + Hash + Clone> Clone for OrderedSet<T> {
    fn clone(&self) -> Self {
        // Rebuilds the hash index; the element sequence is already unique.
        self.items.iter().cloned().collect()
    }
}

impl<T: fmt::Debug> fmt::Debug for OrderedSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderedSet")?;
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<T: Eq + Hash> PartialEq for OrderedSet<T> {
    /// Order-sensitive: both sets must hold the same elements in the same
    /// insertion order.
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq + Hash> Eq for OrderedSet<T> {}

impl<T: Eq + Hash> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut set = OrderedSet::with_capacity(iter.size_hint().0);
        set.extend(iter);
        set
    }
}

impl<T: Eq + Hash> Extend<T> for OrderedSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

impl<T> IntoIterator for OrderedSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a OrderedSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Eq + Hash + Clone> BitOr for &OrderedSet<T> {
    type Output = OrderedSet<T>;

    fn bitor(self, rhs: Self) -> OrderedSet<T> {
        self.union(rhs)
    }
}

impl<T: Eq + Hash + Clone> BitAnd for &OrderedSet<T> {
    type Output = OrderedSet<T>;

    fn bitand(self, rhs: Self) -> OrderedSet<T> {
        self.intersection(rhs)
    }
}

impl<T: Serialize> Serialize for OrderedSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter())
    }
}

impl<'de, T: Eq + Hash + Deserialize<'de>> Deserialize<'de> for OrderedSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Duplicates in the input are dropped, keeping the first occurrence.
        let items = Vec::<T>::deserialize(deserializer)?;
        Ok(items.into_iter().collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
