//! Source to projection position correspondence.

use rustc_hash::FxHashMap;
use sift_core::{position_of, Identity};

/// For each source slot whose item is in the projection, the projection slot
/// holding it. Valid until the next projection mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkTable {
    forward: Vec<Option<usize>>,
    reverse: FxHashMap<usize, usize>,
}

impl LinkTable {
    pub fn build<T: Identity>(source: &[T], projection: &[T]) -> Self {
        let mut t = Self::default();
        t.refresh(source, projection);
        t
    }

    /// Drop every link and relink from scratch. O(n·m) identity search.
    pub fn refresh<T: Identity>(&mut self, source: &[T], projection: &[T]) {
        self.forward.clear();
        self.reverse.clear();
        self.forward.reserve(source.len());
        for (i, item) in source.iter().enumerate() {
            let j = position_of(projection, item);
            if let Some(j) = j {
                // duplicates: lowest source index keeps the reverse link
                self.reverse.entry(j).or_insert(i);
            }
            self.forward.push(j);
        }
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }

    pub fn projection_index(&self, source_index: usize) -> Option<usize> {
        self.forward.get(source_index).copied().flatten()
    }

    pub fn source_index(&self, projection_index: usize) -> Option<usize> {
        self.reverse.get(&projection_index).copied()
    }

    /// Linked `(source, projection)` pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.forward.iter().enumerate().filter_map(|(i, j)| j.map(|j| (i, j)))
    }

    pub fn len(&self) -> usize { self.forward.iter().filter(|j| j.is_some()).count() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
