//! A notifying list: every mutation returns the change that describes it.

use serde_json::Value;

use crate::{Change, FieldPath, Node, Splice};

#[derive(Debug, Clone, Default)]
pub struct SourceList<T> {
    items: Vec<T>,
}

impl<T: Clone> SourceList<T> {
    pub fn new(items: Vec<T>) -> Self { Self { items } }

    pub fn as_slice(&self) -> &[T] { &self.items }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn get(&self, index: usize) -> Option<&T> { self.items.get(index) }

    pub fn into_inner(self) -> Vec<T> { self.items }

    pub fn push(&mut self, item: T) -> Change<T> {
        let index = self.items.len();
        self.items.push(item);
        Change::Splices(vec![Splice::new(index, Vec::new(), 1)])
    }

    /// Insert at `index`, clamped to the current length.
    pub fn insert(&mut self, index: usize, item: T) -> Change<T> {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        Change::Splices(vec![Splice::new(index, Vec::new(), 1)])
    }

    pub fn remove(&mut self, index: usize) -> Option<Change<T>> {
        if index >= self.items.len() { return None; }
        let removed = self.items.remove(index);
        Some(Change::Splices(vec![Splice::new(index, vec![removed], 0)]))
    }

    /// Remove `delete_count` items at `index` and insert `items` in their place.
    /// Out-of-range bounds are clamped.
    pub fn splice(&mut self, index: usize, delete_count: usize, items: impl IntoIterator<Item = T>) -> Change<T> {
        let index = index.min(self.items.len());
        let end = index.saturating_add(delete_count).min(self.items.len());
        let before = self.items.len();
        let removed: Vec<T> = self.items.splice(index..end, items).collect();
        let added_count = self.items.len() + removed.len() - before;
        Change::Splices(vec![Splice::new(index, removed, added_count)])
    }

    pub fn clear(&mut self) -> Change<T> {
        let removed = std::mem::take(&mut self.items);
        Change::Splices(vec![Splice::new(0, removed, 0)])
    }

    /// Assign a new item to an existing slot.
    pub fn set(&mut self, index: usize, item: T) -> Option<Change<T>> {
        let slot = self.items.get_mut(index)?;
        *slot = item;
        Some(Change::ItemSet { index })
    }

    pub fn replace_all(&mut self, items: Vec<T>) -> Change<T> {
        self.items = items;
        Change::Replace
    }

    /// Describe a field mutation the caller already performed through a shared handle.
    pub fn notify_field(&self, index: usize, path: &str) -> Option<Change<T>> {
        if index >= self.items.len() { return None; }
        let path = FieldPath::parse(path)?;
        Some(Change::Field { index, path })
    }
}

impl SourceList<Node> {
    /// Mutate a nested field of the record at `index` and describe it.
    pub fn set_path(&mut self, index: usize, path: &str, value: Value) -> Option<Change<Node>> {
        let node = self.items.get(index)?;
        if !node.set(path, value) { return None; }
        self.notify_field(index, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splice_reports_post_edit_region() {
        let mut l = SourceList::new(vec![1, 2, 3, 4]);
        let c = l.splice(1, 2, [7, 8, 9]);
        assert_eq!(l.as_slice(), &[1, 7, 8, 9, 4]);
        assert_eq!(c, Change::Splices(vec![Splice::new(1, vec![2, 3], 3)]));

        let c = l.splice(4, 10, []);
        assert_eq!(l.as_slice(), &[1, 7, 8, 9]);
        assert_eq!(c, Change::Splices(vec![Splice::new(4, vec![4], 0)]));
    }

    #[test]
    fn push_insert_remove() {
        let mut l = SourceList::new(vec!["a"]);
        assert_eq!(l.push("b"), Change::Splices(vec![Splice::new(1, vec![], 1)]));
        assert_eq!(l.insert(9, "c"), Change::Splices(vec![Splice::new(2, vec![], 1)]));
        assert_eq!(l.remove(0), Some(Change::Splices(vec![Splice::new(0, vec!["a"], 0)])));
        assert_eq!(l.remove(5), None);
        assert_eq!(l.as_slice(), &["b", "c"]);
        assert_eq!(l.set(1, "z"), Some(Change::ItemSet { index: 1 }));
        assert_eq!(l.clear(), Change::Splices(vec![Splice::new(0, vec!["b", "z"], 0)]));
    }

    #[test]
    fn set_path_mutates_shared_record() {
        let n = Node::new(json!({"active": false}));
        let mut l = SourceList::new(vec![n.clone()]);
        match l.set_path(0, "active", json!(true)) {
            Some(Change::Field { index: 0, path }) => assert_eq!(path.to_string(), "active"),
            other => panic!("unexpected change: {:?}", other),
        }
        assert!(n.get_bool("active"));
        assert!(l.set_path(3, "active", json!(true)).is_none());
    }
}
