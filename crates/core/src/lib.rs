//! Sift core types: item identity, change events, field paths and errors.
//!
//! Everything the projection engine in `sift-store` consumes lives here, so that
//! collaborators producing change notifications only need this crate.

#![forbid(unsafe_code)]

use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod item;
pub mod path;
pub mod source;

pub use item::Node;
pub use path::{FieldPath, ObservedPaths};
pub use source::SourceList;

/// Equality used to find an item again inside a projection.
///
/// Shared handles compare by pointer, plain values by value. One engine only
/// ever sees one `T`, so the policy is consistent within a configuration.
pub trait Identity {
    fn same_item(&self, other: &Self) -> bool;
}

impl<U: ?Sized> Identity for Arc<U> {
    fn same_item(&self, other: &Self) -> bool { Arc::ptr_eq(self, other) }
}

impl<U: ?Sized> Identity for Rc<U> {
    fn same_item(&self, other: &Self) -> bool { Rc::ptr_eq(self, other) }
}

macro_rules! identity_by_value {
    ($($t:ty),* $(,)?) => {
        $(impl Identity for $t {
            fn same_item(&self, other: &Self) -> bool { self == other }
        })*
    };
}

identity_by_value!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, bool, char, String, serde_json::Value);

impl Identity for &str {
    fn same_item(&self, other: &Self) -> bool { self == other }
}

/// First index holding `needle`, scanning left to right.
pub fn position_of<T: Identity>(haystack: &[T], needle: &T) -> Option<usize> {
    haystack.iter().position(|x| x.same_item(needle))
}

/// One edited region of the source. `index` and `added_count` address the
/// source *after* the edit; `removed` holds the items that left it.
#[derive(Debug, Clone, PartialEq)]
pub struct Splice<T> {
    pub index: usize,
    pub removed: Vec<T>,
    pub added_count: usize,
}

impl<T> Splice<T> {
    pub fn new(index: usize, removed: Vec<T>, added_count: usize) -> Self {
        Self { index, removed, added_count }
    }

    pub fn is_empty(&self) -> bool { self.removed.is_empty() && self.added_count == 0 }
}

/// What changed in the source collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    /// The whole collection was replaced.
    Replace,
    /// Only the length changed; the accompanying splices carry the details.
    Length,
    /// One or more structural edits, applied in order.
    Splices(Vec<Splice<T>>),
    /// The item slot at `index` was assigned a new item.
    ItemSet { index: usize },
    /// A nested field of the item at `index` was mutated in place.
    Field { index: usize, path: FieldPath },
}

impl<T> Change<T> {
    /// Parse a dotted change descriptor rooted at `root`, e.g. `items.3.address.city`.
    ///
    /// Returns `None` for anything malformed; callers treat that as a no-op.
    pub fn from_descriptor(root: &str, path: &str, splices: Option<Vec<Splice<T>>>) -> Option<Self> {
        let rest = match path.strip_prefix(root)? {
            "" => return Some(Change::Replace),
            rest => rest.strip_prefix('.')?,
        };
        match rest {
            "length" => Some(Change::Length),
            "splices" => splices.map(Change::Splices),
            _ => {
                let (head, tail) = match rest.split_once('.') {
                    Some((h, t)) => (h, Some(t)),
                    None => (rest, None),
                };
                let index = head.parse::<usize>().ok()?;
                match tail {
                    None => Some(Change::ItemSet { index }),
                    Some(t) => FieldPath::parse(t).map(|path| Change::Field { index, path }),
                }
            }
        }
    }
}

/// Which transform a method name was configured for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    Filter,
    Sort,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Filter => f.write_str("filter"),
            Role::Sort => f.write_str("sort"),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("unresolved {role} method: {name}")]
    UnresolvedMethod { role: Role, name: String },
}

pub type Result<T> = std::result::Result<T, ProjectionError>;

pub mod prelude {
    pub use super::{
        position_of, Change, FieldPath, Identity, Node, ObservedPaths, ProjectionError, Role, SourceList, Splice,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_routes() {
        assert_eq!(Change::<u32>::from_descriptor("items", "items", None), Some(Change::Replace));
        assert_eq!(Change::<u32>::from_descriptor("items", "items.length", None), Some(Change::Length));
        assert_eq!(Change::<u32>::from_descriptor("items", "items.4", None), Some(Change::ItemSet { index: 4 }));
        let splices = vec![Splice::new(0, vec![7u32], 1)];
        assert_eq!(
            Change::from_descriptor("items", "items.splices", Some(splices.clone())),
            Some(Change::Splices(splices))
        );
        match Change::<u32>::from_descriptor("items", "items.2.address.city", None) {
            Some(Change::Field { index, path }) => {
                assert_eq!(index, 2);
                assert_eq!(path.to_string(), "address.city");
            }
            other => panic!("unexpected route: {:?}", other),
        }
    }

    #[test]
    fn malformed_descriptors_are_dropped() {
        for p in ["", "other", "itemsx", "items.", "items.x.name", "items.1..a", "items.splices", "items.-1.a"] {
            assert_eq!(Change::<u32>::from_descriptor("items", p, None), None, "path {:?}", p);
        }
    }

    #[test]
    fn identity_policies() {
        let a = Arc::new(1);
        let b = Arc::new(1);
        assert!(a.same_item(&a.clone()));
        assert!(!a.same_item(&b));
        assert_eq!(position_of(&[3, 1, 3], &3), Some(0));
        assert_eq!(position_of(&["x", "y"], &"z"), None);
    }

    #[test]
    fn error_display() {
        let e = ProjectionError::UnresolvedMethod { role: Role::Sort, name: "byAge".into() };
        assert_eq!(e.to_string(), "unresolved sort method: byAge");
    }
}
