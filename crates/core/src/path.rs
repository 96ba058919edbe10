//! Dotted field paths and observed-path matching.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A dotted path into an item, e.g. `address.city`, held as segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPath(SmallVec<[String; 4]>);

impl FieldPath {
    /// Parse a dotted path. Empty paths and empty segments are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() { return None; }
        let mut segs = SmallVec::new();
        for seg in s.split('.') {
            if seg.is_empty() { return None; }
            segs.push(seg.to_string());
        }
        Some(Self(segs))
    }

    pub fn segments(&self) -> &[String] { &self.0 }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// True when `self` is a strict segment prefix of `other`
    /// (`a.b` is a proper prefix of `a.b.c`, but not of `a.bc`).
    pub fn is_proper_prefix_of(&self, other: &FieldPath) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// JSON pointer form (`/address/city`), escaping `~` and `/`.
    pub fn to_pointer(&self) -> String {
        let mut out = String::new();
        for seg in self.0.iter() {
            out.push('/');
            out.push_str(&seg.replace('~', "~0").replace('/', "~1"));
        }
        out
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl FromStr for FieldPath {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s).ok_or(()) }
}

/// The set of paths whose mutation inside an item may move it in the projection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedPaths(Vec<FieldPath>);

impl ObservedPaths {
    /// Parse a whitespace-separated path list. Malformed entries are skipped.
    pub fn parse(list: &str) -> Self {
        Self(list.split_whitespace().filter_map(FieldPath::parse).collect())
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn paths(&self) -> &[FieldPath] { &self.0 }

    /// Three-way match of a mutated path (item prefix already stripped):
    /// exact, inside an observed subtree, or an ancestor of an observed leaf.
    pub fn matches(&self, tail: &FieldPath) -> bool {
        self.0.iter().any(|p| tail == p || p.is_proper_prefix_of(tail) || tail.is_proper_prefix_of(p))
    }
}

impl From<&str> for ObservedPaths {
    fn from(list: &str) -> Self { Self::parse(list) }
}
