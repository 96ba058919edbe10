//! Filter and sort configuration, host-named method resolution, and the
//! transform pass that turns a source slice into a candidate projection.

use std::cmp::Ordering;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use sift_core::{ProjectionError, Result, Role};

/// Predicate over an item, its source index and the whole source.
pub type FilterFn<T> = Arc<dyn Fn(&T, usize, &[T]) -> bool + Send + Sync>;
/// Comparator over two items.
pub type SortFn<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// A filter given either as a callable or as the name of a host method.
pub enum FilterSpec<T> {
    Inline(FilterFn<T>),
    Named(String),
}

impl<T: 'static> FilterSpec<T> {
    pub fn new(f: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        FilterSpec::Inline(Arc::new(move |item: &T, _: usize, _: &[T]| f(item)))
    }

    /// Predicate that also sees the item's source index and the whole source.
    pub fn indexed(f: impl Fn(&T, usize, &[T]) -> bool + Send + Sync + 'static) -> Self {
        FilterSpec::Inline(Arc::new(f))
    }

    pub fn named(name: impl Into<String>) -> Self { FilterSpec::Named(name.into()) }
}

impl<T> Clone for FilterSpec<T> {
    fn clone(&self) -> Self {
        match self {
            FilterSpec::Inline(f) => FilterSpec::Inline(Arc::clone(f)),
            FilterSpec::Named(n) => FilterSpec::Named(n.clone()),
        }
    }
}

/// A comparator given either as a callable or as the name of a host method.
pub enum SortSpec<T> {
    Inline(SortFn<T>),
    Named(String),
}

impl<T: 'static> SortSpec<T> {
    pub fn new(f: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static) -> Self {
        SortSpec::Inline(Arc::new(f))
    }

    pub fn named(name: impl Into<String>) -> Self { SortSpec::Named(name.into()) }
}

impl<T> Clone for SortSpec<T> {
    fn clone(&self) -> Self {
        match self {
            SortSpec::Inline(f) => SortSpec::Inline(Arc::clone(f)),
            SortSpec::Named(n) => SortSpec::Named(n.clone()),
        }
    }
}

/// The owning context that named filters and comparators resolve against.
pub trait Host<T>: Send + Sync {
    fn filter(&self, _name: &str) -> Option<FilterFn<T>> { None }

    fn sort(&self, _name: &str) -> Option<SortFn<T>> { None }
}

/// Registry of named filters and comparators.
pub struct MethodTable<T> {
    filters: FxHashMap<String, FilterFn<T>>,
    sorts: FxHashMap<String, SortFn<T>>,
}

impl<T> Default for MethodTable<T> {
    fn default() -> Self { Self { filters: FxHashMap::default(), sorts: FxHashMap::default() } }
}

impl<T: 'static> MethodTable<T> {
    pub fn new() -> Self { Self::default() }

    pub fn with_filter(mut self, name: impl Into<String>, f: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.filters.insert(name.into(), Arc::new(move |item: &T, _: usize, _: &[T]| f(item)));
        self
    }

    pub fn with_sort(mut self, name: impl Into<String>, f: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static) -> Self {
        self.sorts.insert(name.into(), Arc::new(f));
        self
    }
}

impl<T> Host<T> for MethodTable<T> {
    fn filter(&self, name: &str) -> Option<FilterFn<T>> { self.filters.get(name).cloned() }

    fn sort(&self, name: &str) -> Option<SortFn<T>> { self.sorts.get(name).cloned() }
}

enum Resolved<F> {
    Absent,
    Ready(F),
    /// Named on the host but not found there; fails when invoked.
    Missing(String),
}

impl<F> Resolved<F> {
    fn is_absent(&self) -> bool { matches!(self, Resolved::Absent) }
}

/// Resolved filter and comparator, applied filter first.
pub struct Pipeline<T> {
    filter: Resolved<FilterFn<T>>,
    sort: Resolved<SortFn<T>>,
}

impl<T> Default for Pipeline<T> {
    fn default() -> Self { Self { filter: Resolved::Absent, sort: Resolved::Absent } }
}

impl<T: Clone> Pipeline<T> {
    pub fn set_filter(&mut self, spec: Option<FilterSpec<T>>, host: Option<&dyn Host<T>>) {
        self.filter = match spec {
            None => Resolved::Absent,
            Some(FilterSpec::Inline(f)) => Resolved::Ready(f),
            Some(FilterSpec::Named(name)) if name.is_empty() => Resolved::Absent,
            Some(FilterSpec::Named(name)) => match host.and_then(|h| h.filter(&name)) {
                Some(f) => Resolved::Ready(f),
                None => Resolved::Missing(name),
            },
        };
    }

    pub fn set_sort(&mut self, spec: Option<SortSpec<T>>, host: Option<&dyn Host<T>>) {
        self.sort = match spec {
            None => Resolved::Absent,
            Some(SortSpec::Inline(f)) => Resolved::Ready(f),
            Some(SortSpec::Named(name)) if name.is_empty() => Resolved::Absent,
            Some(SortSpec::Named(name)) => match host.and_then(|h| h.sort(&name)) {
                Some(f) => Resolved::Ready(f),
                None => Resolved::Missing(name),
            },
        };
    }

    pub fn has_filter(&self) -> bool { !self.filter.is_absent() }

    pub fn has_sort(&self) -> bool { !self.sort.is_absent() }

    /// Candidate projection for `source`: a filtered, sorted copy.
    /// `None` source yields `None`.
    pub fn compute(&self, source: Option<&[T]>) -> Result<Option<Vec<T>>> {
        let Some(source) = source else { return Ok(None) };

        let mut out: Vec<T> = match &self.filter {
            Resolved::Absent => source.to_vec(),
            Resolved::Ready(f) => source
                .iter()
                .enumerate()
                .filter(|&(i, item)| f(item, i, source))
                .map(|(_, item)| item.clone())
                .collect(),
            Resolved::Missing(name) if !source.is_empty() => {
                return Err(ProjectionError::UnresolvedMethod { role: Role::Filter, name: name.clone() });
            }
            Resolved::Missing(_) => Vec::new(),
        };

        match &self.sort {
            Resolved::Absent => {}
            Resolved::Ready(cmp) => out.sort_by(|a, b| cmp(a, b)),
            Resolved::Missing(name) if out.len() > 1 => {
                return Err(ProjectionError::UnresolvedMethod { role: Role::Sort, name: name.clone() });
            }
            Resolved::Missing(_) => {}
        }

        Ok(Some(out))
    }
}
