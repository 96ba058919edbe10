//! Sift store: the projection engine.
//!
//! A [`Projector`] keeps a filtered and/or sorted projection of a caller-owned
//! source list in sync with it. Whole-list replacements and configuration
//! changes schedule one coalesced recompute; structural splices and observed
//! field mutations are patched in place with single-item removals and
//! insertions, so consumers see minimal edits.

#![forbid(unsafe_code)]

use std::sync::Arc;

use metrics::{counter, histogram};
use sift_core::{position_of, Change, FieldPath, Identity, ObservedPaths, Result, Splice};
use tracing::{debug, trace};

pub mod config;
pub mod debounce;
pub mod driver;
pub mod links;
pub mod transform;

pub use config::{DriverConfig, ProjectionConfig};
pub use debounce::{Debouncer, Ticket};
pub use driver::{spawn_projection, ProjectionHandle, ProjectionSnapshot};
pub use links::LinkTable;
pub use transform::{FilterFn, FilterSpec, Host, MethodTable, Pipeline, SortFn, SortSpec};

/// How a change is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Schedule a coalesced full recompute.
    Recompute,
    /// Nothing to do.
    Ignore,
    /// Patch the projection region by region.
    Splice,
    /// Re-place the one mutated item.
    FieldCheck,
}

/// One edit applied to the projection, in application order.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit<T> {
    /// The projection was replaced wholesale.
    Reset,
    Insert { index: usize, item: T },
    Remove { index: usize, item: T },
}

pub struct Projector<T> {
    pipeline: Pipeline<T>,
    host: Option<Arc<dyn Host<T>>>,
    observe: ObservedPaths,
    projection: Option<Vec<T>>,
    links: LinkTable,
    debounce: Debouncer,
    edits: Vec<Edit<T>>,
    recomputes: u64,
}

impl<T: Clone + Identity> Default for Projector<T> {
    fn default() -> Self { Self::new() }
}

impl<T: Clone + Identity> Projector<T> {
    pub fn new() -> Self {
        Self {
            pipeline: Pipeline::default(),
            host: None,
            observe: ObservedPaths::default(),
            projection: None,
            links: LinkTable::default(),
            debounce: Debouncer::new(),
            edits: Vec::new(),
            recomputes: 0,
        }
    }

    /// Context that named filters and comparators resolve against.
    pub fn with_host(mut self, host: Arc<dyn Host<T>>) -> Self {
        self.host = Some(host);
        self
    }

    /// Resolve and install a filter; schedules a recompute.
    pub fn set_filter(&mut self, spec: Option<FilterSpec<T>>) {
        self.pipeline.set_filter(spec, self.host.as_deref());
        self.schedule();
    }

    /// Resolve and install a comparator; schedules a recompute.
    pub fn set_sort(&mut self, spec: Option<SortSpec<T>>) {
        self.pipeline.set_sort(spec, self.host.as_deref());
        self.schedule();
    }

    /// Set the whitespace-separated list of observed field paths.
    pub fn set_observe(&mut self, list: &str) {
        self.observe = ObservedPaths::parse(list);
    }

    pub fn observed(&self) -> &ObservedPaths { &self.observe }

    /// Force a recompute on the next flush, e.g. when state a filter closes
    /// over changed without any item changing.
    pub fn update(&mut self) { self.schedule(); }

    fn schedule(&mut self) {
        let was_pending = self.debounce.is_pending();
        let ticket = self.debounce.schedule();
        if was_pending {
            counter!("sift_recompute_coalesced_total", 1u64);
        }
        trace!(ticket = ticket.id(), coalesced = was_pending, "recompute scheduled");
    }

    pub fn is_pending(&self) -> bool { self.debounce.is_pending() }

    /// Run the pending recompute, if any, against `source` as it is now.
    /// Returns whether a pass ran.
    pub fn flush(&mut self, source: Option<&[T]>) -> Result<bool> {
        let Some(ticket) = self.debounce.take() else { return Ok(false) };
        debug!(ticket = ticket.id(), "running scheduled recompute");
        self.recompute(source)?;
        Ok(true)
    }

    /// Replace the projection with a fresh pass over `source` and relink.
    pub fn recompute(&mut self, source: Option<&[T]>) -> Result<()> {
        let started = std::time::Instant::now();
        let next = self.pipeline.compute(source)?;
        debug!(
            source_len = ?source.map(|s| s.len()),
            projected_len = ?next.as_ref().map(|p| p.len()),
            "projection recomputed"
        );
        self.projection = next;
        self.recomputes += 1;
        self.edits.push(Edit::Reset);
        self.relink(source);
        histogram!("sift_recompute_ms", started.elapsed().as_secs_f64() * 1000.0);
        counter!("sift_recompute_total", 1u64);
        Ok(())
    }

    /// Decide how `change` is handled without applying it.
    pub fn classify(&self, change: &Change<T>) -> Route {
        match change {
            Change::Replace | Change::ItemSet { .. } => Route::Recompute,
            Change::Length => Route::Ignore,
            Change::Splices(regions) if regions.is_empty() => Route::Ignore,
            Change::Splices(_) => Route::Splice,
            Change::Field { path, .. } => {
                let transforms = self.pipeline.has_filter() || self.pipeline.has_sort();
                if transforms && !self.observe.is_empty() && self.observe.matches(path) {
                    Route::FieldCheck
                } else {
                    Route::Ignore
                }
            }
        }
    }

    /// Route `change` and apply it. `source` must already reflect the change.
    ///
    /// Splices and field checks patch the projection immediately; anything
    /// else is either ignored or left for the next [`flush`](Self::flush).
    /// Returns the route actually taken: a patch with no projection to patch
    /// yet is reported as [`Route::Recompute`].
    pub fn apply(&mut self, source: &[T], change: &Change<T>) -> Result<Route> {
        let route = self.classify(change);
        match (route, change) {
            (Route::Recompute, _) => self.schedule(),
            (Route::Ignore, _) => {}
            (_, _) if self.projection.is_none() => {
                // nothing to patch yet; rebuild from the current source instead
                debug!(?route, "no projection yet; scheduling recompute");
                self.schedule();
                return Ok(Route::Recompute);
            }
            (Route::Splice, Change::Splices(regions)) => self.apply_splices(source, regions)?,
            (Route::FieldCheck, Change::Field { index, path }) => self.apply_field(source, *index, path)?,
            _ => {}
        }
        Ok(route)
    }

    fn apply_splices(&mut self, source: &[T], regions: &[Splice<T>]) -> Result<()> {
        let mut applied = 0u64;
        for region in regions {
            let candidate = self.pipeline.compute(Some(source))?.unwrap_or_default();
            let Some(projection) = self.projection.as_mut() else { return Ok(()) };

            for removed in &region.removed {
                // already excluded by the filter: nothing to remove
                if let Some(pos) = position_of(projection, removed) {
                    let item = projection.remove(pos);
                    trace!(index = pos, "projection remove");
                    self.edits.push(Edit::Remove { index: pos, item });
                    applied += 1;
                }
            }

            let mut inserts: Vec<(usize, T)> = Vec::new();
            for i in 0..region.added_count {
                let Some(item) = source.get(region.index + i) else { break };
                if let Some(target) = position_of(&candidate, item) {
                    inserts.push((target, item.clone()));
                }
            }
            // least target first keeps every later target index valid
            inserts.sort_by_key(|(target, _)| *target);
            for (target, item) in inserts {
                let at = target.min(projection.len());
                projection.insert(at, item.clone());
                trace!(index = at, "projection insert");
                self.edits.push(Edit::Insert { index: at, item });
                applied += 1;
            }
        }
        debug!(regions = regions.len(), edits = applied, "splices applied");
        counter!("sift_splice_edits_total", applied);
        self.relink(Some(source));
        Ok(())
    }

    fn apply_field(&mut self, source: &[T], index: usize, path: &FieldPath) -> Result<()> {
        let Some(item) = source.get(index) else {
            debug!(index, %path, "field change outside source; ignored");
            return Ok(());
        };
        let candidate = self.pipeline.compute(Some(source))?.unwrap_or_default();
        let Some(projection) = self.projection.as_mut() else { return Ok(()) };

        let current = position_of(projection, item);
        let next = position_of(&candidate, item);
        debug!(index, %path, ?current, ?next, "observed field changed");
        if current != next {
            if let Some(c) = current {
                let removed = projection.remove(c);
                self.edits.push(Edit::Remove { index: c, item: removed });
                counter!("sift_field_edits_total", 1u64);
            }
            if let Some(n) = next {
                let at = n.min(projection.len());
                projection.insert(at, item.clone());
                self.edits.push(Edit::Insert { index: at, item: item.clone() });
                counter!("sift_field_edits_total", 1u64);
            }
        }
        self.relink(Some(source));
        Ok(())
    }

    fn relink(&mut self, source: Option<&[T]>) {
        match (source, self.projection.as_deref()) {
            (Some(source), Some(projection)) => self.links.refresh(source, projection),
            _ => self.links.clear(),
        }
    }

    /// Current projection; `None` until a pass has run over an attached source.
    pub fn projection(&self) -> Option<&[T]> { self.projection.as_deref() }

    pub fn links(&self) -> &LinkTable { &self.links }

    /// Drain the edits applied since the last call.
    pub fn take_edits(&mut self) -> Vec<Edit<T>> { std::mem::take(&mut self.edits) }

    /// Full passes run so far.
    pub fn recomputes(&self) -> u64 { self.recomputes }

    /// Triggers absorbed into an already pending recompute.
    pub fn coalesced(&self) -> u64 { self.debounce.coalesced() }
}
