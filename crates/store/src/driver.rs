//! Async driver: one task owns the source list and the projector, applies
//! each mutation together with its notification, and runs the pending
//! recompute once the mailbox has been drained.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use arc_swap::ArcSwap;
use sift_core::{Change, Identity, ProjectionError, SourceList};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::{DriverConfig, FilterSpec, Host, LinkTable, Projector, SortSpec};

type Mutation<T> = Box<dyn FnOnce(&mut SourceList<T>) -> Vec<Change<T>> + Send>;

enum Command<T> {
    Attach(Vec<T>),
    Detach,
    Mutate(Mutation<T>),
    SetFilter(Option<FilterSpec<T>>),
    SetSort(Option<SortSpec<T>>),
    SetObserve(String),
    Update,
}

/// What readers see after each settled batch.
#[derive(Debug, Clone)]
pub struct ProjectionSnapshot<T> {
    pub epoch: u64,
    /// `None` while no source is attached.
    pub items: Option<Vec<T>>,
    pub links: LinkTable,
    pub recomputes: u64,
    /// Failure from the batch that produced this snapshot, if any. `items`
    /// then still holds the last good projection.
    pub last_error: Option<ProjectionError>,
}

impl<T> Default for ProjectionSnapshot<T> {
    fn default() -> Self { Self { epoch: 0, items: None, links: LinkTable::default(), recomputes: 0, last_error: None } }
}

/// Handle for submitting changes and reading the published projection.
pub struct ProjectionHandle<T> {
    tx: mpsc::Sender<Command<T>>,
    snap: Arc<ArcSwap<ProjectionSnapshot<T>>>,
    epoch_rx: watch::Receiver<u64>,
}

impl<T> Clone for ProjectionHandle<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone(), snap: Arc::clone(&self.snap), epoch_rx: self.epoch_rx.clone() }
    }
}

impl<T: Send + Sync + 'static> ProjectionHandle<T> {
    pub fn current(&self) -> Arc<ProjectionSnapshot<T>> { self.snap.load_full() }

    pub fn subscribe_epoch(&self) -> watch::Receiver<u64> { self.epoch_rx.clone() }

    async fn send(&self, cmd: Command<T>) -> Result<()> {
        self.tx.send(cmd).await.map_err(|_| anyhow!("projection driver stopped"))
    }

    /// Replace the source wholesale.
    pub async fn attach(&self, items: Vec<T>) -> Result<()> { self.send(Command::Attach(items)).await }

    pub async fn detach(&self) -> Result<()> { self.send(Command::Detach).await }

    /// Mutate the source; the closure returns the changes it made, typically
    /// straight from [`SourceList`]'s methods. A single change is patched in
    /// place. Several changes from one closure describe intermediate states
    /// of the list, so they cost a full recompute instead.
    pub async fn mutate<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut SourceList<T>) -> Vec<Change<T>> + Send + 'static,
    {
        self.send(Command::Mutate(Box::new(f))).await
    }

    pub async fn set_filter(&self, spec: Option<FilterSpec<T>>) -> Result<()> {
        self.send(Command::SetFilter(spec)).await
    }

    pub async fn set_sort(&self, spec: Option<SortSpec<T>>) -> Result<()> {
        self.send(Command::SetSort(spec)).await
    }

    pub async fn set_observe(&self, list: impl Into<String>) -> Result<()> {
        self.send(Command::SetObserve(list.into())).await
    }

    pub async fn update(&self) -> Result<()> { self.send(Command::Update).await }
}

struct Driver<T> {
    source: Option<SourceList<T>>,
    projector: Projector<T>,
    epoch: u64,
    last_error: Option<ProjectionError>,
}

impl<T: Clone + Identity + Send + Sync + 'static> Driver<T> {
    /// Returns whether the projection may have changed.
    fn handle(&mut self, cmd: Command<T>) -> bool {
        match cmd {
            Command::Attach(items) => {
                self.source = Some(SourceList::new(items));
                self.projector.update();
                false
            }
            Command::Detach => {
                self.source = None;
                self.projector.update();
                false
            }
            Command::Mutate(f) => {
                let Some(source) = self.source.as_mut() else {
                    debug!("mutation without attached source; dropped");
                    return false;
                };
                let changes = f(source);
                if changes.len() > 1 {
                    debug!(changes = changes.len(), "multi-change mutation; scheduling recompute");
                    self.projector.update();
                    return false;
                }
                let mut touched = false;
                for change in changes.iter() {
                    match self.projector.apply(source.as_slice(), change) {
                        Ok(route) => touched |= matches!(route, crate::Route::Splice | crate::Route::FieldCheck),
                        Err(e) => {
                            warn!(error = %e, "incremental patch failed; scheduling recompute");
                            self.last_error = Some(e);
                            self.projector.update();
                            touched = true;
                        }
                    }
                }
                touched
            }
            Command::SetFilter(spec) => {
                self.projector.set_filter(spec);
                false
            }
            Command::SetSort(spec) => {
                self.projector.set_sort(spec);
                false
            }
            Command::SetObserve(list) => {
                self.projector.set_observe(&list);
                false
            }
            Command::Update => {
                self.projector.update();
                false
            }
        }
    }

    fn settle(&mut self) -> bool {
        let source = self.source.as_ref().map(|s| s.as_slice());
        match self.projector.flush(source) {
            Ok(ran) => ran,
            Err(e) => {
                warn!(error = %e, "recompute failed");
                self.last_error = Some(e);
                true
            }
        }
    }

    fn publish(&mut self, snap: &ArcSwap<ProjectionSnapshot<T>>, epoch_tx: &watch::Sender<u64>) {
        self.epoch = self.epoch.saturating_add(1);
        // readers get the projection itself; the edit log only matters in-process
        self.projector.take_edits();
        let next = ProjectionSnapshot {
            epoch: self.epoch,
            items: self.projector.projection().map(|p| p.to_vec()),
            links: self.projector.links().clone(),
            recomputes: self.projector.recomputes(),
            last_error: self.last_error.clone(),
        };
        snap.store(Arc::new(next));
        let _ = epoch_tx.send(self.epoch);
    }
}

/// Spawn the driver task. Must be called inside a tokio runtime.
pub fn spawn_projection<T>(cfg: DriverConfig, host: Option<Arc<dyn Host<T>>>) -> ProjectionHandle<T>
where
    T: Clone + Identity + Send + Sync + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Command<T>>(cfg.mailbox.max(1));
    let snap = Arc::new(ArcSwap::from_pointee(ProjectionSnapshot::default()));
    let (epoch_tx, epoch_rx) = watch::channel(0u64);
    let snap_clone = Arc::clone(&snap);

    let mut projector = Projector::new();
    if let Some(host) = host {
        projector = projector.with_host(host);
    }

    debug!(mailbox = cfg.mailbox, "projection driver starting");
    tokio::spawn(async move {
        let mut driver = Driver { source: None, projector, epoch: 0, last_error: None };
        while let Some(cmd) = rx.recv().await {
            // an error is reported for the batch that hit it; publish its clearing too
            let mut dirty = driver.last_error.take().is_some();
            dirty |= driver.handle(cmd);
            // drain the burst before settling so its triggers share one pass
            while let Ok(cmd) = rx.try_recv() {
                dirty |= driver.handle(cmd);
            }
            dirty |= driver.settle();
            if dirty {
                driver.publish(&snap_clone, &epoch_tx);
            }
        }
        info!("projection driver stopped");
    });

    ProjectionHandle { tx, snap, epoch_rx }
}
