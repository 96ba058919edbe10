//! Single-slot pending recompute.

/// Handle for one scheduled recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Ticket {
    pub fn id(&self) -> u64 { self.0 }
}

/// Coalesces recompute triggers: scheduling while a pass is pending replaces
/// the pending ticket instead of queueing another pass.
#[derive(Debug, Default)]
pub struct Debouncer {
    slot: Option<Ticket>,
    next: u64,
    coalesced: u64,
}

impl Debouncer {
    pub fn new() -> Self { Self::default() }

    pub fn schedule(&mut self) -> Ticket {
        if self.slot.is_some() { self.coalesced += 1; }
        self.next += 1;
        let t = Ticket(self.next);
        self.slot = Some(t);
        t
    }

    pub fn is_pending(&self) -> bool { self.slot.is_some() }

    /// Clear the slot ahead of running the pass.
    pub fn take(&mut self) -> Option<Ticket> { self.slot.take() }

    /// Triggers absorbed into an already pending pass.
    pub fn coalesced(&self) -> u64 { self.coalesced }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_ticket_replaces_pending() {
        let mut d = Debouncer::new();
        let a = d.schedule();
        let b = d.schedule();
        assert_ne!(a, b);
        assert_eq!(d.coalesced(), 1);
        assert_eq!(d.take(), Some(b));
        assert!(!d.is_pending());
        assert_eq!(d.take(), None);
    }
}
