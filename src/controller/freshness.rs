/// Tracks whether the local snapshot is known to match the server for the active period, and
/// whether a refetch has fallen due because it stopped matching.
///
/// A refetch falls due each time the flag *becomes* false: at construction and after every
/// successful mutation. Taking the due refetch clears it, so a fetch that then fails is not
/// retried in a loop.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Freshness {
    fresh: bool,
    refetch_due: bool,
}

impl Freshness {
    /// Nothing has been fetched yet, so the data is stale and a refetch is due.
    pub fn new() -> Self {
        Self {
            fresh: false,
            refetch_due: true,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn is_refetch_due(&self) -> bool {
        self.refetch_due
    }

    /// A fetch for the active period succeeded.
    pub fn mark_fresh(&mut self) {
        self.fresh = true;
        self.refetch_due = false;
    }

    /// A mutation succeeded, so the server no longer matches the local snapshot.
    pub fn invalidate(&mut self) {
        self.fresh = false;
        self.refetch_due = true;
    }

    /// Returns true, once, when a refetch is due.
    pub fn take_refetch(&mut self) -> bool {
        std::mem::replace(&mut self.refetch_due, false)
    }
}

impl Default for Freshness {
    fn default() -> Self {
        Self::new()
    }
}
