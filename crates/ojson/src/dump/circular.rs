//! Identity tracking for object-mode back-references.

use std::collections::HashMap;

/// Result of [`CircularCache::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// First visit; the value was assigned this id.
    Unseen(u64),
    /// The value was already emitted under this id.
    Seen(u64),
}

/// Maps composite identities to ids in first-visit order, starting at 1.
///
/// Lives for one top-level dump call.
#[derive(Debug, Default)]
pub struct CircularCache {
    ids: HashMap<usize, u64>,
    next: u64,
}

impl CircularCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `identity` on first sight, or returns its earlier id.
    pub fn check(&mut self, identity: usize) -> Visit {
        if let Some(&id) = self.ids.get(&identity) {
            tracing::trace!(id, "circular reference");
            return Visit::Seen(id);
        }
        self.next += 1;
        self.ids.insert(identity, self.next);
        Visit::Unseen(self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_first_visit_order() {
        let mut cache = CircularCache::new();
        assert_eq!(cache.check(0x100), Visit::Unseen(1));
        assert_eq!(cache.check(0x200), Visit::Unseen(2));
        assert_eq!(cache.check(0x100), Visit::Seen(1));
        assert_eq!(cache.check(0x300), Visit::Unseen(3));
        assert_eq!(cache.check(0x200), Visit::Seen(2));
    }
}
