use std::collections::HashMap;

use crate::model::Card;

/// One transaction frame: the pre-transaction value of every card id the
/// frame touched
///
/// `None` marks an id that did not exist when first touched (a tombstone
/// marker for rollback). Only the first touch of an id records a snapshot;
/// later mutations of the same id within the frame must not overwrite it,
/// otherwise rollback would restore a mid-transaction value.
#[derive(Debug, Default)]
pub(crate) struct UndoFrame {
    snapshots: HashMap<String, Option<Card>>,
}

impl UndoFrame {
    /// Record the prior value for `card_id`, first touch only
    pub(crate) fn record(&mut self, card_id: &str, prior: Option<Card>) {
        self.snapshots
            .entry(card_id.to_string())
            .or_insert(prior);
    }

    /// Fold a committed inner frame into this (parent) frame
    ///
    /// An id already touched by the parent keeps the parent's older
    /// snapshot; ids touched only inside the inner frame carry their
    /// pre-inner value, which for the parent is also the pre-transaction
    /// value. Without this fold, an outer rollback after an inner commit
    /// would miss the inner frame's ids.
    pub(crate) fn absorb(&mut self, inner: UndoFrame) {
        for (card_id, snapshot) in inner.snapshots {
            self.snapshots.entry(card_id).or_insert(snapshot);
        }
    }

    /// Consume the frame, yielding (card_id, prior-value-or-tombstone) pairs
    pub(crate) fn into_snapshots(self) -> HashMap<String, Option<Card>> {
        self.snapshots
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.snapshots.len()
    }
}
