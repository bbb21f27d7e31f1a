//! Card repository: primary map, derived indices, transactions
//!
//! One `CardRepository` owns the primary card map, the two derived lookup
//! indices, a per-instance reentrant serialization lock, and the stack of
//! transaction undo-frames. All public methods serialize on the lock, so a
//! repository can be shared across threads behind an `Arc`; no operation
//! observes a partially-mutated intermediate state of another.
//!
//! ## Locking discipline
//!
//! The lock is reentrant because `with_transaction` holds it for the whole
//! closure while the write engine calls back into public repository
//! methods. Public methods take a short `RefCell` borrow and never call
//! other public methods while holding it; all shared logic lives on
//! `RepoInner`, which operates on already-borrowed state.

mod inner;
mod transaction;

use std::cell::RefCell;

use parking_lot::ReentrantMutex;

use crate::errors::Result;
use crate::model::{Card, CardQuery, CardRef, CardStatus, StoreStats, TurnRange};
use inner::RepoInner;

/// In-memory store of fact cards with optimistic versioning and
/// transactional rollback
#[derive(Debug, Default)]
pub struct CardRepository {
    state: ReentrantMutex<RefCell<RepoInner>>,
}

impl CardRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a card, or update it in place
    ///
    /// A fresh id, or an id whose record was previously soft-deleted, is
    /// treated as a new identity and stored at version 0. A live record is
    /// updated in place at `existing.version + 1`, re-indexing the record
    /// out of its old status and person/fact buckets and into the new ones.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrentModification` if `expected_version` is supplied, a
    /// live record exists, and its current version differs; the stored
    /// record is left unchanged.
    pub fn save(&self, card: Card, expected_version: Option<u64>) -> Result<String> {
        let guard = self.state.lock();
        let result = guard.borrow_mut().save(card, expected_version);
        result
    }

    /// Look up a card by id, including superseded and soft-deleted records
    pub fn find_by_id(&self, card_id: &str) -> Option<Card> {
        let guard = self.state.lock();
        let result = guard.borrow().find_by_id(card_id);
        result
    }

    /// All cards for (person, fact_key), most recently updated first
    pub fn find_by_person_and_fact_key(&self, person: &str, fact_key: &str) -> Vec<Card> {
        let guard = self.state.lock();
        let result = guard.borrow().find_by_person_and_fact_key(person, fact_key);
        result
    }

    /// The first ACTIVE, non-deleted card for (person, fact_key), if any
    pub fn find_active_by_person_and_fact_key(
        &self,
        person: &str,
        fact_key: &str,
    ) -> Option<Card> {
        self.find_by_person_and_fact_key(person, fact_key)
            .into_iter()
            .find(|card| card.status == CardStatus::Active && !card.deleted)
    }

    /// Filtered scan over live cards, most recently updated first, capped at
    /// `query.limit`
    pub fn query(&self, query: &CardQuery) -> Vec<Card> {
        let guard = self.state.lock();
        let result = guard.borrow().query(query);
        result
    }

    /// Resolve refs to cards; a ref with a `fact_key` only matches a card
    /// still carrying that key
    pub fn find_by_refs(&self, refs: &[CardRef]) -> Vec<Card> {
        let guard = self.state.lock();
        let result = guard.borrow().find_by_refs(refs);
        result
    }

    /// Mark `old_id` superseded by `new_id`
    ///
    /// Returns false if either id is unknown. On success the old card gets
    /// `status = Superseded`, `superseded_by = new_id`, and bumped
    /// `updated_at`/`version`, and is re-indexed.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrentModification` if `expected_version` is supplied
    /// and the old card's current version differs.
    pub fn mark_as_superseded(
        &self,
        old_id: &str,
        new_id: &str,
        expected_version: Option<u64>,
    ) -> Result<bool> {
        let guard = self.state.lock();
        let result = guard
            .borrow_mut()
            .mark_as_superseded(old_id, new_id, expected_version);
        result
    }

    /// Optimistic-lock-checked soft delete of a single card
    ///
    /// Returns false if the id is unknown. On success the card gets
    /// `status = Deleted` and `deleted = true` with bumped
    /// `updated_at`/`version`; the record itself stays queryable.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrentModification` on a version mismatch.
    pub fn deactivate(&self, card_id: &str, expected_version: Option<u64>) -> Result<bool> {
        let guard = self.state.lock();
        let result = guard.borrow_mut().deactivate(card_id, expected_version);
        result
    }

    /// Best-effort batch soft delete, no version checks
    ///
    /// Ids that are unknown or already deleted are skipped; returns the
    /// number of cards actually transitioned.
    pub fn logical_delete(&self, card_ids: &[String]) -> usize {
        let guard = self.state.lock();
        let result = guard.borrow_mut().logical_delete(card_ids);
        result
    }

    /// Soft-delete all live cards from one conversation source
    ///
    /// A card matches when its `source_ref.conversation_id` equals
    /// `conversation_id` and, when the respective filter is provided, its
    /// turn id equals `turn_id` or falls within `turn_range` (inclusive).
    pub fn logical_delete_by_source(
        &self,
        conversation_id: &str,
        turn_id: Option<u32>,
        turn_range: Option<&TurnRange>,
    ) -> usize {
        let guard = self.state.lock();
        let result = guard
            .borrow_mut()
            .logical_delete_by_source(conversation_id, turn_id, turn_range);
        result
    }

    /// All cards with `status == Active && !deleted`, via the status index
    pub fn get_all_active(&self) -> Vec<Card> {
        let guard = self.state.lock();
        let result = guard.borrow().get_all_active();
        result
    }

    /// Per-status counts plus total/deleted
    pub fn get_stats(&self) -> StoreStats {
        let guard = self.state.lock();
        let result = guard.borrow().get_stats();
        result
    }

    // ===== Transactions =====

    /// Run `f` inside a transaction frame, holding the repository lock for
    /// the whole scope
    ///
    /// Commits on `Ok`, rolls back on `Err`. This is the only path that
    /// guarantees both serialization against other threads for the full
    /// multi-call scope and commit-or-rollback on every exit; prefer it
    /// over the raw `begin`/`commit`/`rollback` protocol.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error after rolling the frame back.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let guard = self.state.lock();
        guard.borrow_mut().begin();
        // The borrow is released before f runs; the reentrant lock stays
        // held, so f can call back into public methods on this thread while
        // other threads stay serialized out.
        match f(self) {
            Ok(value) => {
                guard.borrow_mut().commit()?;
                Ok(value)
            }
            Err(err) => {
                guard.borrow_mut().rollback()?;
                Err(err)
            }
        }
    }

    /// Open a new transaction frame
    ///
    /// Frames nest via a stack; only the top frame is affected by its own
    /// commit or rollback.
    pub fn begin_transaction(&self) {
        let guard = self.state.lock();
        guard.borrow_mut().begin();
    }

    /// Commit the top transaction frame
    ///
    /// A committed inner frame folds its snapshots into the enclosing
    /// frame, so an outer rollback still restores the pre-transaction state.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveTransaction` if no frame is open.
    pub fn commit_transaction(&self) -> Result<()> {
        let guard = self.state.lock();
        let result = guard.borrow_mut().commit();
        result
    }

    /// Roll back the top transaction frame
    ///
    /// Every id the frame touched is restored to its pre-transaction value
    /// (or removed, for ids that did not exist), swept out of every index
    /// bucket, and re-indexed from the restored value.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveTransaction` if no frame is open.
    pub fn rollback_transaction(&self) -> Result<()> {
        let guard = self.state.lock();
        let result = guard.borrow_mut().rollback();
        result
    }

    /// Number of currently open transaction frames
    pub fn open_transactions(&self) -> usize {
        let guard = self.state.lock();
        let result = guard.borrow().open_transactions();
        result
    }
}
