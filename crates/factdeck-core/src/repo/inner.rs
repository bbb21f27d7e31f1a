use std::collections::HashMap;

use chrono::Utc;

use super::transaction::UndoFrame;
use crate::errors::{CardStoreError, Result};
use crate::model::{Card, CardQuery, CardRef, CardStatus, StoreStats, TurnRange};

/// Single-threaded state behind the repository lock
///
/// The primary map owns every card record; the two indices are derived and
/// must agree with it at all times: a card id appears in a bucket iff the
/// primary record's current status / (person, fact_key) matches the bucket
/// key, with no duplicates within a bucket.
#[derive(Debug, Default)]
pub(crate) struct RepoInner {
    /// Primary map of card id to card record
    cards: HashMap<String, Card>,

    /// Derived index: status -> card ids
    status_index: HashMap<CardStatus, Vec<String>>,

    /// Derived index: (person, fact_key) -> card ids
    person_fact_index: HashMap<(String, String), Vec<String>>,

    /// Stack of open transaction frames; the top frame records snapshots
    txn_stack: Vec<UndoFrame>,
}

impl RepoInner {
    /// Record the pre-mutation value of `card_id` in the open frame, if any
    ///
    /// Must be called before the primary map is mutated for that id.
    fn touch(&mut self, card_id: &str) {
        if let Some(frame) = self.txn_stack.last_mut() {
            frame.record(card_id, self.cards.get(card_id).cloned());
        }
    }

    /// Remove a card's id from the buckets its current record occupies
    fn unindex(&mut self, card: &Card) {
        if let Some(bucket) = self.status_index.get_mut(&card.status) {
            bucket.retain(|id| id != &card.card_id);
        }
        let key = (card.person.clone(), card.fact_key.clone());
        if let Some(bucket) = self.person_fact_index.get_mut(&key) {
            bucket.retain(|id| id != &card.card_id);
        }
    }

    /// Insert a card's id into the buckets implied by its record
    fn index(&mut self, card: &Card) {
        let bucket = self.status_index.entry(card.status).or_default();
        if !bucket.contains(&card.card_id) {
            bucket.push(card.card_id.clone());
        }
        let key = (card.person.clone(), card.fact_key.clone());
        let bucket = self.person_fact_index.entry(key).or_default();
        if !bucket.contains(&card.card_id) {
            bucket.push(card.card_id.clone());
        }
    }

    /// Remove a card id from every bucket of both indices
    ///
    /// Rollback cannot trust the current record to name the right buckets,
    /// so it sweeps all of them before reinserting from the restored value.
    fn purge_from_indexes(&mut self, card_id: &str) {
        for bucket in self.status_index.values_mut() {
            bucket.retain(|id| id != card_id);
        }
        for bucket in self.person_fact_index.values_mut() {
            bucket.retain(|id| id != card_id);
        }
    }

    /// Soft-delete one card: tombstone flag, DELETED status, bumped
    /// `updated_at`/`version`, re-indexed
    ///
    /// `superseded_by` is cleared: it may only be set on SUPERSEDED records.
    fn tombstone(&mut self, mut card: Card) {
        self.touch(&card.card_id);
        self.unindex(&card);
        card.status = CardStatus::Deleted;
        card.deleted = true;
        card.superseded_by = None;
        card.updated_at = Utc::now();
        card.version += 1;
        self.index(&card);
        self.cards.insert(card.card_id.clone(), card);
    }

    // ===== Mutations =====

    pub(crate) fn save(&mut self, mut card: Card, expected_version: Option<u64>) -> Result<String> {
        let next_version = match self.cards.get(&card.card_id) {
            Some(existing) if !existing.deleted => {
                if let Some(expected) = expected_version {
                    if existing.version != expected {
                        return Err(CardStoreError::ConcurrentModification {
                            card_id: card.card_id.clone(),
                            expected,
                            actual: existing.version,
                        });
                    }
                }
                existing.version + 1
            }
            // Absent, or previously soft-deleted: a fresh identity
            _ => 0,
        };

        self.touch(&card.card_id);
        if let Some(old) = self.cards.get(&card.card_id).cloned() {
            self.unindex(&old);
        }

        card.version = next_version;
        self.index(&card);
        let card_id = card.card_id.clone();
        self.cards.insert(card_id.clone(), card);
        Ok(card_id)
    }

    pub(crate) fn mark_as_superseded(
        &mut self,
        old_id: &str,
        new_id: &str,
        expected_version: Option<u64>,
    ) -> Result<bool> {
        if !self.cards.contains_key(new_id) {
            return Ok(false);
        }
        let mut old = match self.cards.get(old_id) {
            // A soft-deleted record cannot transition to SUPERSEDED
            Some(card) if !card.deleted => card.clone(),
            _ => return Ok(false),
        };
        if let Some(expected) = expected_version {
            if old.version != expected {
                return Err(CardStoreError::ConcurrentModification {
                    card_id: old_id.to_string(),
                    expected,
                    actual: old.version,
                });
            }
        }

        self.touch(old_id);
        self.unindex(&old);
        old.status = CardStatus::Superseded;
        old.superseded_by = Some(new_id.to_string());
        old.updated_at = Utc::now();
        old.version += 1;
        self.index(&old);
        self.cards.insert(old_id.to_string(), old);
        Ok(true)
    }

    pub(crate) fn deactivate(&mut self, card_id: &str, expected_version: Option<u64>) -> Result<bool> {
        let card = match self.cards.get(card_id) {
            Some(card) => card.clone(),
            None => return Ok(false),
        };
        if let Some(expected) = expected_version {
            if card.version != expected {
                return Err(CardStoreError::ConcurrentModification {
                    card_id: card_id.to_string(),
                    expected,
                    actual: card.version,
                });
            }
        }
        self.tombstone(card);
        Ok(true)
    }

    pub(crate) fn logical_delete(&mut self, card_ids: &[String]) -> usize {
        let mut deleted_count = 0;
        for card_id in card_ids {
            // Missing ids and already-deleted cards are skipped, not errors
            if let Some(card) = self.cards.get(card_id) {
                if !card.deleted {
                    let card = card.clone();
                    self.tombstone(card);
                    deleted_count += 1;
                }
            }
        }
        deleted_count
    }

    pub(crate) fn logical_delete_by_source(
        &mut self,
        conversation_id: &str,
        turn_id: Option<u32>,
        turn_range: Option<&TurnRange>,
    ) -> usize {
        let matching: Vec<Card> = self
            .cards
            .values()
            .filter(|card| {
                !card.deleted
                    && card.source_ref.conversation_id == conversation_id
                    && match (turn_id, turn_range) {
                        (None, None) => true,
                        (t, r) => {
                            t.is_some_and(|t| card.source_ref.turn_id == t)
                                || r.is_some_and(|r| r.contains(card.source_ref.turn_id))
                        }
                    }
            })
            .cloned()
            .collect();

        let deleted_count = matching.len();
        for card in matching {
            self.tombstone(card);
        }
        deleted_count
    }

    // ===== Reads =====

    pub(crate) fn find_by_id(&self, card_id: &str) -> Option<Card> {
        self.cards.get(card_id).cloned()
    }

    pub(crate) fn find_by_person_and_fact_key(&self, person: &str, fact_key: &str) -> Vec<Card> {
        let key = (person.to_string(), fact_key.to_string());
        let mut cards: Vec<Card> = match self.person_fact_index.get(&key) {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.cards.get(id).cloned())
                .collect(),
            None => Vec::new(),
        };
        sort_most_recent_first(&mut cards);
        cards
    }

    pub(crate) fn query(&self, query: &CardQuery) -> Vec<Card> {
        let mut results: Vec<Card> = self
            .cards
            .values()
            .filter(|card| {
                !card.deleted
                    && card.person == query.person
                    && (query.fact_keys.is_empty() || query.fact_keys.contains(&card.fact_key))
                    && query.status_in.contains(&card.status)
                    && card.confidence >= query.min_confidence
                    && query
                        .time_window
                        .map_or(true, |window| window.contains(card.updated_at))
            })
            .cloned()
            .collect();
        sort_most_recent_first(&mut results);
        results.truncate(query.limit);
        results
    }

    pub(crate) fn find_by_refs(&self, refs: &[CardRef]) -> Vec<Card> {
        let mut cards = Vec::new();
        for card_ref in refs {
            if let Some(card) = self.cards.get(&card_ref.card_id) {
                let key_matches = card_ref
                    .fact_key
                    .as_ref()
                    .map_or(true, |key| &card.fact_key == key);
                if key_matches {
                    cards.push(card.clone());
                }
            }
        }
        cards
    }

    pub(crate) fn get_all_active(&self) -> Vec<Card> {
        match self.status_index.get(&CardStatus::Active) {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.cards.get(id))
                .filter(|card| !card.deleted)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    pub(crate) fn get_stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            total: self.cards.len(),
            active: 0,
            superseded: 0,
            uncertain: 0,
            deleted: 0,
        };
        for card in self.cards.values() {
            if card.deleted {
                stats.deleted += 1;
            }
            match card.status {
                CardStatus::Active if !card.deleted => stats.active += 1,
                CardStatus::Superseded => stats.superseded += 1,
                CardStatus::Uncertain => stats.uncertain += 1,
                _ => {}
            }
        }
        stats
    }

    // ===== Transactions =====

    pub(crate) fn begin(&mut self) {
        self.txn_stack.push(UndoFrame::default());
    }

    pub(crate) fn commit(&mut self) -> Result<()> {
        let frame = self
            .txn_stack
            .pop()
            .ok_or(CardStoreError::NoActiveTransaction)?;
        // Fold into the enclosing frame so an outer rollback still restores
        // ids that were only touched inside this committed frame
        if let Some(parent) = self.txn_stack.last_mut() {
            parent.absorb(frame);
        }
        Ok(())
    }

    pub(crate) fn rollback(&mut self) -> Result<()> {
        let frame = self
            .txn_stack
            .pop()
            .ok_or(CardStoreError::NoActiveTransaction)?;
        for (card_id, snapshot) in frame.into_snapshots() {
            self.purge_from_indexes(&card_id);
            match snapshot {
                Some(card) => {
                    self.index(&card);
                    self.cards.insert(card_id, card);
                }
                None => {
                    self.cards.remove(&card_id);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn open_transactions(&self) -> usize {
        self.txn_stack.len()
    }
}

/// Sort by `updated_at` descending, card id ascending as a deterministic
/// tiebreak (the primary map has no stable iteration order to preserve)
fn sort_most_recent_first(cards: &mut [Card]) {
    cards.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.card_id.cmp(&b.card_id))
    });
}
