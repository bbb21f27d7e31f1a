//! Read-side query projections
//!
//! Read-only operations over the repository, returning minimal `CardView`
//! projections for the agent/tool layer. No state of its own.

use crate::model::{CardQuery, CardRef, CardStatus, CardView};
use crate::repo::CardRepository;

/// Filtered card lookup, projected down to views
pub fn query_relevant_cards(repo: &CardRepository, query: &CardQuery) -> Vec<CardView> {
    repo.query(query)
        .iter()
        .map(CardView::from_card)
        .collect()
}

/// The freshest belief for (person, fact_key)
///
/// Prefers an ACTIVE match; when none exists, falls back to the most
/// recently updated UNCERTAIN match; otherwise absent. Superseded and
/// deleted cards never surface here.
pub fn get_latest_by_fact_key(
    repo: &CardRepository,
    person: &str,
    fact_key: &str,
) -> Option<CardView> {
    let cards = repo.find_by_person_and_fact_key(person, fact_key);
    cards
        .iter()
        .find(|card| card.status == CardStatus::Active && !card.deleted)
        .or_else(|| {
            cards
                .iter()
                .find(|card| card.status == CardStatus::Uncertain && !card.deleted)
        })
        .map(CardView::from_card)
}

/// Resolve refs to views; refs that do not resolve are skipped
pub fn read_cards_by_refs(repo: &CardRepository, refs: &[CardRef]) -> Vec<CardView> {
    repo.find_by_refs(refs)
        .iter()
        .map(CardView::from_card)
        .collect()
}
