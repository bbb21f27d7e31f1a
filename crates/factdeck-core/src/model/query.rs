use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::card::{CardStatus, TurnRange};

/// Default maximum number of cards returned by a query
pub const DEFAULT_QUERY_LIMIT: usize = 50;

/// Inclusive time window over `updated_at`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Check whether a timestamp falls within the window (inclusive)
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Filter for a repository card query
///
/// Soft-deleted cards are always excluded. An empty `fact_keys` list means
/// "any fact key".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardQuery {
    pub person: String,
    pub fact_keys: Vec<String>,
    pub status_in: Vec<CardStatus>,
    pub min_confidence: f64,
    pub time_window: Option<TimeWindow>,
    pub limit: usize,
}

impl CardQuery {
    /// Query for a person's active cards with no further filtering
    pub fn for_person(person: String) -> Self {
        Self {
            person,
            fact_keys: Vec::new(),
            status_in: vec![CardStatus::Active],
            min_confidence: 0.0,
            time_window: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

/// Reference to a card, optionally pinned to a fact key
///
/// A ref with a `fact_key` only resolves when the stored card still carries
/// that key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRef {
    pub card_id: String,
    #[serde(default)]
    pub fact_key: Option<String>,
}

/// Request for the serialized card listing consumed by the retrieval layer
///
/// ACTIVE cards are always included; SUPERSEDED and UNCERTAIN are opt-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetCardsRequest {
    pub person: String,
    #[serde(default)]
    pub fact_keys: Vec<String>,
    #[serde(default)]
    pub include_superseded: bool,
    #[serde(default)]
    pub include_uncertain: bool,
    #[serde(default)]
    pub min_confidence: f64,
}

/// Soft-delete request: either an explicit id batch, or a source scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub card_ids: Vec<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub turn_id: Option<u32>,
    #[serde(default)]
    pub turn_range: Option<TurnRange>,
}

/// Outcome of a soft-delete request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub deleted_count: usize,
    pub failed_ids: Vec<String>,
    pub errors: Vec<String>,
}

/// Per-status counts over the whole store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: usize,
    pub active: usize,
    pub superseded: usize,
    pub uncertain: usize,
    pub deleted: usize,
}
