use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::Result;

/// Lifecycle status of a fact card
///
/// Closed set: a card is either the current belief (`Active`), replaced by a
/// newer card (`Superseded`), held with doubt (`Uncertain`), or soft-deleted
/// (`Deleted`). Matches are exhaustive so a new status cannot be added
/// without revisiting every branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Active,
    Superseded,
    Uncertain,
    Deleted,
}

/// Inclusive range of turn ids within one conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRange {
    pub start: u32,
    pub end: u32,
}

impl TurnRange {
    /// Check whether a turn id falls within this range (inclusive on both ends)
    pub fn contains(&self, turn_id: u32) -> bool {
        self.start <= turn_id && turn_id <= self.end
    }
}

/// Provenance of a card: which conversation turn produced it, and who spoke
///
/// Used for audit trails, for source-scoped deletion, and for deriving a
/// stable event identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Conversation the fact was extracted from
    pub conversation_id: String,

    /// Turn within the conversation
    pub turn_id: u32,

    /// Speaker of the turn (e.g. "user", "assistant")
    pub speaker: String,

    /// Wall-clock time of the turn
    pub timestamp: DateTime<Utc>,
}

impl SourceRef {
    pub fn new(
        conversation_id: String,
        turn_id: u32,
        speaker: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            conversation_id,
            turn_id,
            speaker,
            timestamp,
        }
    }

    /// Derive the stable event identifier for this provenance record
    ///
    /// Computes the hex-encoded SHA-256 digest of the canonical JSON
    /// serialization. The same provenance always yields the same event id.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if JSON serialization fails.
    pub fn event_id(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Card - one attributable fact about a person
///
/// A card records a single fact (an opaque `value` under a semantic
/// `fact_key`), its provenance, a confidence score, and a lifecycle status.
/// Cards are never physically removed: deletion and replacement are status
/// transitions, so the audit history stays queryable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Unique identifier for this card
    pub card_id: String,

    /// Semantic category of the fact (e.g. "passport.expiry_date")
    pub fact_key: String,

    /// Opaque structured payload; stored pass-through, never interpreted
    pub value: serde_json::Value,

    /// Free-form rendering of the fact
    pub content: String,

    /// Free-form context around how the fact was learned
    pub backstory: String,

    /// Person the fact is about
    pub person: String,

    /// Relationship of the fact to the person (free-form)
    pub relationship: String,

    /// Lifecycle status
    pub status: CardStatus,

    /// Confidence score assigned by the extraction layer
    pub confidence: f64,

    /// Provenance of the fact
    pub source_ref: SourceRef,

    /// Timestamp when this card was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when this card was last updated
    pub updated_at: DateTime<Utc>,

    /// Per-card optimistic-lock counter; starts at 0, +1 on every mutation
    pub version: u64,

    /// Id of the replacing card; set iff status is `Superseded`
    pub superseded_by: Option<String>,

    /// Tombstone flag; true iff status is `Deleted`
    pub deleted: bool,
}

impl Card {
    /// Create a new active card with the given identity fields
    ///
    /// Narrative fields default to empty, confidence to 1.0, and both
    /// timestamps to now. `version` starts at 0 and is owned by the
    /// repository from the first save onward.
    pub fn new(
        card_id: String,
        fact_key: String,
        person: String,
        value: serde_json::Value,
        source_ref: SourceRef,
    ) -> Self {
        let now = Utc::now();
        Self {
            card_id,
            fact_key,
            value,
            content: String::new(),
            backstory: String::new(),
            person,
            relationship: String::new(),
            status: CardStatus::Active,
            confidence: 1.0,
            source_ref,
            created_at: now,
            updated_at: now,
            version: 0,
            superseded_by: None,
            deleted: false,
        }
    }

    /// Check if this card is live (not soft-deleted)
    pub fn is_live(&self) -> bool {
        !self.deleted
    }

    /// Check if this card is the current active belief
    pub fn is_active(&self) -> bool {
        self.status == CardStatus::Active && !self.deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_ref() -> SourceRef {
        SourceRef::new("conv-1".to_string(), 3, "user".to_string(), Utc::now())
    }

    #[test]
    fn test_new_card_defaults() {
        let card = Card::new(
            "card-1".to_string(),
            "passport.expiry_date".to_string(),
            "alex".to_string(),
            serde_json::json!({"date": "2026-10-10"}),
            source_ref(),
        );

        assert_eq!(card.card_id, "card-1");
        assert_eq!(card.status, CardStatus::Active);
        assert_eq!(card.version, 0);
        assert!(card.is_live());
        assert!(card.is_active());
        assert!(card.superseded_by.is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&CardStatus::Superseded).unwrap();
        assert_eq!(json, "\"superseded\"");

        let parsed: CardStatus = serde_json::from_str("\"deleted\"").unwrap();
        assert_eq!(parsed, CardStatus::Deleted);
    }

    #[test]
    fn test_turn_range_inclusive() {
        let range = TurnRange { start: 2, end: 5 };
        assert!(range.contains(2));
        assert!(range.contains(5));
        assert!(!range.contains(1));
        assert!(!range.contains(6));
    }

    #[test]
    fn test_event_id_is_stable() {
        let a = source_ref();
        let b = a.clone();
        assert_eq!(a.event_id().unwrap(), b.event_id().unwrap());
        assert_eq!(a.event_id().unwrap().len(), 64); // SHA256 hex length
    }

    #[test]
    fn test_event_id_differs_by_turn() {
        let a = source_ref();
        let mut b = a.clone();
        b.turn_id = 4;
        assert_ne!(a.event_id().unwrap(), b.event_id().unwrap());
    }
}
