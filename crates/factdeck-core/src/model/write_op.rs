use serde::{Deserialize, Serialize};

use super::card::Card;

/// Kind of write intent submitted to the engine
///
/// `Link` is an extension point for an explicit association model; until
/// that model exists it behaves as `Upsert` without a supersede target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOpKind {
    Upsert,
    Supersede,
    Correct,
    Deactivate,
    Link,
}

impl std::fmt::Display for WriteOpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WriteOpKind::Upsert => "upsert",
            WriteOpKind::Supersede => "supersede",
            WriteOpKind::Correct => "correct",
            WriteOpKind::Deactivate => "deactivate",
            WriteOpKind::Link => "link",
        };
        write!(f, "{}", name)
    }
}

/// One atomic write intent
///
/// `card` is required for UPSERT/SUPERSEDE/CORRECT/LINK and
/// `target_card_id` for SUPERSEDE/CORRECT/DEACTIVATE; the engine validates
/// per kind. The three version fields are optional optimistic-lock tokens:
/// `expected_version` is the legacy single token, used as the fallback when
/// the card- or target-specific token is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOp {
    pub kind: WriteOpKind,
    pub card: Option<Card>,
    pub target_card_id: Option<String>,
    pub expected_version: Option<u64>,
    pub card_expected_version: Option<u64>,
    pub target_expected_version: Option<u64>,
}

impl WriteOp {
    fn new(kind: WriteOpKind, card: Option<Card>, target_card_id: Option<String>) -> Self {
        Self {
            kind,
            card,
            target_card_id,
            expected_version: None,
            card_expected_version: None,
            target_expected_version: None,
        }
    }

    /// Insert or update a card in place
    pub fn upsert(card: Card) -> Self {
        Self::new(WriteOpKind::Upsert, Some(card), None)
    }

    /// Save a new card and mark `target_card_id` as superseded by it
    pub fn supersede(card: Card, target_card_id: String) -> Self {
        Self::new(WriteOpKind::Supersede, Some(card), Some(target_card_id))
    }

    /// Soft-delete `target_card_id` and save the corrected card
    pub fn correct(card: Card, target_card_id: String) -> Self {
        Self::new(WriteOpKind::Correct, Some(card), Some(target_card_id))
    }

    /// Soft-delete a single card
    pub fn deactivate(target_card_id: String) -> Self {
        Self::new(WriteOpKind::Deactivate, None, Some(target_card_id))
    }

    /// Reserved association write; currently equivalent to `upsert`
    pub fn link(card: Card) -> Self {
        Self::new(WriteOpKind::Link, Some(card), None)
    }

    /// Set the legacy single optimistic-lock token
    pub fn with_expected_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// Set the optimistic-lock token for the new card
    pub fn with_card_expected_version(mut self, version: u64) -> Self {
        self.card_expected_version = Some(version);
        self
    }

    /// Set the optimistic-lock token for the target card
    pub fn with_target_expected_version(mut self, version: u64) -> Self {
        self.target_expected_version = Some(version);
        self
    }

    /// Upsert with a supersede target attached
    pub fn with_target(mut self, target_card_id: String) -> Self {
        self.target_card_id = Some(target_card_id);
        self
    }

    /// Effective expected version for the new card
    pub fn effective_card_version(&self) -> Option<u64> {
        self.card_expected_version.or(self.expected_version)
    }

    /// Effective expected version for the target card
    pub fn effective_target_version(&self) -> Option<u64> {
        self.target_expected_version.or(self.expected_version)
    }
}

/// Outcome of one write intent
///
/// When `applied` is false nothing was mutated: the id lists are empty and
/// `errors` explains why. A retried delivery short-circuited by the
/// idempotency ledger reports `applied = true` with empty lists and an
/// "already applied" note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteResult {
    pub applied: bool,
    pub upserted_ids: Vec<String>,
    pub updated_ids: Vec<String>,
    pub superseded_ids: Vec<String>,
    pub deleted_ids: Vec<String>,
    pub errors: Vec<String>,
}

impl WriteResult {
    /// Result for a retried delivery whose idempotency key was already recorded
    pub fn already_applied() -> Self {
        Self {
            applied: true,
            upserted_ids: Vec::new(),
            updated_ids: Vec::new(),
            superseded_ids: Vec::new(),
            deleted_ids: Vec::new(),
            errors: vec!["already applied".to_string()],
        }
    }

    /// Result for a rejected write; all id lists are empty
    pub fn rejected(errors: Vec<String>) -> Self {
        Self {
            applied: false,
            upserted_ids: Vec::new(),
            updated_ids: Vec::new(),
            superseded_ids: Vec::new(),
            deleted_ids: Vec::new(),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::card::SourceRef;
    use chrono::Utc;

    fn card(id: &str) -> Card {
        Card::new(
            id.to_string(),
            "user.age".to_string(),
            "alex".to_string(),
            serde_json::json!({"age": 30}),
            SourceRef::new("conv-1".to_string(), 1, "user".to_string(), Utc::now()),
        )
    }

    #[test]
    fn test_effective_versions_prefer_specific_tokens() {
        let op = WriteOp::upsert(card("c1"))
            .with_expected_version(3)
            .with_card_expected_version(5)
            .with_target_expected_version(7);

        assert_eq!(op.effective_card_version(), Some(5));
        assert_eq!(op.effective_target_version(), Some(7));
    }

    #[test]
    fn test_effective_versions_fall_back_to_legacy_token() {
        let op = WriteOp::supersede(card("c2"), "c1".to_string()).with_expected_version(3);

        assert_eq!(op.effective_card_version(), Some(3));
        assert_eq!(op.effective_target_version(), Some(3));
    }

    #[test]
    fn test_kind_displays_lowercase() {
        assert_eq!(WriteOpKind::Deactivate.to_string(), "deactivate");
        assert_eq!(WriteOpKind::Upsert.to_string(), "upsert");
    }

    #[test]
    fn test_already_applied_shape() {
        let result = WriteResult::already_applied();
        assert!(result.applied);
        assert!(result.upserted_ids.is_empty());
        assert_eq!(result.errors, vec!["already applied".to_string()]);
    }
}
