use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::card::{Card, CardStatus, SourceRef};

/// Read-side projection of a card
///
/// Omits the bulk narrative fields (`content`, `backstory`, `relationship`)
/// so the agent's prompt surface carries only what retrieval needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardView {
    pub card_id: String,
    pub fact_key: String,
    pub value: serde_json::Value,
    pub status: CardStatus,
    pub confidence: f64,
    pub updated_at: DateTime<Utc>,
    pub source_ref: SourceRef,
}

impl CardView {
    /// Project a full card down to its view
    pub fn from_card(card: &Card) -> Self {
        Self {
            card_id: card.card_id.clone(),
            fact_key: card.fact_key.clone(),
            value: card.value.clone(),
            status: card.status,
            confidence: card.confidence,
            updated_at: card.updated_at,
            source_ref: card.source_ref.clone(),
        }
    }
}
