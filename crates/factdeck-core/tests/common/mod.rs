//! Shared builders for integration tests

use chrono::{DateTime, TimeZone, Utc};
use factdeck_core::{Card, CardStatus, SourceRef};

/// Fixed base instant so tests control ordering explicitly
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
}

pub fn source_ref(conversation_id: &str, turn_id: u32) -> SourceRef {
    SourceRef::new(
        conversation_id.to_string(),
        turn_id,
        "user".to_string(),
        base_time(),
    )
}

/// Active card for person "alex" under fact key "user.age"
pub fn card(id: &str) -> Card {
    card_for(id, "alex", "user.age")
}

pub fn card_for(id: &str, person: &str, fact_key: &str) -> Card {
    Card::new(
        id.to_string(),
        fact_key.to_string(),
        person.to_string(),
        serde_json::json!({"v": id}),
        source_ref("conv-1", 1),
    )
}

#[allow(dead_code)]
pub fn card_with_status(id: &str, status: CardStatus) -> Card {
    let mut card = card(id);
    card.status = status;
    card
}

#[allow(dead_code)]
pub fn card_at(id: &str, updated_at: DateTime<Utc>) -> Card {
    let mut card = card(id);
    card.created_at = updated_at;
    card.updated_at = updated_at;
    card
}
