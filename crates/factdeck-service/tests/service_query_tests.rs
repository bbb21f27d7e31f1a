//! Service read-surface tests
//!
//! The JSON listing for the retrieval layer and the latest-belief lookup.

use chrono::Utc;
use factdeck_core::{Card, CardStatus, GetCardsRequest, SourceRef, WriteOp};
use factdeck_service::CardService;

fn card(id: &str, fact_key: &str, status: CardStatus, confidence: f64) -> Card {
    let mut card = Card::new(
        id.to_string(),
        fact_key.to_string(),
        "alex".to_string(),
        serde_json::json!({"v": id}),
        SourceRef::new("conv-1".to_string(), 1, "user".to_string(), Utc::now()),
    );
    card.status = status;
    card.confidence = confidence;
    card
}

fn seeded_service() -> CardService {
    let service = CardService::new();
    for card in [
        card("c-active", "user.age", CardStatus::Active, 0.9),
        card("c-uncertain", "user.age", CardStatus::Uncertain, 0.6),
        card("c-superseded", "user.age", CardStatus::Superseded, 0.9),
        card("c-low", "user.city", CardStatus::Active, 0.1),
    ] {
        let result = service.apply_card_write_ops(&WriteOp::upsert(card), None);
        assert!(result.applied);
    }
    service
}

#[test]
fn test_get_cards_as_string_defaults_to_active_only() {
    let service = seeded_service();
    let json = service
        .get_cards_as_string(&GetCardsRequest {
            person: "alex".to_string(),
            fact_keys: vec![],
            include_superseded: false,
            include_uncertain: false,
            min_confidence: 0.0,
        })
        .unwrap();

    let views: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
    let ids: Vec<&str> = views.iter().filter_map(|v| v["card_id"].as_str()).collect();
    assert!(ids.contains(&"c-active"));
    assert!(ids.contains(&"c-low"));
    assert!(!ids.contains(&"c-uncertain"));
    assert!(!ids.contains(&"c-superseded"));
}

#[test]
fn test_get_cards_as_string_opt_in_statuses_and_confidence() {
    let service = seeded_service();
    let json = service
        .get_cards_as_string(&GetCardsRequest {
            person: "alex".to_string(),
            fact_keys: vec!["user.age".to_string()],
            include_superseded: true,
            include_uncertain: true,
            min_confidence: 0.5,
        })
        .unwrap();

    let views: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
    let ids: Vec<&str> = views.iter().filter_map(|v| v["card_id"].as_str()).collect();
    assert_eq!(views.len(), 3);
    assert!(ids.contains(&"c-superseded"));
    assert!(ids.contains(&"c-uncertain"));
}

#[test]
fn test_get_cards_as_string_wire_shape() {
    // Enum fields as lowercase strings, timestamps ISO-8601, source_ref
    // inlined as a nested object, narrative fields absent
    let service = seeded_service();
    let json = service
        .get_cards_as_string(&GetCardsRequest {
            person: "alex".to_string(),
            fact_keys: vec!["user.age".to_string()],
            include_superseded: false,
            include_uncertain: false,
            min_confidence: 0.0,
        })
        .unwrap();

    let views: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
    assert_eq!(views.len(), 1);
    let view = &views[0];

    assert_eq!(view["status"], "active");
    assert_eq!(view["source_ref"]["conversation_id"], "conv-1");
    assert_eq!(view["source_ref"]["speaker"], "user");
    assert!(view["updated_at"]
        .as_str()
        .unwrap()
        .parse::<chrono::DateTime<chrono::Utc>>()
        .is_ok());
    assert!(view.get("content").is_none());
    assert!(view.get("backstory").is_none());
}

#[test]
fn test_get_latest_by_fact_key_preference() {
    let service = seeded_service();

    let latest = service.get_latest_by_fact_key("alex", "user.age").unwrap();
    assert_eq!(latest.card_id, "c-active");

    // Deactivate the active card; the uncertain one becomes the answer
    let result =
        service.apply_card_write_ops(&WriteOp::deactivate("c-active".to_string()), None);
    assert!(result.applied);
    let latest = service.get_latest_by_fact_key("alex", "user.age").unwrap();
    assert_eq!(latest.card_id, "c-uncertain");

    assert!(service.get_latest_by_fact_key("alex", "unknown.key").is_none());
}

#[test]
fn test_stats_through_service() {
    let service = seeded_service();
    let stats = service.get_stats();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.active, 2);
    assert_eq!(stats.superseded, 1);
    assert_eq!(stats.uncertain, 1);
    assert_eq!(stats.deleted, 0);
}
