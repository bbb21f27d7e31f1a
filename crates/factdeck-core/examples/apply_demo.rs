//! Write-Engine Demonstration
//!
//! This example walks one fact through its whole lifecycle via the
//! `apply_write_op()` API.
#![allow(clippy::unwrap_used, clippy::expect_used)]
//!
//! Key concepts illustrated:
//! 1. Upsert and insert-vs-update classification
//! 2. Superseding an outdated belief
//! 3. Correction (deactivate + rewrite) and its atomicity
//! 4. Optimistic-lock conflicts
//! 5. Read-side queries and stats

use chrono::Utc;
use factdeck_core::{
    apply_write_op, queries, Card, CardQuery, CardRepository, SourceRef, WriteOp,
};

fn card(id: &str, turn_id: u32, age: u32) -> Card {
    let mut card = Card::new(
        id.to_string(),
        "user.age".to_string(),
        "alex".to_string(),
        serde_json::json!({ "age": age }),
        SourceRef::new("conv-42".to_string(), turn_id, "user".to_string(), Utc::now()),
    );
    card.content = format!("alex is {} years old", age);
    card.confidence = 0.9;
    card
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== factdeck Write-Engine Demo ===\n");

    let repo = CardRepository::new();

    // ===== Part 1: Upsert =====
    println!("## Part 1: Upsert\n");

    let result = apply_write_op(&repo, &WriteOp::upsert(card("card-age-1", 3, 29)));
    assert!(result.applied);
    println!("✓ Inserted card-age-1 (upserted: {:?})", result.upserted_ids);

    let result = apply_write_op(&repo, &WriteOp::upsert(card("card-age-1", 4, 29)));
    assert_eq!(result.updated_ids, vec!["card-age-1".to_string()]);
    println!("✓ Re-applied: classified as update, version bumped\n");

    // ===== Part 2: Supersede =====
    println!("## Part 2: Supersede\n");

    let result = apply_write_op(
        &repo,
        &WriteOp::supersede(card("card-age-2", 9, 30), "card-age-1".to_string()),
    );
    assert!(result.applied);
    println!("✓ card-age-2 written, card-age-1 superseded");

    let old = repo.find_by_id("card-age-1").unwrap();
    println!(
        "  card-age-1: status = {:?}, superseded_by = {:?}",
        old.status, old.superseded_by
    );

    let latest = queries::get_latest_by_fact_key(&repo, "alex", "user.age").unwrap();
    println!("  Latest belief: {}\n", latest.value);

    // ===== Part 3: Correction Atomicity =====
    println!("## Part 3: Correction\n");

    // A correction against a missing target must leave no trace of the
    // replacement card
    let result = apply_write_op(
        &repo,
        &WriteOp::correct(card("card-age-3", 11, 31), "no-such-card".to_string()),
    );
    assert!(!result.applied);
    assert!(repo.find_by_id("card-age-3").is_none());
    println!("✗ Correction of missing target rejected: {:?}", result.errors);
    println!("✓ Replacement card never became visible");

    let result = apply_write_op(
        &repo,
        &WriteOp::correct(card("card-age-3", 11, 31), "card-age-2".to_string()),
    );
    assert!(result.applied);
    println!(
        "✓ Correction applied: deleted {:?}, wrote {:?}\n",
        result.deleted_ids, result.upserted_ids
    );

    // ===== Part 4: Optimistic Lock =====
    println!("## Part 4: Optimistic Lock\n");

    let current = repo.find_by_id("card-age-3").unwrap();
    println!("card-age-3 is at version {}", current.version);

    let stale = WriteOp::upsert(card("card-age-3", 15, 32)).with_card_expected_version(99);
    let result = apply_write_op(&repo, &stale);
    assert!(!result.applied);
    println!("✗ Stale write rejected: {:?}", result.errors);

    let fresh = WriteOp::upsert(card("card-age-3", 15, 32))
        .with_card_expected_version(current.version);
    let result = apply_write_op(&repo, &fresh);
    assert!(result.applied);
    println!("✓ Write with current version accepted\n");

    // ===== Part 5: Queries & Stats =====
    println!("## Part 5: Queries & Stats\n");

    let views = queries::query_relevant_cards(&repo, &CardQuery::for_person("alex".to_string()));
    println!("Active cards for alex:");
    for view in &views {
        println!("  - {} {} [{:?}]", view.card_id, view.value, view.status);
    }

    let stats = repo.get_stats();
    println!(
        "\nStats: total={} active={} superseded={} uncertain={} deleted={}",
        stats.total, stats.active, stats.superseded, stats.uncertain, stats.deleted
    );

    Ok(())
}
