//! Transaction rollback tests
//!
//! The undo-frame contract: the first touch of an id within a frame
//! snapshots its pre-transaction value (tombstone marker for ids that did
//! not exist), rollback restores exactly that state, and both derived
//! indices agree with the primary map afterward.

mod common;

use common::{card, card_for};
use factdeck_core::{CardRepository, CardStatus, CardStoreError};

#[test]
fn test_rollback_removes_cards_created_in_frame() {
    let repo = CardRepository::new();

    repo.begin_transaction();
    repo.save(card("c1"), None).unwrap();
    repo.save(card("c2"), None).unwrap();
    repo.rollback_transaction().unwrap();

    assert!(repo.find_by_id("c1").is_none());
    assert!(repo.find_by_id("c2").is_none());
    assert!(repo.get_all_active().is_empty());
    assert_eq!(repo.get_stats().total, 0);
}

#[test]
fn test_rollback_restores_pre_transaction_value_after_multiple_mutations() {
    // GIVEN a committed card
    let repo = CardRepository::new();
    let mut original = card("c1");
    original.content = "original".to_string();
    repo.save(original, None).unwrap();
    let before = repo.find_by_id("c1").unwrap();

    // WHEN a frame mutates the same id several times then rolls back
    repo.begin_transaction();
    let mut first = card("c1");
    first.content = "first rewrite".to_string();
    repo.save(first, None).unwrap();
    let mut second = card("c1");
    second.content = "second rewrite".to_string();
    repo.save(second, None).unwrap();
    repo.deactivate("c1", None).unwrap();
    repo.rollback_transaction().unwrap();

    // THEN the pre-transaction value is back, not a mid-frame snapshot
    let after = repo.find_by_id("c1").unwrap();
    assert_eq!(after, before);
    assert_eq!(after.content, "original");
    assert_eq!(after.version, 0);
    assert!(!after.deleted);
}

#[test]
fn test_rollback_rebuilds_indices_from_restored_values() {
    let repo = CardRepository::new();
    repo.save(card_for("c1", "alex", "user.age"), None).unwrap();

    repo.begin_transaction();
    // Move the card to a different person/fact bucket and tombstone it
    let mut moved = card_for("c1", "sam", "user.city");
    moved.status = CardStatus::Uncertain;
    repo.save(moved, None).unwrap();
    repo.deactivate("c1", None).unwrap();
    repo.rollback_transaction().unwrap();

    // Old buckets hold the card again; new buckets do not
    let by_old_key = repo.find_by_person_and_fact_key("alex", "user.age");
    assert_eq!(by_old_key.len(), 1);
    assert_eq!(by_old_key[0].card_id, "c1");
    assert!(repo.find_by_person_and_fact_key("sam", "user.city").is_empty());

    let active = repo.get_all_active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].card_id, "c1");
}

#[test]
fn test_commit_keeps_frame_effects() {
    let repo = CardRepository::new();

    repo.begin_transaction();
    repo.save(card("c1"), None).unwrap();
    repo.commit_transaction().unwrap();

    assert!(repo.find_by_id("c1").is_some());
    assert_eq!(repo.get_all_active().len(), 1);
}

#[test]
fn test_commit_without_open_frame_errors() {
    let repo = CardRepository::new();
    assert_eq!(
        repo.commit_transaction(),
        Err(CardStoreError::NoActiveTransaction)
    );
    assert_eq!(
        repo.rollback_transaction(),
        Err(CardStoreError::NoActiveTransaction)
    );
}

#[test]
fn test_nested_frames_inner_commit_outer_rollback() {
    // Only the top frame is affected by its own commit; a committed inner
    // frame still unwinds when the outer frame rolls back
    let repo = CardRepository::new();
    repo.save(card("base"), None).unwrap();

    repo.begin_transaction();
    repo.save(card("outer"), None).unwrap();

    repo.begin_transaction();
    repo.save(card("inner"), None).unwrap();
    repo.commit_transaction().unwrap();
    assert_eq!(repo.open_transactions(), 1);

    repo.rollback_transaction().unwrap();

    assert!(repo.find_by_id("outer").is_none());
    assert!(repo.find_by_id("inner").is_none());
    assert!(repo.find_by_id("base").is_some());
    assert_eq!(repo.open_transactions(), 0);
}

#[test]
fn test_nested_frames_inner_rollback_keeps_outer_effects() {
    let repo = CardRepository::new();

    repo.begin_transaction();
    repo.save(card("outer"), None).unwrap();

    repo.begin_transaction();
    repo.save(card("inner"), None).unwrap();
    repo.rollback_transaction().unwrap();

    assert!(repo.find_by_id("inner").is_none());
    assert!(repo.find_by_id("outer").is_some());

    repo.commit_transaction().unwrap();
    assert!(repo.find_by_id("outer").is_some());
}

#[test]
fn test_with_transaction_commits_on_ok() {
    let repo = CardRepository::new();

    repo.with_transaction(|repo| {
        repo.save(card("c1"), None)?;
        Ok(())
    })
    .unwrap();

    assert!(repo.find_by_id("c1").is_some());
    assert_eq!(repo.open_transactions(), 0);
}

#[test]
fn test_with_transaction_rolls_back_on_err() {
    let repo = CardRepository::new();

    let result: Result<(), _> = repo.with_transaction(|repo| {
        repo.save(card("c1"), None)?;
        Err(CardStoreError::Internal {
            message: "forced failure".to_string(),
        })
    });

    assert!(result.is_err());
    assert!(repo.find_by_id("c1").is_none());
    assert_eq!(repo.open_transactions(), 0);
}
