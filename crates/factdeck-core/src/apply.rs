//! Write-operation engine
//!
//! This module provides `apply_write_op()`, the canonical entry point for
//! atomic card mutations.
//!
//! ## Atomicity Contract
//!
//! - **All-or-nothing**: every repository call made for one `WriteOp` runs
//!   inside a single transaction frame; any accumulated error rolls the
//!   whole frame back, so a failed write leaves no partial effect
//! - **No panics**: invalid intents come back as `WriteResult.errors` with
//!   `applied = false`, never as a panic or a raw `Err` to the caller
//! - **Version conflicts are data**: a `ConcurrentModification` raised by
//!   any repository call is folded into `errors` with a distinguishing
//!   message after the rollback
//!
//! ## Example
//!
//! ```
//! use factdeck_core::{apply_write_op, Card, CardRepository, SourceRef, WriteOp};
//! use chrono::Utc;
//!
//! let repo = CardRepository::new();
//! let card = Card::new(
//!     "card-1".to_string(),
//!     "user.age".to_string(),
//!     "alex".to_string(),
//!     serde_json::json!({"age": 30}),
//!     SourceRef::new("conv-1".to_string(), 1, "user".to_string(), Utc::now()),
//! );
//!
//! let result = apply_write_op(&repo, &WriteOp::upsert(card));
//! assert!(result.applied);
//! assert_eq!(result.upserted_ids, vec!["card-1".to_string()]);
//! ```

use tracing::debug;

use crate::errors::{CardStoreError, Result};
use crate::model::{Card, WriteOp, WriteOpKind, WriteResult};
use crate::repo::CardRepository;

/// Ids accumulated while dispatching one write intent
#[derive(Debug, Default)]
struct Outcome {
    upserted: Vec<String>,
    updated: Vec<String>,
    superseded: Vec<String>,
    deleted: Vec<String>,
}

/// Apply one write intent to the repository, atomically
///
/// Opens a transaction, dispatches by `op.kind`, and commits only when no
/// error accumulated. On any failure the transaction rolls back, the id
/// lists come back empty, and `applied` is false.
pub fn apply_write_op(repo: &CardRepository, op: &WriteOp) -> WriteResult {
    let mut outcome = Outcome::default();
    let mut errors: Vec<String> = Vec::new();

    let committed = repo.with_transaction(|repo| {
        dispatch(repo, op, &mut outcome, &mut errors)?;
        if errors.is_empty() {
            Ok(())
        } else {
            // Raise to trigger rollback of the whole frame
            Err(CardStoreError::Validation {
                reason: errors.join("; "),
            })
        }
    });

    match committed {
        Ok(()) => {
            debug!(kind = %op.kind, "write op applied");
            WriteResult {
                applied: true,
                upserted_ids: outcome.upserted,
                updated_ids: outcome.updated,
                superseded_ids: outcome.superseded,
                deleted_ids: outcome.deleted,
                errors: Vec::new(),
            }
        }
        Err(err) => {
            match &err {
                CardStoreError::ConcurrentModification { .. } => {
                    errors.push(format!("concurrent modification conflict: {}", err));
                }
                // Individual messages were already recorded before the raise
                CardStoreError::Validation { .. } if !errors.is_empty() => {}
                _ => errors.push(format!("write operation failed: {}", err)),
            }
            debug!(kind = %op.kind, errors = errors.len(), "write op rolled back");
            WriteResult::rejected(errors)
        }
    }
}

fn dispatch(
    repo: &CardRepository,
    op: &WriteOp,
    out: &mut Outcome,
    errors: &mut Vec<String>,
) -> Result<()> {
    match op.kind {
        // LINK is reserved for an explicit association model; until that
        // exists it behaves as UPSERT without a supersede target
        WriteOpKind::Upsert | WriteOpKind::Link => {
            let Some(card) = op.card.as_ref() else {
                errors.push(format!("{} requires a card", op.kind));
                return Ok(());
            };
            save_classified(repo, op, card, out)?;
            if op.kind == WriteOpKind::Upsert {
                if let Some(target_id) = op.target_card_id.as_deref() {
                    supersede_target(repo, op, target_id, &card.card_id, out, errors)?;
                }
            }
        }

        WriteOpKind::Supersede => {
            let (Some(card), Some(target_id)) = (op.card.as_ref(), op.target_card_id.as_deref())
            else {
                errors.push("supersede requires both a card and a target_card_id".to_string());
                return Ok(());
            };
            // The new card is a fresh identity: no version check against it
            repo.save(card.clone(), None)?;
            out.upserted.push(card.card_id.clone());
            supersede_target(repo, op, target_id, &card.card_id, out, errors)?;
        }

        WriteOpKind::Correct => {
            let (Some(card), Some(target_id)) = (op.card.as_ref(), op.target_card_id.as_deref())
            else {
                errors.push("correct requires both a card and a target_card_id".to_string());
                return Ok(());
            };
            if repo.deactivate(target_id, op.effective_target_version())? {
                out.deleted.push(target_id.to_string());
            } else {
                // The corrected card must not be written when the deactivate
                // step fails; the transaction rolls back with this error
                errors.push(format!("cannot deactivate card: {}", target_id));
                return Ok(());
            }
            save_classified(repo, op, card, out)?;
        }

        WriteOpKind::Deactivate => {
            let Some(target_id) = op.target_card_id.as_deref() else {
                errors.push("deactivate requires a target_card_id".to_string());
                return Ok(());
            };
            if repo.deactivate(target_id, op.effective_target_version())? {
                out.deleted.push(target_id.to_string());
            } else {
                errors.push(format!("cannot deactivate card: {}", target_id));
            }
        }
    }
    Ok(())
}

/// Save the op's card, recording its id as an update when a live record
/// already existed for it, else as an upsert
fn save_classified(
    repo: &CardRepository,
    op: &WriteOp,
    card: &Card,
    out: &mut Outcome,
) -> Result<()> {
    let is_update = repo
        .find_by_id(&card.card_id)
        .map(|existing| !existing.deleted)
        .unwrap_or(false);
    repo.save(card.clone(), op.effective_card_version())?;
    if is_update {
        out.updated.push(card.card_id.clone());
    } else {
        out.upserted.push(card.card_id.clone());
    }
    Ok(())
}

fn supersede_target(
    repo: &CardRepository,
    op: &WriteOp,
    target_id: &str,
    new_id: &str,
    out: &mut Outcome,
    errors: &mut Vec<String>,
) -> Result<()> {
    if repo.mark_as_superseded(target_id, new_id, op.effective_target_version())? {
        out.superseded.push(target_id.to_string());
    } else {
        errors.push(format!("cannot mark card as superseded: {}", target_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceRef;
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
    fn test_upsert_then_update_classification() {
        let repo = CardRepository::new();

        let first = apply_write_op(&repo, &WriteOp::upsert(card("c1")));
        assert!(first.applied);
        assert_eq!(first.upserted_ids, vec!["c1".to_string()]);
        assert!(first.updated_ids.is_empty());

        let second = apply_write_op(&repo, &WriteOp::upsert(card("c1")));
        assert!(second.applied);
        assert!(second.upserted_ids.is_empty());
        assert_eq!(second.updated_ids, vec!["c1".to_string()]);
    }

    #[test]
    fn test_upsert_without_card_is_rejected() {
        let repo = CardRepository::new();
        let op = WriteOp {
            kind: WriteOpKind::Upsert,
            card: None,
            target_card_id: None,
            expected_version: None,
            card_expected_version: None,
            target_expected_version: None,
        };

        let result = apply_write_op(&repo, &op);
        assert!(!result.applied);
        assert_eq!(result.errors, vec!["upsert requires a card".to_string()]);
    }

    #[test]
    fn test_deactivate_missing_target_rolls_back() {
        let repo = CardRepository::new();
        let result = apply_write_op(&repo, &WriteOp::deactivate("missing".to_string()));

        assert!(!result.applied);
        assert!(result.deleted_ids.is_empty());
        assert!(result.errors[0].contains("missing"));
    }

    #[test]
    fn test_link_behaves_as_upsert() {
        let repo = CardRepository::new();
        let result = apply_write_op(&repo, &WriteOp::link(card("c1")));

        assert!(result.applied);
        assert_eq!(result.upserted_ids, vec!["c1".to_string()]);
        assert!(repo.find_by_id("c1").is_some());
    }
}
