use std::sync::Arc;

use tracing::{debug, info};

use factdeck_core::{
    apply_write_op, queries, CardQuery, CardRef, CardRepository, CardStatus, CardView,
    DeleteRequest, DeleteResult, GetCardsRequest, Result, StoreStats, WriteOp, WriteResult,
    model::DEFAULT_QUERY_LIMIT,
};

use crate::idempotency::IdempotencyLedger;

/// Service facade over one card repository
///
/// Owns the repository and the idempotency ledger, and exposes the
/// interfaces consumed by the agent/tool layer. Explicitly constructed and
/// passed by reference; there is no ambient global instance.
#[derive(Debug, Default)]
pub struct CardService {
    repository: Arc<CardRepository>,
    ledger: IdempotencyLedger,
}

impl CardService {
    /// Create a service over a fresh empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service over an existing repository
    pub fn with_repository(repository: Arc<CardRepository>) -> Self {
        Self {
            repository,
            ledger: IdempotencyLedger::new(),
        }
    }

    /// The underlying repository
    pub fn repository(&self) -> &Arc<CardRepository> {
        &self.repository
    }

    /// Apply one write intent, at most once per idempotency key
    ///
    /// A key that was already recorded short-circuits without touching the
    /// repository. Otherwise the intent runs atomically through the write
    /// engine, and the key is recorded only after a clean commit — a
    /// rejected write stays retryable under the same key.
    pub fn apply_card_write_ops(
        &self,
        op: &WriteOp,
        idempotency_key: Option<&str>,
    ) -> WriteResult {
        if let Some(key) = idempotency_key {
            if self.ledger.seen(key) {
                debug!(key, "write skipped: idempotency key already recorded");
                return WriteResult::already_applied();
            }
        }

        let result = apply_write_op(&self.repository, op);

        if result.applied {
            if let Some(key) = idempotency_key {
                self.ledger.record(key);
            }
            info!(kind = %op.kind, "card write applied");
        } else {
            info!(kind = %op.kind, errors = result.errors.len(), "card write rejected");
        }
        result
    }

    /// Filtered card lookup, projected down to views
    pub fn query_relevant_cards(&self, query: &CardQuery) -> Vec<CardView> {
        queries::query_relevant_cards(&self.repository, query)
    }

    /// The freshest belief for (person, fact_key), ACTIVE preferred over
    /// UNCERTAIN
    pub fn get_latest_by_fact_key(&self, person: &str, fact_key: &str) -> Option<CardView> {
        queries::get_latest_by_fact_key(&self.repository, person, fact_key)
    }

    /// Resolve refs to views
    pub fn read_cards_by_refs(&self, refs: &[CardRef]) -> Vec<CardView> {
        queries::read_cards_by_refs(&self.repository, refs)
    }

    /// Serialized card listing for the retrieval layer
    ///
    /// Builds the status filter from the request flags (ACTIVE always;
    /// SUPERSEDED and UNCERTAIN opt-in) and returns the matching views as a
    /// JSON array.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if JSON encoding fails.
    pub fn get_cards_as_string(&self, request: &GetCardsRequest) -> Result<String> {
        let mut status_in = vec![CardStatus::Active];
        if request.include_superseded {
            status_in.push(CardStatus::Superseded);
        }
        if request.include_uncertain {
            status_in.push(CardStatus::Uncertain);
        }

        let query = CardQuery {
            person: request.person.clone(),
            fact_keys: request.fact_keys.clone(),
            status_in,
            min_confidence: request.min_confidence,
            time_window: None,
            limit: DEFAULT_QUERY_LIMIT,
        };
        let views = self.query_relevant_cards(&query);
        Ok(serde_json::to_string(&views)?)
    }

    /// Soft-delete cards by explicit ids or by conversation source
    ///
    /// Best-effort: ids that are unknown are reported in `failed_ids`, not
    /// as errors. A request that names neither ids nor a usable source
    /// scope deletes nothing and explains why in `errors`.
    pub fn logical_delete_cards(&self, request: &DeleteRequest) -> DeleteResult {
        if !request.card_ids.is_empty() {
            let failed_ids: Vec<String> = request
                .card_ids
                .iter()
                .filter(|id| self.repository.find_by_id(id).is_none())
                .cloned()
                .collect();
            let deleted_count = self.repository.logical_delete(&request.card_ids);
            info!(deleted_count, "cards soft-deleted by id");
            return DeleteResult {
                deleted_count,
                failed_ids,
                errors: Vec::new(),
            };
        }

        if let Some(conversation_id) = request.conversation_id.as_deref() {
            if request.turn_id.is_none() && request.turn_range.is_none() {
                return DeleteResult {
                    deleted_count: 0,
                    failed_ids: Vec::new(),
                    errors: vec![
                        "delete by source requires turn_id or turn_range".to_string(),
                    ],
                };
            }
            let deleted_count = self.repository.logical_delete_by_source(
                conversation_id,
                request.turn_id,
                request.turn_range.as_ref(),
            );
            info!(conversation_id, deleted_count, "cards soft-deleted by source");
            return DeleteResult {
                deleted_count,
                failed_ids: Vec::new(),
                errors: Vec::new(),
            };
        }

        DeleteResult {
            deleted_count: 0,
            failed_ids: Vec::new(),
            errors: vec![
                "delete request requires card_ids, or conversation_id with turn_id/turn_range"
                    .to_string(),
            ],
        }
    }

    /// Per-status counts plus total/deleted
    pub fn get_stats(&self) -> StoreStats {
        self.repository.get_stats()
    }

    /// Drop every recorded idempotency key (test hook)
    pub fn clear_idempotency_keys(&self) {
        self.ledger.clear();
    }
}
