//! Wire request types for the tool surface
//!
//! Everything the agent loop sends arrives as JSON; this module turns it
//! into the core's value objects. Free-text action strings, ISO-8601
//! window bounds, and missing card ids are all resolved here — the core
//! never parses wire data itself.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use factdeck_core::{
    Card, CardQuery, CardStatus, CardStoreError, Result, SourceRef, TimeWindow, WriteOp,
    WriteOpKind, model::DEFAULT_QUERY_LIMIT,
};

/// Map a wire action string onto an operation kind
///
/// Accepts the agent-facing aliases ("add") alongside the canonical kind
/// names, case-insensitively.
///
/// # Errors
///
/// Returns `Validation` with an "unknown operation type" message for any
/// other string.
pub fn parse_action(action: &str) -> Result<WriteOpKind> {
    match action.trim().to_ascii_lowercase().as_str() {
        "add" | "upsert" => Ok(WriteOpKind::Upsert),
        "supersede" => Ok(WriteOpKind::Supersede),
        "correct" => Ok(WriteOpKind::Correct),
        "deactivate" => Ok(WriteOpKind::Deactivate),
        "link" => Ok(WriteOpKind::Link),
        other => Err(CardStoreError::Validation {
            reason: format!("unknown operation type: {}", other),
        }),
    }
}

fn default_confidence() -> f64 {
    1.0
}

/// Card as it arrives over the wire
///
/// Laxer than the stored `Card`: the id may be omitted (one is minted),
/// status defaults to active, timestamps to now.
#[derive(Debug, Clone, Deserialize)]
pub struct CardPayload {
    #[serde(default)]
    pub card_id: Option<String>,
    pub fact_key: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub backstory: String,
    pub person: String,
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub status: Option<CardStatus>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    pub source_ref: SourceRef,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CardPayload {
    /// Build the stored card, minting a UUID v7 id when none was supplied
    pub fn into_card(self) -> Card {
        let now = Utc::now();
        let status = self.status.unwrap_or(CardStatus::Active);
        Card {
            card_id: self
                .card_id
                .unwrap_or_else(|| Uuid::now_v7().to_string()),
            fact_key: self.fact_key,
            value: self.value,
            content: self.content,
            backstory: self.backstory,
            person: self.person,
            relationship: self.relationship,
            status,
            confidence: self.confidence,
            source_ref: self.source_ref,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
            version: 0,
            superseded_by: None,
            deleted: status == CardStatus::Deleted,
        }
    }
}

/// One write-tool invocation
#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    pub action: String,
    #[serde(default)]
    pub card: Option<CardPayload>,
    #[serde(default)]
    pub target_card_id: Option<String>,
    #[serde(default)]
    pub expected_version: Option<u64>,
    #[serde(default)]
    pub card_expected_version: Option<u64>,
    #[serde(default)]
    pub target_expected_version: Option<u64>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl WriteRequest {
    /// Resolve the wire request into a write intent and its idempotency key
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an unknown action string. Per-kind required
    /// fields are left to the engine, which folds them into
    /// `WriteResult.errors`.
    pub fn into_write_op(self) -> Result<(WriteOp, Option<String>)> {
        let kind = parse_action(&self.action)?;
        let op = WriteOp {
            kind,
            card: self.card.map(CardPayload::into_card),
            target_card_id: self.target_card_id,
            expected_version: self.expected_version,
            card_expected_version: self.card_expected_version,
            target_expected_version: self.target_expected_version,
        };
        Ok((op, self.idempotency_key))
    }
}

/// ISO-8601 window bounds as they arrive over the wire
#[derive(Debug, Clone, Deserialize)]
pub struct TimeWindowPayload {
    pub start: String,
    pub end: String,
}

impl TimeWindowPayload {
    fn into_window(self) -> Result<TimeWindow> {
        Ok(TimeWindow {
            start: parse_timestamp(&self.start)?,
            end: parse_timestamp(&self.end)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|err| CardStoreError::Validation {
            reason: format!("invalid timestamp '{}': {}", raw, err),
        })
}

/// One query-tool invocation
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub person: String,
    #[serde(default)]
    pub fact_keys: Vec<String>,
    #[serde(default)]
    pub status_in: Option<Vec<CardStatus>>,
    #[serde(default)]
    pub min_confidence: f64,
    #[serde(default)]
    pub time_window: Option<TimeWindowPayload>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl QueryRequest {
    /// Resolve the wire request into a repository query filter
    ///
    /// # Errors
    ///
    /// Returns `Validation` when a window bound is not valid ISO-8601.
    pub fn into_query(self) -> Result<CardQuery> {
        let time_window = self
            .time_window
            .map(TimeWindowPayload::into_window)
            .transpose()?;
        Ok(CardQuery {
            person: self.person,
            fact_keys: self.fact_keys,
            status_in: self
                .status_in
                .unwrap_or_else(|| vec![CardStatus::Active]),
            min_confidence: self.min_confidence,
            time_window,
            limit: self.limit.unwrap_or(DEFAULT_QUERY_LIMIT),
        })
    }
}
