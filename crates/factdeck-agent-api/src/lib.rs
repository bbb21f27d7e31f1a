//! factdeck agent API - JSON tool surface
//!
//! String-in/string-out functions for the agent loop's tool wrappers.
//! Every function takes request JSON, drives the service facade, and
//! returns response JSON; expected failures come back inside the response
//! body, never as a panic or `Err`.

pub mod requests;

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use factdeck_core::{CardRef, DeleteRequest, GetCardsRequest, WriteResult};
use factdeck_service::CardService;

pub use requests::{parse_action, CardPayload, QueryRequest, TimeWindowPayload, WriteRequest};

/// Write-tool response body
#[derive(Debug, Serialize)]
struct ToolWriteResponse {
    success: bool,
    upserted_ids: Vec<String>,
    updated_ids: Vec<String>,
    superseded_ids: Vec<String>,
    deleted_ids: Vec<String>,
    errors: Vec<String>,
}

impl ToolWriteResponse {
    fn failure(errors: Vec<String>) -> Self {
        Self {
            success: false,
            upserted_ids: Vec::new(),
            updated_ids: Vec::new(),
            superseded_ids: Vec::new(),
            deleted_ids: Vec::new(),
            errors,
        }
    }
}

impl From<WriteResult> for ToolWriteResponse {
    fn from(result: WriteResult) -> Self {
        Self {
            success: result.applied,
            upserted_ids: result.upserted_ids,
            updated_ids: result.updated_ids,
            superseded_ids: result.superseded_ids,
            deleted_ids: result.deleted_ids,
            errors: result.errors,
        }
    }
}

/// Generic failure body for read tools
#[derive(Debug, Serialize)]
struct ToolErrorResponse {
    errors: Vec<String>,
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|err| format!("{{\"errors\":[\"serialization failure: {}\"]}}", err))
}

fn error_json(message: String) -> String {
    to_json(&ToolErrorResponse {
        errors: vec![message],
    })
}

/// The tool surface handed to the agent loop
///
/// Each method corresponds to one registered tool.
#[derive(Debug)]
pub struct CardToolbox {
    service: Arc<CardService>,
}

impl CardToolbox {
    pub fn new(service: Arc<CardService>) -> Self {
        Self { service }
    }

    /// The wrapped service
    pub fn service(&self) -> &Arc<CardService> {
        &self.service
    }

    /// Write tool: apply one card write op described by `request_json`
    ///
    /// The request carries an action string ("add" | "correct" |
    /// "supersede" | "deactivate" | "link"), the card payload, an optional
    /// target id, the optional version tokens, and an optional idempotency
    /// key. Unknown actions and malformed JSON come back as a failure body.
    pub fn update_card_database(&self, request_json: &str) -> String {
        let request: WriteRequest = match serde_json::from_str(request_json) {
            Ok(request) => request,
            Err(err) => {
                return to_json(&ToolWriteResponse::failure(vec![format!(
                    "invalid write request: {}",
                    err
                )]))
            }
        };

        let (op, idempotency_key) = match request.into_write_op() {
            Ok(resolved) => resolved,
            Err(err) => return to_json(&ToolWriteResponse::failure(vec![err.to_string()])),
        };

        debug!(kind = %op.kind, "write tool invoked");
        let result = self
            .service
            .apply_card_write_ops(&op, idempotency_key.as_deref());
        to_json(&ToolWriteResponse::from(result))
    }

    /// Read tool: filtered card views for one person
    pub fn query_relevant_cards(&self, request_json: &str) -> String {
        let request: QueryRequest = match serde_json::from_str(request_json) {
            Ok(request) => request,
            Err(err) => return error_json(format!("invalid query request: {}", err)),
        };
        let query = match request.into_query() {
            Ok(query) => query,
            Err(err) => return error_json(err.to_string()),
        };
        to_json(&self.service.query_relevant_cards(&query))
    }

    /// Read tool: serialized card listing for the retrieval layer
    pub fn get_cards_as_string(&self, request_json: &str) -> String {
        let request: GetCardsRequest = match serde_json::from_str(request_json) {
            Ok(request) => request,
            Err(err) => return error_json(format!("invalid cards request: {}", err)),
        };
        match self.service.get_cards_as_string(&request) {
            Ok(json) => json,
            Err(err) => error_json(err.to_string()),
        }
    }

    /// Read tool: the freshest belief for (person, fact_key), or JSON null
    pub fn get_latest_by_fact_key(&self, person: &str, fact_key: &str) -> String {
        to_json(&self.service.get_latest_by_fact_key(person, fact_key))
    }

    /// Read tool: resolve card refs to views
    pub fn read_cards_by_refs(&self, refs_json: &str) -> String {
        let refs: Vec<CardRef> = match serde_json::from_str(refs_json) {
            Ok(refs) => refs,
            Err(err) => return error_json(format!("invalid refs: {}", err)),
        };
        to_json(&self.service.read_cards_by_refs(&refs))
    }

    /// Delete tool: soft-delete by ids or by conversation source
    pub fn logical_delete_cards(&self, request_json: &str) -> String {
        let request: DeleteRequest = match serde_json::from_str(request_json) {
            Ok(request) => request,
            Err(err) => return error_json(format!("invalid delete request: {}", err)),
        };
        to_json(&self.service.logical_delete_cards(&request))
    }

    /// Stats tool: per-status counts over the store
    pub fn get_stats(&self) -> String {
        to_json(&self.service.get_stats())
    }
}
