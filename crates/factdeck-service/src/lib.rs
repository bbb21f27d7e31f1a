//! factdeck service - facade for the agent/tool layer
//!
//! Wraps one `CardRepository` with the idempotency ledger and exposes the
//! write, query, delete, and stats interfaces the agent loop consumes.

pub mod idempotency;
pub mod service;

pub use idempotency::IdempotencyLedger;
pub use service::CardService;
