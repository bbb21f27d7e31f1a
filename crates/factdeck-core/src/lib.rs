//! factdeck core - attributable fact-card store
//!
//! This crate provides the correctness-critical kernel of the fact-card
//! knowledge base:
//! - Card model with provenance, confidence, and lifecycle status
//! - `CardRepository`: primary map plus derived status and person/fact
//!   indices, kept consistent under a per-instance reentrant lock
//! - Optimistic versioning that detects and rejects lost updates
//! - Transaction frames with snapshot-based rollback
//! - The write-operation engine (`apply_write_op`) with all-or-nothing
//!   semantics over multi-step intents
//! - Read-side query projections for the agent/tool layer

pub mod apply;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod queries;
pub mod repo;

// Re-export commonly used types
pub use apply::apply_write_op;
pub use errors::{CardStoreError, Result};
pub use model::{
    Card, CardQuery, CardRef, CardStatus, CardView, DeleteRequest, DeleteResult, GetCardsRequest,
    SourceRef, StoreStats, TimeWindow, TurnRange, WriteOp, WriteOpKind, WriteResult,
};
pub use repo::CardRepository;
