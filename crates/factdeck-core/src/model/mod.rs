//! Data model for the card store
//!
//! Value objects only: the stored `Card` entity, the `WriteOp` intent and
//! its `WriteResult`, query/delete request shapes, and the read-side
//! `CardView` projection. All mutation semantics live in `repo` and `apply`.

pub mod card;
pub mod query;
pub mod view;
pub mod write_op;

pub use card::{Card, CardStatus, SourceRef, TurnRange};
pub use query::{
    CardQuery, CardRef, DeleteRequest, DeleteResult, GetCardsRequest, StoreStats, TimeWindow,
    DEFAULT_QUERY_LIMIT,
};
pub use view::CardView;
pub use write_op::{WriteOp, WriteOpKind, WriteResult};
