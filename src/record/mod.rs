//! Persisted records, casts, and the storage collaborator contract.
//!
//! A record written under a type carries the name of that type and every
//! ancestor as structural labels. Those labels are the single source of
//! truth for re-typing: [`RecordView::downcast`] and [`RecordView::upcast`]
//! only change which type's surface a record is presented under, never the
//! labels themselves, so concurrent casts on different views of the same
//! record need no coordination.

pub mod cast;
pub mod store;

pub use cast::{CastError, RecordView};
pub use store::{GraphStore, MemoryGraph, StoreError};
