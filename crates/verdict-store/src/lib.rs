//! Storage ports for the Verdict decision engine.
//!
//! The engine consumes persistence through narrow async traits so the
//! backing document service is swappable. The in-memory adapter here is
//! deterministic and test-friendly; production deployments are expected to
//! provide an adapter over their document store.

#![deny(unsafe_code)]

pub mod error;
pub mod memory;
pub mod model;
pub mod retry;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStore;
pub use model::{AdminAction, AdminAuditEvent, BoundaryEvent, ViolationFilter};
pub use retry::retry_with_backoff;
pub use traits::{
    AuditEventStore, BoundaryStore, BudgetStore, DecisionStore, ExplanationStore, OperationStore,
    VerdictStore, ViolationStore,
};
