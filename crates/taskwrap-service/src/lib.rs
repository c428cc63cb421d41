//! Scheduling-service boundary for taskwrap.
//!
//! This crate models the external, OS-level job scheduler as a small set of
//! object-safe traits plus the value objects the service accepts:
//!
//! - **Traits**: [`JobService`] (a connection), [`JobFolder`] (a scoped view
//!   of the named-job container), [`JobHandle`] (a persisted job)
//! - **Values**: [`JobDefinition`] drafts with [`Action`]s and [`Trigger`]s
//! - **Memory backend**: [`MemoryJobService`], a complete in-process
//!   implementation used as the reference backend and in tests

mod definition;
mod error;
mod memory;
mod service;

pub use definition::{Action, JobDefinition, Months, RunState, Trigger};
pub use error::ServiceError;
pub use memory::MemoryJobService;
pub use service::{JobFolder, JobHandle, JobService};
