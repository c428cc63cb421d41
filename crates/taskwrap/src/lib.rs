//! Lifecycle-managed facade over a named scheduled job.
//!
//! This crate provides [`ScheduledTask`], a facade over one persistent,
//! named job owned by an external scheduling service:
//! - Find-or-create by name, or wrap an already-resolved job handle
//! - Mutate the definition through a fluent builder
//! - Commit the definition with [`ScheduledTask::update`]
//! - Start, stop, and delete the registered job best-effort
//! - Release every held resource exactly once via
//!   [`ScheduledTask::dispose`] (also on drop)
//!
//! The service itself lives behind the traits in [`taskwrap_service`].

mod error;
mod task;

pub use error::TaskError;
pub use task::ScheduledTask;
