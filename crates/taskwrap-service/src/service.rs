//! Object-safe traits describing a scheduling service.
//!
//! A [`JobService`] is a connection to the service. Opening it yields a
//! [`JobFolder`], a scoped view of the service's container of named jobs;
//! the view is released when the box is dropped. Registering or finding a
//! job yields a [`JobHandle`], a reference to the externally persisted job.

use crate::{JobDefinition, RunState, ServiceError};

/// A connection to a scheduling service.
pub trait JobService: Send {
    /// Acquire a scoped view of the service's job container.
    ///
    /// The view is released on drop, on every exit path.
    fn open(&self) -> Result<Box<dyn JobFolder>, ServiceError>;
}

/// A scoped view of the service's container of named jobs.
pub trait JobFolder {
    /// Enumerate every registered job.
    fn jobs(&self) -> Result<Vec<Box<dyn JobHandle>>, ServiceError>;

    /// Register `definition` under `name`, replacing any existing job.
    ///
    /// Fails with [`ServiceError::InvalidDefinition`] when the definition
    /// does not pass the service's structural validation.
    fn register(
        &mut self,
        name: &str,
        definition: &JobDefinition,
    ) -> Result<Box<dyn JobHandle>, ServiceError>;

    /// Remove the job registered under `name`, with all of its
    /// scheduling metadata.
    fn remove(&mut self, name: &str) -> Result<(), ServiceError>;
}

/// A reference to a job persisted by the service.
pub trait JobHandle: Send {
    /// The job's name.
    fn name(&self) -> &str;

    /// The job's fully-qualified path within the service.
    fn path(&self) -> &str;

    /// The job's committed definition.
    fn definition(&self) -> Result<JobDefinition, ServiceError>;

    /// Request a start with the given parameters, reporting the immediate
    /// run state.
    fn start(&self, parameters: &[String]) -> Result<RunState, ServiceError>;

    /// Request a stop of the job's running instances.
    fn stop(&self) -> Result<(), ServiceError>;

    /// The connection this handle originated from.
    fn service(&self) -> Box<dyn JobService>;
}
