//! In-memory scheduling service.
//!
//! A complete, process-local implementation of the service traits. It backs
//! the facade's test suite and doubles as a reference for what a real
//! backend must observe: registration replaces, removal is by name, and a
//! started job immediately reports [`RunState::Running`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::{JobDefinition, JobFolder, JobHandle, JobService, RunState, ServiceError};

#[derive(Debug, Clone)]
struct StoredJob {
    definition: JobDefinition,
    state: RunState,
    last_parameters: Vec<String>,
}

#[derive(Debug, Default)]
struct Registry {
    jobs: BTreeMap<String, StoredJob>,
}

/// An in-memory scheduling service.
///
/// Cloning yields another connection to the same registry, the way two
/// sessions against one OS scheduler see the same jobs.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobService {
    registry: Arc<Mutex<Registry>>,
}

impl MemoryJobService {
    /// Create an empty service.
    pub fn new() -> MemoryJobService {
        MemoryJobService::default()
    }

    /// The current run state of a named job, if registered.
    pub fn run_state(&self, name: &str) -> Option<RunState> {
        let registry = self.registry.lock().ok()?;
        registry.jobs.get(name).map(|job| job.state)
    }

    /// The parameters passed to the most recent start of a named job.
    pub fn last_parameters(&self, name: &str) -> Option<Vec<String>> {
        let registry = self.registry.lock().ok()?;
        registry.jobs.get(name).map(|job| job.last_parameters.clone())
    }
}

impl JobService for MemoryJobService {
    fn open(&self) -> Result<Box<dyn JobFolder>, ServiceError> {
        Ok(Box::new(MemoryFolder {
            registry: Arc::clone(&self.registry),
        }))
    }
}

fn lock(registry: &Mutex<Registry>) -> Result<MutexGuard<'_, Registry>, ServiceError> {
    registry
        .lock()
        .map_err(|_| ServiceError::Unavailable("job registry lock poisoned".to_string()))
}

/// Scoped view over the shared registry.
struct MemoryFolder {
    registry: Arc<Mutex<Registry>>,
}

impl JobFolder for MemoryFolder {
    fn jobs(&self) -> Result<Vec<Box<dyn JobHandle>>, ServiceError> {
        let registry = lock(&self.registry)?;
        Ok(registry
            .jobs
            .keys()
            .map(|name| {
                Box::new(MemoryJob::new(name, Arc::clone(&self.registry))) as Box<dyn JobHandle>
            })
            .collect())
    }

    fn register(
        &mut self,
        name: &str,
        definition: &JobDefinition,
    ) -> Result<Box<dyn JobHandle>, ServiceError> {
        definition.validate(true)?;

        let mut registry = lock(&self.registry)?;
        let replaced = registry
            .jobs
            .insert(
                name.to_string(),
                StoredJob {
                    definition: definition.clone(),
                    state: RunState::Ready,
                    last_parameters: Vec::new(),
                },
            )
            .is_some();
        info!(name, replaced, "registered job");

        Ok(Box::new(MemoryJob::new(name, Arc::clone(&self.registry))))
    }

    fn remove(&mut self, name: &str) -> Result<(), ServiceError> {
        let mut registry = lock(&self.registry)?;
        if registry.jobs.remove(name).is_none() {
            return Err(ServiceError::NotFound(name.to_string()));
        }
        info!(name, "removed job");
        Ok(())
    }
}

/// Handle to a job in the shared registry.
struct MemoryJob {
    name: String,
    path: String,
    registry: Arc<Mutex<Registry>>,
}

impl MemoryJob {
    fn new(name: &str, registry: Arc<Mutex<Registry>>) -> MemoryJob {
        MemoryJob {
            name: name.to_string(),
            path: format!("/{name}"),
            registry,
        }
    }
}

impl JobHandle for MemoryJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn definition(&self) -> Result<JobDefinition, ServiceError> {
        let registry = lock(&self.registry)?;
        registry
            .jobs
            .get(&self.name)
            .map(|job| job.definition.clone())
            .ok_or_else(|| ServiceError::NotFound(self.name.clone()))
    }

    fn start(&self, parameters: &[String]) -> Result<RunState, ServiceError> {
        let mut registry = lock(&self.registry)?;
        let job = registry
            .jobs
            .get_mut(&self.name)
            .ok_or_else(|| ServiceError::NotFound(self.name.clone()))?;

        if job.state == RunState::Disabled {
            return Ok(RunState::Disabled);
        }
        job.state = RunState::Running;
        job.last_parameters = parameters.to_vec();
        debug!(name = %self.name, "started job");
        Ok(RunState::Running)
    }

    fn stop(&self) -> Result<(), ServiceError> {
        let mut registry = lock(&self.registry)?;
        let job = registry
            .jobs
            .get_mut(&self.name)
            .ok_or_else(|| ServiceError::NotFound(self.name.clone()))?;

        job.state = RunState::Ready;
        debug!(name = %self.name, "stopped job");
        Ok(())
    }

    fn service(&self) -> Box<dyn JobService> {
        Box::new(MemoryJobService {
            registry: Arc::clone(&self.registry),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, Trigger};

    fn definition() -> JobDefinition {
        JobDefinition {
            description: None,
            actions: vec![Action::exec("job.exe", None, None)],
            triggers: vec![Trigger::daily(1)],
        }
    }

    #[test]
    fn test_register_and_enumerate() {
        let service = MemoryJobService::new();
        let mut folder = service.open().unwrap();
        folder.register("alpha", &definition()).unwrap();
        folder.register("beta", &definition()).unwrap();

        let names: Vec<String> = folder
            .jobs()
            .unwrap()
            .iter()
            .map(|j| j.name().to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_register_rejects_invalid_definition() {
        let service = MemoryJobService::new();
        let mut folder = service.open().unwrap();
        let err = folder.register("empty", &JobDefinition::new()).err().unwrap();
        assert!(matches!(err, ServiceError::InvalidDefinition(_)));
        assert!(folder.jobs().unwrap().is_empty());
    }

    #[test]
    fn test_register_replaces_existing() {
        let service = MemoryJobService::new();
        let mut folder = service.open().unwrap();
        folder.register("job", &definition()).unwrap();

        let mut updated = definition();
        updated.description = Some("second".to_string());
        let handle = folder.register("job", &updated).unwrap();

        assert_eq!(handle.definition().unwrap().description.as_deref(), Some("second"));
        assert_eq!(folder.jobs().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_unknown_is_not_found() {
        let service = MemoryJobService::new();
        let mut folder = service.open().unwrap();
        assert!(matches!(
            folder.remove("ghost"),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_start_and_stop_change_run_state() {
        let service = MemoryJobService::new();
        let mut folder = service.open().unwrap();
        let handle = folder.register("job", &definition()).unwrap();

        assert_eq!(service.run_state("job"), Some(RunState::Ready));

        let state = handle.start(&["--fast".to_string()]).unwrap();
        assert_eq!(state, RunState::Running);
        assert_eq!(service.run_state("job"), Some(RunState::Running));
        assert_eq!(
            service.last_parameters("job"),
            Some(vec!["--fast".to_string()])
        );

        handle.stop().unwrap();
        assert_eq!(service.run_state("job"), Some(RunState::Ready));
    }

    #[test]
    fn test_handle_outlives_removal() {
        let service = MemoryJobService::new();
        let mut folder = service.open().unwrap();
        let handle = folder.register("job", &definition()).unwrap();
        folder.remove("job").unwrap();

        assert!(matches!(
            handle.start(&[]),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(handle.stop(), Err(ServiceError::NotFound(_))));
        assert!(matches!(
            handle.definition(),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_derived_service_shares_registry() {
        let service = MemoryJobService::new();
        let mut folder = service.open().unwrap();
        let handle = folder.register("job", &definition()).unwrap();
        drop(folder);

        let derived = handle.service();
        let derived_folder = derived.open().unwrap();
        assert_eq!(derived_folder.jobs().unwrap().len(), 1);
    }
}
