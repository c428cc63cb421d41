//! The scheduled-task facade.

use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::{debug, info, warn};

use taskwrap_service::{
    Action, JobDefinition, JobHandle, JobService, Months, RunState, ServiceError, Trigger,
};

use crate::TaskError;

/// A lifecycle-managed facade over one named job in a scheduling service.
///
/// A facade owns three resources: its connection to the service, a mutable
/// draft of the job's definition, and (once found or committed) a handle to
/// the registered job. [`dispose`](ScheduledTask::dispose) releases all
/// three exactly once; it also runs on drop. After disposal the instance is
/// permanently inert: builder calls and [`update`](ScheduledTask::update)
/// fail with [`TaskError::Disposed`], while the best-effort operations
/// report `false` without touching the service.
///
/// Builder methods return `Result<&mut Self, _>` so definitions compose
/// fluently:
///
/// ```
/// use taskwrap::ScheduledTask;
/// use taskwrap_service::MemoryJobService;
///
/// # fn main() -> Result<(), taskwrap::TaskError> {
/// let service = MemoryJobService::new();
/// let mut task = ScheduledTask::with_create(Box::new(service), "nightly-backup")?;
/// task.description("Nightly backup")?
///     .exec_action("backup.exe", Some("--full"), None)?
///     .daily_trigger(1)?
///     .update()?;
/// # Ok(())
/// # }
/// ```
pub struct ScheduledTask {
    name: String,
    service: Option<Box<dyn JobService>>,
    draft: Option<JobDefinition>,
    bound: Option<Box<dyn JobHandle>>,
    disposed: bool,
}

impl ScheduledTask {
    /// Open the task registered under `name`.
    ///
    /// The name is matched exactly and case-sensitively against the
    /// service's job container. Fails with [`TaskError::NotFound`] when no
    /// such job exists; service failures during the lookup propagate.
    pub fn open(service: Box<dyn JobService>, name: &str) -> Result<ScheduledTask, TaskError> {
        if name.is_empty() {
            return Err(TaskError::InvalidName);
        }
        match Self::find(service.as_ref(), name)? {
            Some((job, definition)) => Ok(ScheduledTask {
                name: name.to_string(),
                service: Some(service),
                draft: Some(definition),
                bound: Some(job),
                disposed: false,
            }),
            None => Err(TaskError::NotFound(name.to_string())),
        }
    }

    /// Look up the task registered under `name`, resolving every failure
    /// (including absence) to `None`.
    ///
    /// This is the boolean-style existence query: it never propagates an
    /// error. Use [`open`](ScheduledTask::open) when the cause matters.
    pub fn get(service: Box<dyn JobService>, name: &str) -> Option<ScheduledTask> {
        match Self::open(service, name) {
            Ok(task) => Some(task),
            Err(error) => {
                debug!(name, %error, "lookup resolved to absent");
                None
            }
        }
    }

    /// Open the task registered under `name`, or start a fresh,
    /// unregistered draft bound to that name when it does not exist.
    ///
    /// Never fails for a non-empty name: lookup failures degrade to the
    /// fresh-draft path.
    pub fn with_create(
        service: Box<dyn JobService>,
        name: &str,
    ) -> Result<ScheduledTask, TaskError> {
        if name.is_empty() {
            return Err(TaskError::InvalidName);
        }
        let (draft, bound) = match Self::find(service.as_ref(), name) {
            Ok(Some((job, definition))) => (definition, Some(job)),
            Ok(None) => (JobDefinition::new(), None),
            Err(error) => {
                warn!(name, %error, "lookup failed, starting from a fresh draft");
                (JobDefinition::new(), None)
            }
        };
        Ok(ScheduledTask {
            name: name.to_string(),
            service: Some(service),
            draft: Some(draft),
            bound,
            disposed: false,
        })
    }

    /// Wrap an already-resolved job handle.
    ///
    /// The facade takes over the handle's originating connection and loads
    /// its committed definition as the draft.
    pub fn from_job(job: Box<dyn JobHandle>) -> Result<ScheduledTask, TaskError> {
        let name = job.name().to_string();
        if name.is_empty() {
            return Err(TaskError::InvalidName);
        }
        let definition = job.definition()?;
        let service = job.service();
        Ok(ScheduledTask {
            name,
            service: Some(service),
            draft: Some(definition),
            bound: Some(job),
            disposed: false,
        })
    }

    /// Find `name` in the service's job container, loading its definition.
    ///
    /// The folder view is scoped to this call and released on every path.
    fn find(
        service: &dyn JobService,
        name: &str,
    ) -> Result<Option<(Box<dyn JobHandle>, JobDefinition)>, ServiceError> {
        let folder = service.open()?;
        let job = folder.jobs()?.into_iter().find(|job| job.name() == name);
        drop(folder);

        match job {
            Some(job) => {
                let definition = job.definition()?;
                Ok(Some((job, definition)))
            }
            None => Ok(None),
        }
    }

    /// The task's name. Immutable for the instance's whole lifetime.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this instance has not been disposed.
    pub fn is_live(&self) -> bool {
        !self.disposed
    }

    /// Whether a registered job is currently bound to this facade.
    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// The bound job handle, if the task has been found or committed.
    pub fn job(&self) -> Option<&dyn JobHandle> {
        self.bound.as_deref()
    }

    /// The current draft definition, absent only after disposal.
    pub fn definition(&self) -> Option<&JobDefinition> {
        self.draft.as_ref()
    }

    fn draft_mut(&mut self) -> Result<&mut JobDefinition, TaskError> {
        self.draft
            .as_mut()
            .ok_or_else(|| TaskError::Disposed(self.name.clone()))
    }

    /// Set or replace the draft's description text.
    pub fn description(&mut self, text: impl Into<String>) -> Result<&mut Self, TaskError> {
        self.draft_mut()?.description = Some(text.into());
        Ok(self)
    }

    /// Remove every action from the draft.
    pub fn clear_actions(&mut self) -> Result<&mut Self, TaskError> {
        self.draft_mut()?.actions.clear();
        Ok(self)
    }

    /// Append one action to the draft.
    pub fn action(&mut self, action: Action) -> Result<&mut Self, TaskError> {
        self.draft_mut()?.actions.push(action);
        Ok(self)
    }

    /// Append a sequence of actions, preserving order.
    pub fn actions(
        &mut self,
        actions: impl IntoIterator<Item = Action>,
    ) -> Result<&mut Self, TaskError> {
        self.draft_mut()?.actions.extend(actions);
        Ok(self)
    }

    /// Append an executable action.
    pub fn exec_action(
        &mut self,
        path: impl Into<String>,
        arguments: Option<&str>,
        working_directory: Option<&str>,
    ) -> Result<&mut Self, TaskError> {
        self.action(Action::exec(path, arguments, working_directory))
    }

    /// Remove every trigger from the draft.
    pub fn clear_triggers(&mut self) -> Result<&mut Self, TaskError> {
        self.draft_mut()?.triggers.clear();
        Ok(self)
    }

    /// Append one trigger to the draft.
    pub fn trigger(&mut self, trigger: Trigger) -> Result<&mut Self, TaskError> {
        self.draft_mut()?.triggers.push(trigger);
        Ok(self)
    }

    /// Append a sequence of triggers, preserving order.
    pub fn triggers(
        &mut self,
        triggers: impl IntoIterator<Item = Trigger>,
    ) -> Result<&mut Self, TaskError> {
        self.draft_mut()?.triggers.extend(triggers);
        Ok(self)
    }

    /// Append a one-shot trigger firing at `at`.
    pub fn time_trigger(&mut self, at: chrono::DateTime<chrono::Utc>) -> Result<&mut Self, TaskError> {
        self.trigger(Trigger::at(at))
    }

    /// Append a recurring trigger firing every `days_interval` days.
    pub fn daily_trigger(&mut self, days_interval: u16) -> Result<&mut Self, TaskError> {
        self.trigger(Trigger::daily(days_interval))
    }

    /// Append a monthly trigger on a single day of the month.
    ///
    /// The day and mask are not range-checked here; validation happens at
    /// [`update`](ScheduledTask::update).
    pub fn monthly_trigger(
        &mut self,
        day_of_month: u8,
        months: Months,
    ) -> Result<&mut Self, TaskError> {
        self.trigger(Trigger::monthly(day_of_month, months))
    }

    /// Append a monthly trigger on an explicit set of days. An empty set
    /// defaults to `{1}`.
    pub fn monthly_triggers(
        &mut self,
        days_of_month: &[u8],
        months: Months,
    ) -> Result<&mut Self, TaskError> {
        self.trigger(Trigger::monthly_days(days_of_month, months))
    }

    /// Validate the draft and register it under this task's name,
    /// replacing whatever the service currently holds there.
    ///
    /// On success the facade is bound to the newly registered job.
    /// Validation and registration failures surface as
    /// [`TaskError::Registration`]; they are never swallowed.
    pub fn update(&mut self) -> Result<&mut Self, TaskError> {
        let registration = |source: ServiceError| TaskError::Registration {
            name: self.name.clone(),
            source,
        };

        let draft = self
            .draft
            .as_ref()
            .ok_or_else(|| TaskError::Disposed(self.name.clone()))?;
        draft.validate(true).map_err(registration)?;

        let service = self
            .service
            .as_ref()
            .ok_or_else(|| TaskError::Disposed(self.name.clone()))?;
        let job = service
            .open()
            .and_then(|mut folder| folder.register(&self.name, draft))
            .map_err(registration)?;

        info!(name = %self.name, "registered task");
        self.bound = Some(job);
        Ok(self)
    }

    /// Request a start of the bound job with the given parameters.
    ///
    /// Returns `true` only when the immediate run state is running or
    /// queued. Disposed, unbound, and service failures all report `false`;
    /// this operation never propagates an error.
    pub fn run(&self, parameters: &[&str]) -> bool {
        let Some(job) = self.bound.as_deref() else {
            debug!(name = %self.name, "run requested with no bound job");
            return false;
        };
        let parameters: Vec<String> = parameters.iter().map(|p| p.to_string()).collect();
        match job.start(&parameters) {
            Ok(state) => matches!(state, RunState::Running | RunState::Queued),
            Err(error) => {
                warn!(name = %self.name, %error, "run request failed");
                false
            }
        }
    }

    /// Request a stop of the bound job. Best-effort, like
    /// [`run`](ScheduledTask::run).
    pub fn stop(&self) -> bool {
        let Some(job) = self.bound.as_deref() else {
            debug!(name = %self.name, "stop requested with no bound job");
            return false;
        };
        match job.stop() {
            Ok(()) => true,
            Err(error) => {
                warn!(name = %self.name, %error, "stop request failed");
                false
            }
        }
    }

    /// Stop the job best-effort, then remove it and all of its scheduling
    /// metadata from the service.
    ///
    /// Returns `true` only when removal succeeded; every failure, including
    /// "not found", reports `false`. When `dispose` is set, disposal runs
    /// afterwards whether or not removal succeeded: deletion and disposal
    /// are independent axes.
    pub fn delete(&mut self, dispose: bool) -> bool {
        if self.disposed {
            return false;
        }
        self.stop();

        let removed = match self.service.as_ref() {
            Some(service) => match service
                .open()
                .and_then(|mut folder| folder.remove(&self.name))
            {
                Ok(()) => {
                    info!(name = %self.name, "deleted task");
                    true
                }
                Err(error) => {
                    warn!(name = %self.name, %error, "delete failed");
                    false
                }
            },
            None => false,
        };

        if removed {
            self.bound = None;
        }
        if dispose {
            self.dispose();
        }
        removed
    }

    /// Release the draft, the bound job handle, and the service connection,
    /// in that order, and mark the instance disposed.
    ///
    /// Idempotent: the second and later calls are no-ops. Also invoked on
    /// drop, so every exit path releases the same resources exactly once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.draft.take();
        self.bound.take();
        self.service.take();
        self.disposed = true;
        debug!(name = %self.name, "disposed task");
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Equality over backing-job identity.
///
/// Two facades are equal when they are the same instance, or when both are
/// bound and their jobs' fully-qualified paths match exactly. An unbound
/// facade is never equal to a distinct instance.
impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        match (self.bound.as_deref(), other.bound.as_deref()) {
            (Some(a), Some(b)) => a.path() == b.path(),
            _ => false,
        }
    }
}

impl Eq for ScheduledTask {}

/// Hash over the draft definition's serialized form, or the constant 0
/// once the draft is gone.
///
/// Caveat: equality compares bound-job paths, so two *equal* facades whose
/// drafts have diverged hash differently. Hash-keyed containers are only
/// safe while no key has been mutated or disposed. This instability is
/// deliberate, preserved behavior.
impl Hash for ScheduledTask {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self
            .draft
            .as_ref()
            .and_then(|draft| serde_json::to_string(draft).ok())
        {
            Some(text) => text.hash(state),
            None => 0u64.hash(state),
        }
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("name", &self.name)
            .field("bound", &self.bound.as_deref().map(|job| job.path()))
            .field("disposed", &self.disposed)
            .finish()
    }
}
