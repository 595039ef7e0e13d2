//! Optimistic entity boards.
//!
//! Each board holds the local snapshot a view renders from. A mutation goes
//! through three steps: apply the optimistic value to the snapshot, issue
//! the backend call, then either swap in the server's entity or log the
//! failure and leave the optimistic value standing. There is no rollback
//! transition. Every attempted mutation emits on the shared
//! [`TaskChangeBus`] so dependent views refetch.

use std::sync::RwLock;

use uuid::Uuid;

use farmstead_core::{
    combine_instant, CreateFieldRequest, CreateTaskRequest, Field, FieldStatus, Task,
    TaskCategory, TaskStatus, UpdateFieldRequest, UpdateTaskRequest,
};

use crate::bus::TaskChangeBus;
use crate::error::ClientError;
use crate::fields::FieldsApi;
use crate::tasks::TasksApi;

/// Whether the backend confirmed a mutation. The optimistic value stays in
/// local state either way; `Unconfirmed` just makes the divergence visible
/// to call sites that care.
#[derive(Debug)]
pub enum MutationOutcome<T> {
    Confirmed(T),
    Unconfirmed { value: T, error: ClientError },
}

impl<T> MutationOutcome<T> {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, MutationOutcome::Confirmed(_))
    }

    pub fn value(&self) -> &T {
        match self {
            MutationOutcome::Confirmed(value) => value,
            MutationOutcome::Unconfirmed { value, .. } => value,
        }
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

pub struct FieldBoard {
    api: FieldsApi,
    tasks_api: TasksApi,
    bus: TaskChangeBus,
    state: RwLock<Vec<Field>>,
}

impl FieldBoard {
    pub fn new(api: FieldsApi, tasks_api: TasksApi, bus: TaskChangeBus) -> Self {
        Self {
            api,
            tasks_api,
            bus,
            state: RwLock::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> Vec<Field> {
        self.state.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// Replace the snapshot with backend truth.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let fields = self.api.list().await?;
        if let Ok(mut state) = self.state.write() {
            *state = fields;
        }
        Ok(())
    }

    pub async fn create(
        &self,
        name: &str,
        area: f64,
        crop: Option<&str>,
    ) -> MutationOutcome<Field> {
        let local = Field {
            id: format!("pending-{}", Uuid::new_v4()),
            user_id: String::new(),
            name: name.to_string(),
            area,
            crop: crop.unwrap_or("None").to_string(),
            status: FieldStatus::default(),
            last_activity: None,
        };
        if let Ok(mut state) = self.state.write() {
            state.push(local.clone());
        }

        let request = CreateFieldRequest {
            name: Some(name.to_string()),
            area: Some(area),
            crop: crop.map(str::to_string),
        };
        let outcome = match self.api.create(request).await {
            Ok(server) => {
                self.replace(&local.id, server.clone());
                MutationOutcome::Confirmed(server)
            }
            Err(error) => {
                log::warn!("field create not confirmed by backend: {error}");
                MutationOutcome::Unconfirmed {
                    value: local,
                    error,
                }
            }
        };
        self.bus.emit();
        outcome
    }

    pub async fn set_status(
        &self,
        field_id: &str,
        status: FieldStatus,
    ) -> Result<MutationOutcome<Field>, ClientError> {
        let local = {
            let mut state = self
                .state
                .write()
                .map_err(|_| ClientError::Invalid("board state poisoned".to_string()))?;
            let field = state
                .iter_mut()
                .find(|f| f.id == field_id)
                .ok_or_else(|| ClientError::Invalid(format!("unknown field {field_id}")))?;
            field.status = status;
            field.clone()
        };

        let outcome = match self.api.update_status(field_id, status).await {
            Ok(server) => {
                self.replace(field_id, server.clone());
                MutationOutcome::Confirmed(server)
            }
            Err(error) => {
                log::warn!("field status change not confirmed by backend: {error}");
                MutationOutcome::Unconfirmed {
                    value: local,
                    error,
                }
            }
        };
        self.bus.emit();
        Ok(outcome)
    }

    /// Partial update, rename included. Task views key off the field name,
    /// so the attempt emits like every other mutation.
    pub async fn update(
        &self,
        req: UpdateFieldRequest,
    ) -> Result<MutationOutcome<Field>, ClientError> {
        let local = {
            let mut state = self
                .state
                .write()
                .map_err(|_| ClientError::Invalid("board state poisoned".to_string()))?;
            let field = state
                .iter_mut()
                .find(|f| f.id == req.field_id)
                .ok_or_else(|| ClientError::Invalid(format!("unknown field {}", req.field_id)))?;
            merge_field(field, &req)?;
            field.clone()
        };

        let outcome = match self.api.update(req).await {
            Ok(server) => {
                self.replace(&local.id, server.clone());
                MutationOutcome::Confirmed(server)
            }
            Err(error) => {
                log::warn!("field update not confirmed by backend: {error}");
                MutationOutcome::Unconfirmed {
                    value: local,
                    error,
                }
            }
        };
        self.bus.emit();
        Ok(outcome)
    }

    /// Delete a field. Dependent tasks are checked first, before any local
    /// state moves: a blocked delete is a structural failure the caller
    /// shows in a dialog, not something to apply optimistically.
    pub async fn remove(&self, field_id: &str) -> Result<MutationOutcome<String>, ClientError> {
        let blocking = self.tasks_api.list_by_field(field_id).await?;
        if !blocking.is_empty() {
            return Err(ClientError::DependentTasks { tasks: blocking });
        }

        if let Ok(mut state) = self.state.write() {
            state.retain(|f| f.id != field_id);
        }

        let outcome = match self.api.delete(field_id).await {
            Ok(_) => MutationOutcome::Confirmed(field_id.to_string()),
            Err(error) => {
                log::warn!("field delete not confirmed by backend: {error}");
                MutationOutcome::Unconfirmed {
                    value: field_id.to_string(),
                    error,
                }
            }
        };
        self.bus.emit();
        Ok(outcome)
    }

    /// Bulk delete. The snapshot empties optimistically; fields the backend
    /// refused to drop come back in the response and are restored.
    pub async fn remove_all(&self) -> MutationOutcome<()> {
        if let Ok(mut state) = self.state.write() {
            state.clear();
        }

        let outcome = match self.api.delete_all().await {
            Ok(response) => {
                if let Ok(mut state) = self.state.write() {
                    *state = response.skipped.into_iter().map(|s| s.field).collect();
                }
                MutationOutcome::Confirmed(())
            }
            Err(error) => {
                log::warn!("bulk field delete not confirmed by backend: {error}");
                MutationOutcome::Unconfirmed { value: (), error }
            }
        };
        self.bus.emit();
        outcome
    }

    fn replace(&self, id: &str, server: Field) {
        if let Ok(mut state) = self.state.write() {
            match state.iter_mut().find(|f| f.id == id) {
                Some(slot) => *slot = server,
                None => state.push(server),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

pub struct TaskBoard {
    api: TasksApi,
    bus: TaskChangeBus,
    state: RwLock<Vec<Task>>,
}

impl TaskBoard {
    pub fn new(api: TasksApi, bus: TaskChangeBus) -> Self {
        Self {
            api,
            bus,
            state: RwLock::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.state.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub async fn refresh(&self) -> Result<(), ClientError> {
        let tasks = self.api.list().await?;
        if let Ok(mut state) = self.state.write() {
            *state = tasks;
        }
        Ok(())
    }

    /// Create a task. The optimistic copy carries a pending id and an empty
    /// field id; the server resolves the field name and the confirmed task
    /// replaces the copy.
    pub async fn create(
        &self,
        req: CreateTaskRequest,
    ) -> Result<MutationOutcome<Task>, ClientError> {
        let title = required(req.title.as_deref(), "task title is required")?;
        required(req.field_name.as_deref(), "field name is required")?;
        let start_date = required(req.start_date.as_deref(), "start date is required")?;
        let due_date = required(req.due_date.as_deref(), "due date is required")?;

        let starts_at = combine_instant(&start_date, req.start_time.as_deref())
            .map_err(|e| ClientError::Invalid(e.to_string()))?;
        let due_at = combine_instant(&due_date, req.due_time.as_deref())
            .map_err(|e| ClientError::Invalid(e.to_string()))?;

        let local = Task {
            id: format!("pending-{}", Uuid::new_v4()),
            user_id: String::new(),
            field_id: String::new(),
            title,
            category: parse_or(req.category.as_deref(), TaskCategory::Monitoring),
            description: req.description.clone(),
            start_date,
            start_time: req.start_time.clone(),
            due_date,
            due_time: req.due_time.clone(),
            starts_at,
            due_at,
            priority: parse_or(req.priority.as_deref(), Default::default()),
            status: parse_or(req.status.as_deref(), Default::default()),
        };
        if let Ok(mut state) = self.state.write() {
            state.push(local.clone());
        }

        let outcome = match self.api.create(req).await {
            Ok(server) => {
                self.replace(&local.id, server.clone());
                MutationOutcome::Confirmed(server)
            }
            Err(error) => {
                log::warn!("task create not confirmed by backend: {error}");
                MutationOutcome::Unconfirmed {
                    value: local,
                    error,
                }
            }
        };
        self.bus.emit();
        Ok(outcome)
    }

    pub async fn set_status(
        &self,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<MutationOutcome<Task>, ClientError> {
        let local = {
            let mut state = self
                .state
                .write()
                .map_err(|_| ClientError::Invalid("board state poisoned".to_string()))?;
            let task = state
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or_else(|| ClientError::Invalid(format!("unknown task {task_id}")))?;
            task.status = status;
            task.clone()
        };

        let outcome = match self.api.update_status(task_id, status).await {
            Ok(server) => {
                self.replace(task_id, server.clone());
                MutationOutcome::Confirmed(server)
            }
            Err(error) => {
                log::warn!("task status change not confirmed by backend: {error}");
                MutationOutcome::Unconfirmed {
                    value: local,
                    error,
                }
            }
        };
        self.bus.emit();
        Ok(outcome)
    }

    /// Partial update. The optimistic merge mirrors the server: plain fields
    /// overwrite when present, instants recombine only when the matching
    /// date is supplied. A changed field name cannot be resolved locally;
    /// the confirmed task carries the new field id.
    pub async fn update(
        &self,
        req: UpdateTaskRequest,
    ) -> Result<MutationOutcome<Task>, ClientError> {
        let local = {
            let mut state = self
                .state
                .write()
                .map_err(|_| ClientError::Invalid("board state poisoned".to_string()))?;
            let task = state
                .iter_mut()
                .find(|t| t.id == req.task_id)
                .ok_or_else(|| ClientError::Invalid(format!("unknown task {}", req.task_id)))?;
            merge_locally(task, &req)?;
            task.clone()
        };

        let outcome = match self.api.update(req).await {
            Ok(server) => {
                self.replace(&local.id, server.clone());
                MutationOutcome::Confirmed(server)
            }
            Err(error) => {
                log::warn!("task update not confirmed by backend: {error}");
                MutationOutcome::Unconfirmed {
                    value: local,
                    error,
                }
            }
        };
        self.bus.emit();
        Ok(outcome)
    }

    pub async fn remove(&self, task_id: &str) -> MutationOutcome<String> {
        if let Ok(mut state) = self.state.write() {
            state.retain(|t| t.id != task_id);
        }

        let outcome = match self.api.delete(task_id).await {
            Ok(()) => MutationOutcome::Confirmed(task_id.to_string()),
            Err(error) => {
                log::warn!("task delete not confirmed by backend: {error}");
                MutationOutcome::Unconfirmed {
                    value: task_id.to_string(),
                    error,
                }
            }
        };
        self.bus.emit();
        outcome
    }

    pub async fn remove_all(&self) -> MutationOutcome<()> {
        if let Ok(mut state) = self.state.write() {
            state.clear();
        }

        let outcome = match self.api.delete_all().await {
            Ok(()) => MutationOutcome::Confirmed(()),
            Err(error) => {
                log::warn!("bulk task delete not confirmed by backend: {error}");
                MutationOutcome::Unconfirmed { value: (), error }
            }
        };
        self.bus.emit();
        outcome
    }

    fn replace(&self, id: &str, server: Task) {
        if let Ok(mut state) = self.state.write() {
            match state.iter_mut().find(|t| t.id == id) {
                Some(slot) => *slot = server,
                None => state.push(server),
            }
        }
    }
}

fn merge_field(field: &mut Field, req: &UpdateFieldRequest) -> Result<(), ClientError> {
    if let Some(name) = &req.name {
        field.name = name.clone();
    }
    if let Some(area) = req.area {
        field.area = area;
    }
    if let Some(crop) = &req.crop {
        field.crop = crop.clone();
    }
    if let Some(status) = req.status.as_deref() {
        field.status = status.parse().map_err(ClientError::Invalid)?;
    }
    Ok(())
}

fn merge_locally(task: &mut Task, req: &UpdateTaskRequest) -> Result<(), ClientError> {
    if let Some(title) = &req.title {
        task.title = title.clone();
    }
    if let Some(category) = req.category.as_deref() {
        if let Ok(parsed) = category.parse() {
            task.category = parsed;
        }
    }
    if let Some(description) = &req.description {
        task.description = Some(description.clone());
    }
    if let Some(priority) = req.priority.as_deref() {
        if let Ok(parsed) = priority.parse() {
            task.priority = parsed;
        }
    }
    if let Some(status) = req.status.as_deref() {
        if let Ok(parsed) = status.parse() {
            task.status = parsed;
        }
    }

    if let Some(time) = &req.start_time {
        task.start_time = Some(time.clone());
    }
    if let Some(date) = &req.start_date {
        task.start_date = date.clone();
        task.starts_at = combine_instant(&task.start_date, task.start_time.as_deref())
            .map_err(|e| ClientError::Invalid(e.to_string()))?;
    }
    if let Some(time) = &req.due_time {
        task.due_time = Some(time.clone());
    }
    if let Some(date) = &req.due_date {
        task.due_date = date.clone();
        task.due_at = combine_instant(&task.due_date, task.due_time.as_deref())
            .map_err(|e| ClientError::Invalid(e.to_string()))?;
    }
    Ok(())
}

fn required(value: Option<&str>, message: &str) -> Result<String, ClientError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ClientError::Invalid(message.to_string()))
}

fn parse_or<T>(value: Option<&str>, default: T) -> T
where
    T: std::str::FromStr,
{
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}
