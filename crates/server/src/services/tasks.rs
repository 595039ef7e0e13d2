//! Task lifecycle: creation with field-name resolution, partial updates
//! with independent date/time recombination, status-only updates, and
//! unconditional deletes.

use std::sync::Arc;

use uuid::Uuid;

use farmstead_core::{
    combine_instant, CreateTaskRequest, Task, TaskCategory, UpdateTaskRequest,
    UpdateTaskStatusRequest,
};

use crate::error::ApiError;
use crate::store::Store;

const TASK_NOT_FOUND: &str = "task not found";
const FIELD_NOT_FOUND: &str = "field not found";

pub struct TaskService {
    store: Arc<Store>,
}

impl TaskService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn create(&self, user_id: &str, req: CreateTaskRequest) -> Result<Task, ApiError> {
        let title = required(req.title, "task title is required")?;
        let field_name = required(req.field_name, "field name is required")?;
        let start_date = required(req.start_date, "start date is required")?;
        let due_date = required(req.due_date, "due date is required")?;

        let field = self
            .store
            .field_by_name(user_id, &field_name)?
            .ok_or_else(|| ApiError::NotFound(FIELD_NOT_FOUND.to_string()))?;

        let starts_at = combine_instant(&start_date, req.start_time.as_deref())
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        let due_at = combine_instant(&due_date, req.due_time.as_deref())
            .map_err(|e| ApiError::Validation(e.to_string()))?;

        let task = Task {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            field_id: field.id,
            title,
            category: parse_or_default(req.category, TaskCategory::Monitoring)?,
            description: req.description,
            start_date,
            start_time: req.start_time,
            due_date,
            due_time: req.due_time,
            starts_at,
            due_at,
            priority: parse_or_default(req.priority, Default::default())?,
            status: parse_or_default(req.status, Default::default())?,
        };

        self.store.insert_task(&task)?;
        Ok(task)
    }

    pub fn list(&self, user_id: &str) -> Result<Vec<Task>, ApiError> {
        Ok(self.store.tasks_for_user(user_id)?)
    }

    pub fn list_by_field(&self, user_id: &str, field_id: &str) -> Result<Vec<Task>, ApiError> {
        Ok(self.store.tasks_for_field(user_id, field_id)?)
    }

    /// Change the status and nothing else.
    pub fn update_status(
        &self,
        user_id: &str,
        req: UpdateTaskStatusRequest,
    ) -> Result<Task, ApiError> {
        let mut task = self
            .store
            .task_by_id(user_id, &req.task_id)?
            .ok_or_else(|| ApiError::NotFound(TASK_NOT_FOUND.to_string()))?;

        task.status = req
            .status
            .parse()
            .map_err(|e: String| ApiError::Validation(e))?;
        self.persist(task)
    }

    /// Field-by-field partial update. Re-pointing to another field resolves
    /// the name under the same owner, like create does. The stored instants
    /// are recombined only when the corresponding date is supplied.
    pub fn update(&self, user_id: &str, req: UpdateTaskRequest) -> Result<Task, ApiError> {
        let mut task = self
            .store
            .task_by_id(user_id, &req.task_id)?
            .ok_or_else(|| ApiError::NotFound(TASK_NOT_FOUND.to_string()))?;

        if let Some(field_name) = req.field_name {
            let field = self
                .store
                .field_by_name(user_id, &field_name)?
                .ok_or_else(|| ApiError::NotFound(FIELD_NOT_FOUND.to_string()))?;
            task.field_id = field.id;
        }
        if let Some(title) = req.title {
            task.title = title;
        }
        if let Some(category) = req.category {
            task.category = category
                .parse()
                .map_err(|e: String| ApiError::Validation(e))?;
        }
        if let Some(description) = req.description {
            task.description = Some(description);
        }
        if let Some(priority) = req.priority {
            task.priority = priority
                .parse()
                .map_err(|e: String| ApiError::Validation(e))?;
        }
        if let Some(status) = req.status {
            task.status = status
                .parse()
                .map_err(|e: String| ApiError::Validation(e))?;
        }

        if let Some(time) = req.start_time {
            task.start_time = Some(time);
        }
        if let Some(date) = req.start_date {
            task.start_date = date;
            task.starts_at = combine_instant(&task.start_date, task.start_time.as_deref())
                .map_err(|e| ApiError::Validation(e.to_string()))?;
        }
        if let Some(time) = req.due_time {
            task.due_time = Some(time);
        }
        if let Some(date) = req.due_date {
            task.due_date = date;
            task.due_at = combine_instant(&task.due_date, task.due_time.as_deref())
                .map_err(|e| ApiError::Validation(e.to_string()))?;
        }

        self.persist(task)
    }

    pub fn delete(&self, user_id: &str, task_id: &str) -> Result<(), ApiError> {
        if self.store.delete_task(user_id, task_id)? {
            Ok(())
        } else {
            Err(ApiError::NotFound(TASK_NOT_FOUND.to_string()))
        }
    }

    pub fn delete_all(&self, user_id: &str) -> Result<usize, ApiError> {
        Ok(self.store.delete_tasks_for_user(user_id)?)
    }

    fn persist(&self, task: Task) -> Result<Task, ApiError> {
        if self.store.update_task(&task)? {
            Ok(task)
        } else {
            Err(ApiError::NotFound(TASK_NOT_FOUND.to_string()))
        }
    }
}

fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(message.to_string()))
}

fn parse_or_default<T>(value: Option<String>, default: T) -> Result<T, ApiError>
where
    T: std::str::FromStr<Err = String>,
{
    match value.filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw.parse().map_err(ApiError::Validation),
        None => Ok(default),
    }
}
