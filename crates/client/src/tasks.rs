//! Typed wrapper over the task endpoints.

use reqwest::{Client, RequestBuilder};

use farmstead_core::{
    CreateTaskRequest, DeleteTaskRequest, Task, TaskResponse, TaskStatus, TasksResponse,
    UpdateTaskRequest, UpdateTaskStatusRequest,
};

use crate::error::{error_from_response, ClientError};
use crate::session::SessionHandle;

#[derive(Clone)]
pub struct TasksApi {
    base_url: String,
    http_client: Client,
    session: SessionHandle,
}

impl TasksApi {
    pub fn new(base_url: &str, http_client: Client, session: SessionHandle) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session,
        }
    }

    pub async fn create(&self, req: CreateTaskRequest) -> Result<Task, ClientError> {
        let response = self
            .authed(
                self.http_client
                    .post(format!("{}/api/task/create-task", self.base_url)),
            )?
            .json(&req)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<TaskResponse>().await?.task)
    }

    pub async fn list(&self) -> Result<Vec<Task>, ClientError> {
        let response = self
            .authed(
                self.http_client
                    .get(format!("{}/api/task/get-tasks", self.base_url)),
            )?
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<TasksResponse>().await?.tasks)
    }

    /// All tasks referencing one field; the API has no dedicated endpoint,
    /// so this filters the full list, like the dashboards do.
    pub async fn list_by_field(&self, field_id: &str) -> Result<Vec<Task>, ClientError> {
        let tasks = self.list().await?;
        Ok(tasks.into_iter().filter(|t| t.field_id == field_id).collect())
    }

    pub async fn update(&self, req: UpdateTaskRequest) -> Result<Task, ClientError> {
        let response = self
            .authed(
                self.http_client
                    .put(format!("{}/api/task/update-task", self.base_url)),
            )?
            .json(&req)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<TaskResponse>().await?.task)
    }

    pub async fn update_status(
        &self,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<Task, ClientError> {
        let response = self
            .authed(
                self.http_client
                    .put(format!("{}/api/task/status-update", self.base_url)),
            )?
            .json(&UpdateTaskStatusRequest {
                task_id: task_id.to_string(),
                status: status.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<TaskResponse>().await?.task)
    }

    pub async fn delete(&self, task_id: &str) -> Result<(), ClientError> {
        let response = self
            .authed(
                self.http_client
                    .post(format!("{}/api/task/delete-task", self.base_url)),
            )?
            .json(&DeleteTaskRequest {
                task_id: task_id.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    pub async fn delete_all(&self) -> Result<(), ClientError> {
        let response = self
            .authed(
                self.http_client
                    .delete(format!("{}/api/task/delete-all-tasks", self.base_url)),
            )?
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    fn authed(&self, builder: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.session.token().ok_or(ClientError::MissingSession)?;
        Ok(builder.bearer_auth(token))
    }
}
