//! Error type for the client SDK.

use reqwest::Response;
use thiserror::Error;

use farmstead_core::{ErrorBody, Task};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A non-2xx response from the API, with the parsed error body.
    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        blocking_tasks: Option<Vec<Task>>,
    },

    /// A field delete refused locally because tasks still reference it.
    #[error("field cannot be deleted: {} task(s) reference it", tasks.len())]
    DependentTasks { tasks: Vec<Task> },

    /// Input the optimistic layer cannot even represent locally.
    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("not signed in")]
    MissingSession,
}

impl ClientError {
    /// The tasks blocking a field delete, when this error carries them.
    pub fn blocking_tasks(&self) -> Option<&[Task]> {
        match self {
            ClientError::DependentTasks { tasks } => Some(tasks),
            ClientError::Api {
                blocking_tasks: Some(tasks),
                ..
            } => Some(tasks),
            _ => None,
        }
    }
}

/// Turn a non-success response into a [`ClientError::Api`], keeping the
/// structured body when it parses.
pub(crate) async fn error_from_response(response: Response) -> ClientError {
    let status = response.status().as_u16();
    match response.json::<ErrorBody>().await {
        Ok(body) => ClientError::Api {
            status,
            message: body.message,
            blocking_tasks: body.tasks,
        },
        Err(_) => ClientError::Api {
            status,
            message: "unparseable error response".to_string(),
            blocking_tasks: None,
        },
    }
}
