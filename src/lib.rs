//! Farmstead Rust Client
//!
//! Entry point for applications talking to a Farmstead backend. One
//! [`Farmstead`] value owns the HTTP client, the shared session, and the
//! tasks-changed bus; the typed API handles and the optimistic boards it
//! hands out all share those three.
//!
//! ```no_run
//! use farmstead::Farmstead;
//!
//! # async fn run() -> Result<(), farmstead::ClientError> {
//! let farm = Farmstead::new("http://localhost:4000");
//! farm.auth().login("ada@example.com", "hunter2").await?;
//! let fields = farm.fields().list().await?;
//! # Ok(())
//! # }
//! ```

use reqwest::Client;

use farmstead_client::{AuthApi, FieldBoard, FieldsApi, SessionHandle, TaskBoard, TasksApi};

pub use farmstead_client::{ClientError, MutationOutcome, Subscription, TaskChangeBus};
pub use farmstead_core as model;

/// The main entry point for the Farmstead client.
pub struct Farmstead {
    /// Base URL of the backend, without the `/api` prefix.
    pub base_url: String,
    /// HTTP client shared by every handle created from this value.
    pub http_client: Client,
    session: SessionHandle,
    bus: TaskChangeBus,
}

impl Farmstead {
    /// Create a client with its own tasks-changed bus.
    pub fn new(base_url: &str) -> Self {
        Self::new_with_bus(base_url, TaskChangeBus::new())
    }

    /// Create a client publishing on a caller-supplied bus. Useful when the
    /// application already has views subscribed elsewhere, and in tests.
    pub fn new_with_bus(base_url: &str, bus: TaskChangeBus) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: Client::new(),
            session: SessionHandle::new(),
            bus,
        }
    }

    /// Registration, login, and profile self-service. Logging in through
    /// this handle signs in every other handle too.
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(&self.base_url, self.http_client.clone(), self.session.clone())
    }

    /// Direct, non-optimistic field endpoints.
    pub fn fields(&self) -> FieldsApi {
        FieldsApi::new(&self.base_url, self.http_client.clone(), self.session.clone())
    }

    /// Direct, non-optimistic task endpoints.
    pub fn tasks(&self) -> TasksApi {
        TasksApi::new(&self.base_url, self.http_client.clone(), self.session.clone())
    }

    /// An optimistic field board wired to the shared bus.
    pub fn field_board(&self) -> FieldBoard {
        FieldBoard::new(self.fields(), self.tasks(), self.bus.clone())
    }

    /// An optimistic task board wired to the shared bus.
    pub fn task_board(&self) -> TaskBoard {
        TaskBoard::new(self.tasks(), self.bus.clone())
    }

    /// The tasks-changed bus mutations publish on.
    pub fn events(&self) -> &TaskChangeBus {
        &self.bus
    }

    /// The shared session handle.
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }
}

pub mod prelude {
    pub use crate::Farmstead;
    pub use farmstead_client::{
        AuthApi, ClientError, FieldBoard, FieldsApi, MutationOutcome, SessionHandle, Subscription,
        TaskBoard, TaskChangeBus, TasksApi,
    };
    pub use farmstead_core::{
        Field, FieldStatus, Task, TaskCategory, TaskPriority, TaskStatus, User, UserRole,
    };
}
