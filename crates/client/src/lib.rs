//! Client SDK for the Farmstead farm-management API
//!
//! Typed wrappers over the REST surface plus the optimistic state layer the
//! dashboards use: mutations apply locally first, the backend call follows,
//! and a failure is logged while the optimistic value stays in place. Every
//! attempted mutation pings the shared [`TaskChangeBus`] so dependent views
//! refetch.

pub mod auth;
pub mod board;
pub mod bus;
pub mod error;
pub mod fields;
pub mod session;
pub mod tasks;

pub use auth::AuthApi;
pub use board::{FieldBoard, MutationOutcome, TaskBoard};
pub use bus::{Subscription, TaskChangeBus};
pub use error::ClientError;
pub use fields::FieldsApi;
pub use session::SessionHandle;
pub use tasks::TasksApi;
