//! Shared domain model for the Farmstead farm-management system
//!
//! This crate holds the entity types (users, fields, tasks), the wire-level
//! request/response shapes exchanged between the server and the client SDK,
//! and the scheduling rule that combines separate date and time inputs into
//! a single instant.

pub mod api;
pub mod model;
pub mod schedule;

pub use api::*;
pub use model::{
    Field, FieldStatus, Task, TaskCategory, TaskPriority, TaskStatus, User, UserRole,
};
pub use schedule::{combine_instant, ScheduleError};
