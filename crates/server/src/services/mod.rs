//! Lifecycle services: ownership scoping, relational invariants, and
//! translation of storage failures into the API error taxonomy.

mod fields;
mod tasks;
mod users;

pub use fields::FieldService;
pub use tasks::TaskService;
pub use users::UserService;
