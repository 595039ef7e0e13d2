//! Entity types shared by the server and the client SDK.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::User
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// An account owning fields and tasks. The password hash never leaves the
/// server; this struct is the wire-safe projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// Lifecycle status of a field.
///
/// Canonical vocabulary: Planting, Growing, Harvesting, Inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldStatus {
    Planting,
    Growing,
    Harvesting,
    Inactive,
}

impl Default for FieldStatus {
    fn default() -> Self {
        FieldStatus::Planting
    }
}

impl fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldStatus::Planting => "Planting",
            FieldStatus::Growing => "Growing",
            FieldStatus::Harvesting => "Harvesting",
            FieldStatus::Inactive => "Inactive",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for FieldStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Planting" => Ok(FieldStatus::Planting),
            "Growing" => Ok(FieldStatus::Growing),
            "Harvesting" => Ok(FieldStatus::Harvesting),
            "Inactive" => Ok(FieldStatus::Inactive),
            other => Err(format!("unknown field status: {}", other)),
        }
    }
}

/// A unit of farmland owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub area: f64,
    pub crop: String,
    pub status: FieldStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

/// Kind of farming activity a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Watering,
    Fertilization,
    Monitoring,
    Harvesting,
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskCategory::Watering => "watering",
            TaskCategory::Fertilization => "fertilization",
            TaskCategory::Monitoring => "monitoring",
            TaskCategory::Harvesting => "harvesting",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TaskCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "watering" => Ok(TaskCategory::Watering),
            "fertilization" => Ok(TaskCategory::Fertilization),
            "monitoring" => Ok(TaskCategory::Monitoring),
            "harvesting" => Ok(TaskCategory::Harvesting),
            other => Err(format!("unknown task category: {}", other)),
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Low
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            other => Err(format!("unknown task priority: {}", other)),
        }
    }
}

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Planned,
    #[serde(rename = "In-Progress")]
    InProgress,
    Started,
    Completed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Planned
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Planned => "Planned",
            TaskStatus::InProgress => "In-Progress",
            TaskStatus::Started => "Started",
            TaskStatus::Completed => "Completed",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Planned" => Ok(TaskStatus::Planned),
            "In-Progress" => Ok(TaskStatus::InProgress),
            "Started" => Ok(TaskStatus::Started),
            "Completed" => Ok(TaskStatus::Completed),
            other => Err(format!("unknown task status: {}", other)),
        }
    }
}

/// A scheduled farming activity tied to one field and one owner.
///
/// `start_date`/`start_time` and `due_date`/`due_time` are kept exactly as
/// submitted; `starts_at`/`due_at` are the combined instants derived from
/// them (see [`crate::schedule::combine_instant`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub field_id: String,
    pub title: String,
    pub category: TaskCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    pub due_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_time: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_round_trips_through_wire_names() {
        for (status, wire) in [
            (TaskStatus::Planned, "\"Planned\""),
            (TaskStatus::InProgress, "\"In-Progress\""),
            (TaskStatus::Started, "\"Started\""),
            (TaskStatus::Completed, "\"Completed\""),
        ] {
            assert_eq!(serde_json::to_string(&status).unwrap(), wire);
            assert_eq!(serde_json::from_str::<TaskStatus>(wire).unwrap(), status);
        }
    }

    #[test]
    fn field_status_rejects_unknown_values() {
        assert!("Active".parse::<FieldStatus>().is_err());
        assert_eq!(
            "Harvesting".parse::<FieldStatus>().unwrap(),
            FieldStatus::Harvesting
        );
    }

    #[test]
    fn defaults_match_the_documented_initial_states() {
        assert_eq!(FieldStatus::default(), FieldStatus::Planting);
        assert_eq!(TaskStatus::default(), TaskStatus::Planned);
        assert_eq!(TaskPriority::default(), TaskPriority::Low);
    }
}
