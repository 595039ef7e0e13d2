//! SQLite-backed persistence.
//!
//! One connection guarded by a mutex; callers never hold the guard across an
//! await point. Foreign keys are enforced by the database (`users ← fields ←
//! tasks`, cascade on delete) and the (user_id, name) pair on fields is
//! unique. The dependent-task guard on field deletion runs inside a single
//! transaction so a task created concurrently cannot slip between the check
//! and the delete.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, Row};
use thiserror::Error;

use farmstead_core::{Field, SkippedField, Task, User};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => {
                e.code == ErrorCode::ConstraintViolation
                    && (e.extended_code == 2067 || e.extended_code == 1555)
            }
            _ => false,
        }
    }
}

/// A user row: the wire-safe projection plus the credential hash, which
/// stays inside the server.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

/// Result of the guarded field delete.
#[derive(Debug)]
pub enum FieldDeleteOutcome {
    Deleted(Field),
    Blocked(Vec<Task>),
    Missing,
}

pub struct Store {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY,
    username        TEXT NOT NULL UNIQUE,
    email           TEXT NOT NULL UNIQUE,
    password_hash   TEXT NOT NULL,
    role            TEXT NOT NULL DEFAULT 'user',
    profile_picture TEXT
);
CREATE TABLE IF NOT EXISTS fields (
    id            TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name          TEXT NOT NULL,
    area          REAL NOT NULL,
    crop          TEXT NOT NULL DEFAULT 'None',
    status        TEXT NOT NULL DEFAULT 'Planting',
    last_activity TEXT,
    UNIQUE (user_id, name)
);
CREATE TABLE IF NOT EXISTS tasks (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    field_id    TEXT NOT NULL REFERENCES fields(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    category    TEXT NOT NULL,
    description TEXT,
    start_date  TEXT NOT NULL,
    start_time  TEXT,
    due_date    TEXT NOT NULL,
    due_time    TEXT,
    starts_at   TEXT NOT NULL,
    due_at      TEXT NOT NULL,
    priority    TEXT NOT NULL DEFAULT 'low',
    status      TEXT NOT NULL DEFAULT 'Planned'
);
CREATE INDEX IF NOT EXISTS idx_tasks_field ON tasks(field_id);
CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id);
";

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // -- users --------------------------------------------------------------

    pub fn insert_user(&self, rec: &UserRecord) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (id, username, email, password_hash, role, profile_picture)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                rec.user.id,
                rec.user.username,
                rec.user.email,
                rec.password_hash,
                rec.user.role.to_string(),
                rec.user.profile_picture,
            ],
        )?;
        Ok(())
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.query_user("SELECT * FROM users WHERE email = ?1", email)
    }

    pub fn user_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        self.query_user("SELECT * FROM users WHERE id = ?1", id)
    }

    fn query_user(&self, sql: &str, arg: &str) -> Result<Option<UserRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query_map(params![arg], user_row)?;
        match rows.next() {
            Some(raw) => Ok(Some(into_user_record(raw?)?)),
            None => Ok(None),
        }
    }

    pub fn update_user(&self, user: &User) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE users SET username = ?2, email = ?3, role = ?4, profile_picture = ?5
             WHERE id = ?1",
            params![
                user.id,
                user.username,
                user.email,
                user.role.to_string(),
                user.profile_picture,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn set_password_hash(&self, user_id: &str, hash: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE users SET password_hash = ?2 WHERE id = ?1",
            params![user_id, hash],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_user(&self, user_id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        Ok(changed > 0)
    }

    // -- fields -------------------------------------------------------------

    pub fn insert_field(&self, field: &Field) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO fields (id, user_id, name, area, crop, status, last_activity)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                field.id,
                field.user_id,
                field.name,
                field.area,
                field.crop,
                field.status.to_string(),
                field.last_activity.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn fields_for_user(&self, user_id: &str) -> Result<Vec<Field>, StoreError> {
        let conn = self.lock()?;
        query_fields(
            &conn,
            "SELECT * FROM fields WHERE user_id = ?1 ORDER BY name",
            params![user_id],
        )
    }

    pub fn field_by_id(&self, user_id: &str, field_id: &str) -> Result<Option<Field>, StoreError> {
        let conn = self.lock()?;
        let fields = query_fields(
            &conn,
            "SELECT * FROM fields WHERE user_id = ?1 AND id = ?2",
            params![user_id, field_id],
        )?;
        Ok(fields.into_iter().next())
    }

    pub fn field_by_name(&self, user_id: &str, name: &str) -> Result<Option<Field>, StoreError> {
        let conn = self.lock()?;
        let fields = query_fields(
            &conn,
            "SELECT * FROM fields WHERE user_id = ?1 AND name = ?2",
            params![user_id, name],
        )?;
        Ok(fields.into_iter().next())
    }

    pub fn update_field(&self, field: &Field) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE fields SET name = ?3, area = ?4, crop = ?5, status = ?6, last_activity = ?7
             WHERE user_id = ?1 AND id = ?2",
            params![
                field.user_id,
                field.id,
                field.name,
                field.area,
                field.crop,
                field.status.to_string(),
                field.last_activity.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(changed > 0)
    }

    /// Delete a field only if no task references it. The check and the
    /// delete share one transaction.
    pub fn delete_field_guarded(
        &self,
        user_id: &str,
        field_id: &str,
    ) -> Result<FieldDeleteOutcome, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let field = query_fields(
            &tx,
            "SELECT * FROM fields WHERE user_id = ?1 AND id = ?2",
            params![user_id, field_id],
        )?
        .into_iter()
        .next();
        let Some(field) = field else {
            return Ok(FieldDeleteOutcome::Missing);
        };

        let dependents = query_tasks(
            &tx,
            "SELECT * FROM tasks WHERE user_id = ?1 AND field_id = ?2",
            params![user_id, field_id],
        )?;
        if !dependents.is_empty() {
            return Ok(FieldDeleteOutcome::Blocked(dependents));
        }

        tx.execute(
            "DELETE FROM fields WHERE user_id = ?1 AND id = ?2",
            params![user_id, field_id],
        )?;
        tx.commit()?;
        Ok(FieldDeleteOutcome::Deleted(field))
    }

    /// Delete every field of the user that has no dependent tasks; report
    /// the rest as skipped.
    pub fn delete_unreferenced_fields(
        &self,
        user_id: &str,
    ) -> Result<(Vec<Field>, Vec<SkippedField>), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let fields = query_fields(
            &tx,
            "SELECT * FROM fields WHERE user_id = ?1 ORDER BY name",
            params![user_id],
        )?;

        let mut deleted = Vec::new();
        let mut skipped = Vec::new();
        for field in fields {
            let blocking: usize = tx.query_row(
                "SELECT COUNT(*) FROM tasks WHERE user_id = ?1 AND field_id = ?2",
                params![user_id, field.id],
                |row| row.get(0),
            )?;
            if blocking > 0 {
                skipped.push(SkippedField {
                    field,
                    blocking_tasks: blocking,
                });
            } else {
                tx.execute(
                    "DELETE FROM fields WHERE user_id = ?1 AND id = ?2",
                    params![user_id, field.id],
                )?;
                deleted.push(field);
            }
        }

        tx.commit()?;
        Ok((deleted, skipped))
    }

    // -- tasks --------------------------------------------------------------

    pub fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks (id, user_id, field_id, title, category, description,
                                start_date, start_time, due_date, due_time,
                                starts_at, due_at, priority, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                task.id,
                task.user_id,
                task.field_id,
                task.title,
                task.category.to_string(),
                task.description,
                task.start_date,
                task.start_time,
                task.due_date,
                task.due_time,
                task.starts_at.to_rfc3339(),
                task.due_at.to_rfc3339(),
                task.priority.to_string(),
                task.status.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn tasks_for_user(&self, user_id: &str) -> Result<Vec<Task>, StoreError> {
        let conn = self.lock()?;
        query_tasks(
            &conn,
            "SELECT * FROM tasks WHERE user_id = ?1 ORDER BY starts_at",
            params![user_id],
        )
    }

    pub fn tasks_for_field(&self, user_id: &str, field_id: &str) -> Result<Vec<Task>, StoreError> {
        let conn = self.lock()?;
        query_tasks(
            &conn,
            "SELECT * FROM tasks WHERE user_id = ?1 AND field_id = ?2 ORDER BY starts_at",
            params![user_id, field_id],
        )
    }

    pub fn task_by_id(&self, user_id: &str, task_id: &str) -> Result<Option<Task>, StoreError> {
        let conn = self.lock()?;
        let tasks = query_tasks(
            &conn,
            "SELECT * FROM tasks WHERE user_id = ?1 AND id = ?2",
            params![user_id, task_id],
        )?;
        Ok(tasks.into_iter().next())
    }

    pub fn update_task(&self, task: &Task) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE tasks SET field_id = ?3, title = ?4, category = ?5, description = ?6,
                              start_date = ?7, start_time = ?8, due_date = ?9, due_time = ?10,
                              starts_at = ?11, due_at = ?12, priority = ?13, status = ?14
             WHERE user_id = ?1 AND id = ?2",
            params![
                task.user_id,
                task.id,
                task.field_id,
                task.title,
                task.category.to_string(),
                task.description,
                task.start_date,
                task.start_time,
                task.due_date,
                task.due_time,
                task.starts_at.to_rfc3339(),
                task.due_at.to_rfc3339(),
                task.priority.to_string(),
                task.status.to_string(),
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_task(&self, user_id: &str, task_id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "DELETE FROM tasks WHERE user_id = ?1 AND id = ?2",
            params![user_id, task_id],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_tasks_for_user(&self, user_id: &str) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM tasks WHERE user_id = ?1", params![user_id])?;
        Ok(changed)
    }
}

// -- row mapping --------------------------------------------------------

struct UserRow {
    id: String,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    profile_picture: Option<String>,
}

fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        role: row.get("role")?,
        profile_picture: row.get("profile_picture")?,
    })
}

fn into_user_record(raw: UserRow) -> Result<UserRecord, StoreError> {
    Ok(UserRecord {
        user: User {
            id: raw.id,
            username: raw.username,
            email: raw.email,
            role: raw.role.parse().map_err(StoreError::Corrupt)?,
            profile_picture: raw.profile_picture,
        },
        password_hash: raw.password_hash,
    })
}

struct FieldRow {
    id: String,
    user_id: String,
    name: String,
    area: f64,
    crop: String,
    status: String,
    last_activity: Option<String>,
}

fn field_row(row: &Row<'_>) -> rusqlite::Result<FieldRow> {
    Ok(FieldRow {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        area: row.get("area")?,
        crop: row.get("crop")?,
        status: row.get("status")?,
        last_activity: row.get("last_activity")?,
    })
}

fn into_field(raw: FieldRow) -> Result<Field, StoreError> {
    Ok(Field {
        id: raw.id,
        user_id: raw.user_id,
        name: raw.name,
        area: raw.area,
        crop: raw.crop,
        status: raw.status.parse().map_err(StoreError::Corrupt)?,
        last_activity: raw.last_activity.map(|t| parse_instant(&t)).transpose()?,
    })
}

struct TaskRow {
    id: String,
    user_id: String,
    field_id: String,
    title: String,
    category: String,
    description: Option<String>,
    start_date: String,
    start_time: Option<String>,
    due_date: String,
    due_time: Option<String>,
    starts_at: String,
    due_at: String,
    priority: String,
    status: String,
}

fn task_row(row: &Row<'_>) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        field_id: row.get("field_id")?,
        title: row.get("title")?,
        category: row.get("category")?,
        description: row.get("description")?,
        start_date: row.get("start_date")?,
        start_time: row.get("start_time")?,
        due_date: row.get("due_date")?,
        due_time: row.get("due_time")?,
        starts_at: row.get("starts_at")?,
        due_at: row.get("due_at")?,
        priority: row.get("priority")?,
        status: row.get("status")?,
    })
}

fn into_task(raw: TaskRow) -> Result<Task, StoreError> {
    Ok(Task {
        id: raw.id,
        user_id: raw.user_id,
        field_id: raw.field_id,
        title: raw.title,
        category: raw.category.parse().map_err(StoreError::Corrupt)?,
        description: raw.description,
        start_date: raw.start_date,
        start_time: raw.start_time,
        due_date: raw.due_date,
        due_time: raw.due_time,
        starts_at: parse_instant(&raw.starts_at)?,
        due_at: parse_instant(&raw.due_at)?,
        priority: raw.priority.parse().map_err(StoreError::Corrupt)?,
        status: raw.status.parse().map_err(StoreError::Corrupt)?,
    })
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {raw:?}: {e}")))
}

fn query_fields(
    conn: &Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<Field>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(args, field_row)?;
    rows.map(|raw| into_field(raw?)).collect()
}

fn query_tasks(
    conn: &Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<Task>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(args, task_row)?;
    rows.map(|raw| into_task(raw?)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use farmstead_core::{FieldStatus, TaskCategory, TaskPriority, TaskStatus, UserRole};

    fn store_with_user(id: &str) -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_user(&UserRecord {
                user: User {
                    id: id.to_string(),
                    username: format!("user-{id}"),
                    email: format!("{id}@example.com"),
                    role: UserRole::User,
                    profile_picture: None,
                },
                password_hash: "hash".to_string(),
            })
            .unwrap();
        store
    }

    fn sample_field(user_id: &str, name: &str) -> Field {
        Field {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            area: 10.0,
            crop: "wheat".to_string(),
            status: FieldStatus::Planting,
            last_activity: None,
        }
    }

    fn sample_task(user_id: &str, field_id: &str) -> Task {
        Task {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            field_id: field_id.to_string(),
            title: "Irrigate".to_string(),
            category: TaskCategory::Watering,
            description: None,
            start_date: "2024-05-20".to_string(),
            start_time: None,
            due_date: "2024-05-21".to_string(),
            due_time: None,
            starts_at: farmstead_core::combine_instant("2024-05-20", None).unwrap(),
            due_at: farmstead_core::combine_instant("2024-05-21", None).unwrap(),
            priority: TaskPriority::Low,
            status: TaskStatus::Planned,
        }
    }

    #[test]
    fn duplicate_field_name_is_a_unique_violation() {
        let store = store_with_user("u1");
        store.insert_field(&sample_field("u1", "North")).unwrap();
        let err = store
            .insert_field(&sample_field("u1", "North"))
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn same_field_name_under_two_users_is_fine() {
        let store = store_with_user("u1");
        store
            .insert_user(&UserRecord {
                user: User {
                    id: "u2".to_string(),
                    username: "other".to_string(),
                    email: "other@example.com".to_string(),
                    role: UserRole::User,
                    profile_picture: None,
                },
                password_hash: "hash".to_string(),
            })
            .unwrap();
        store.insert_field(&sample_field("u1", "North")).unwrap();
        store.insert_field(&sample_field("u2", "North")).unwrap();
    }

    #[test]
    fn guarded_delete_blocks_and_leaves_the_field_in_place() {
        let store = store_with_user("u1");
        let field = sample_field("u1", "South");
        store.insert_field(&field).unwrap();
        store.insert_task(&sample_task("u1", &field.id)).unwrap();

        match store.delete_field_guarded("u1", &field.id).unwrap() {
            FieldDeleteOutcome::Blocked(tasks) => assert_eq!(tasks.len(), 1),
            other => panic!("expected Blocked, got {other:?}"),
        }
        assert!(store.field_by_id("u1", &field.id).unwrap().is_some());
    }

    #[test]
    fn guarded_delete_removes_an_unreferenced_field() {
        let store = store_with_user("u1");
        let field = sample_field("u1", "South");
        store.insert_field(&field).unwrap();

        match store.delete_field_guarded("u1", &field.id).unwrap() {
            FieldDeleteOutcome::Deleted(f) => assert_eq!(f.id, field.id),
            other => panic!("expected Deleted, got {other:?}"),
        }
        assert!(store.field_by_id("u1", &field.id).unwrap().is_none());
    }

    #[test]
    fn delete_unreferenced_fields_reports_skips() {
        let store = store_with_user("u1");
        let free = sample_field("u1", "Free");
        let busy = sample_field("u1", "Busy");
        store.insert_field(&free).unwrap();
        store.insert_field(&busy).unwrap();
        store.insert_task(&sample_task("u1", &busy.id)).unwrap();

        let (deleted, skipped) = store.delete_unreferenced_fields("u1").unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].id, free.id);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].field.id, busy.id);
        assert_eq!(skipped[0].blocking_tasks, 1);
    }

    #[test]
    fn deleting_a_user_cascades_to_fields_and_tasks() {
        let store = store_with_user("u1");
        let field = sample_field("u1", "South");
        store.insert_field(&field).unwrap();
        store.insert_task(&sample_task("u1", &field.id)).unwrap();

        assert!(store.delete_user("u1").unwrap());
        assert!(store.fields_for_user("u1").unwrap().is_empty());
        assert!(store.tasks_for_user("u1").unwrap().is_empty());
    }

    #[test]
    fn task_round_trips_through_the_store() {
        let store = store_with_user("u1");
        let field = sample_field("u1", "South");
        store.insert_field(&field).unwrap();
        let mut task = sample_task("u1", &field.id);
        task.start_time = Some("08:30".to_string());
        task.starts_at = farmstead_core::combine_instant("2024-05-20", Some("08:30")).unwrap();
        store.insert_task(&task).unwrap();

        let loaded = store.task_by_id("u1", &task.id).unwrap().unwrap();
        assert_eq!(loaded, task);
    }
}
