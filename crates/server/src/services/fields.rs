//! Field lifecycle: create, list, partial update, status transition, and
//! the dependency-guarded deletes.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use farmstead_core::{CreateFieldRequest, Field, SkippedField, UpdateFieldRequest};

use crate::error::ApiError;
use crate::store::{FieldDeleteOutcome, Store};

const FIELD_NOT_FOUND: &str = "field not found";

pub struct FieldService {
    store: Arc<Store>,
}

impl FieldService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn create(&self, user_id: &str, req: CreateFieldRequest) -> Result<Field, ApiError> {
        let name = req
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::Validation("field name is required".to_string()))?;
        let area = valid_area(
            req.area
                .ok_or_else(|| ApiError::Validation("field area is required".to_string()))?,
        )?;

        let field = Field {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name,
            area,
            crop: req
                .crop
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| "None".to_string()),
            status: Default::default(),
            last_activity: None,
        };

        match self.store.insert_field(&field) {
            Ok(()) => Ok(field),
            Err(err) if err.is_unique_violation() => Err(duplicate_name(&field.name)),
            Err(err) => Err(err.into()),
        }
    }

    pub fn list(&self, user_id: &str) -> Result<Vec<Field>, ApiError> {
        Ok(self.store.fields_for_user(user_id)?)
    }

    pub fn update_status(
        &self,
        user_id: &str,
        field_id: &str,
        status: &str,
    ) -> Result<Field, ApiError> {
        let status = status
            .parse()
            .map_err(|e: String| ApiError::Validation(e))?;

        let mut field = self
            .store
            .field_by_id(user_id, field_id)?
            .ok_or_else(|| ApiError::NotFound(FIELD_NOT_FOUND.to_string()))?;

        field.status = status;
        field.last_activity = Some(Utc::now());
        self.persist(field)
    }

    /// Merge the provided fields only; everything absent stays untouched.
    pub fn update(&self, user_id: &str, req: UpdateFieldRequest) -> Result<Field, ApiError> {
        let mut field = self
            .store
            .field_by_id(user_id, &req.field_id)?
            .ok_or_else(|| ApiError::NotFound(FIELD_NOT_FOUND.to_string()))?;

        if let Some(name) = req.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ApiError::Validation("field name cannot be empty".to_string()));
            }
            field.name = name;
        }
        if let Some(area) = req.area {
            field.area = valid_area(area)?;
        }
        if let Some(crop) = req.crop {
            field.crop = crop;
        }
        if let Some(status) = req.status {
            field.status = status
                .parse()
                .map_err(|e: String| ApiError::Validation(e))?;
        }
        self.persist(field)
    }

    /// Delete the field unless tasks still reference it. The dependent-task
    /// check and the delete run in one storage transaction.
    pub fn delete(&self, user_id: &str, field_id: &str) -> Result<Field, ApiError> {
        match self.store.delete_field_guarded(user_id, field_id)? {
            FieldDeleteOutcome::Deleted(field) => Ok(field),
            FieldDeleteOutcome::Blocked(tasks) => Err(ApiError::DependentTasks { tasks }),
            FieldDeleteOutcome::Missing => Err(ApiError::NotFound(FIELD_NOT_FOUND.to_string())),
        }
    }

    /// Delete every field with zero dependent tasks; report the rest as
    /// skipped together with their blocking-task counts.
    pub fn delete_all(
        &self,
        user_id: &str,
    ) -> Result<(Vec<Field>, Vec<SkippedField>), ApiError> {
        Ok(self.store.delete_unreferenced_fields(user_id)?)
    }

    fn persist(&self, field: Field) -> Result<Field, ApiError> {
        match self.store.update_field(&field) {
            Ok(true) => Ok(field),
            Ok(false) => Err(ApiError::NotFound(FIELD_NOT_FOUND.to_string())),
            Err(err) if err.is_unique_violation() => Err(duplicate_name(&field.name)),
            Err(err) => Err(ApiError::from(err)),
        }
    }
}

fn duplicate_name(name: &str) -> ApiError {
    ApiError::Conflict(format!("a field named {name:?} already exists"))
}

fn valid_area(area: f64) -> Result<f64, ApiError> {
    if area.is_finite() && area > 0.0 {
        Ok(area)
    } else {
        Err(ApiError::Validation(
            "field area must be a positive number".to_string(),
        ))
    }
}
