//! Farmstead REST backend
//!
//! Axum router over SQLite-backed lifecycle services for users, fields, and
//! tasks. Every field and task is owned by exactly one user; a field cannot
//! be deleted while tasks reference it.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::auth::TokenSigner;
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::services::{FieldService, TaskService, UserService};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub tokens: Arc<TokenSigner>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Result<Self, ApiError> {
        let store = match &config.db_path {
            Some(path) => Store::open(path),
            None => Store::open_in_memory(),
        }
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(Self {
            store: Arc::new(store),
            tokens: Arc::new(TokenSigner::new(&config.jwt_secret, config.token_ttl_secs)),
        })
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.store.clone(), self.tokens.clone())
    }

    pub fn fields(&self) -> FieldService {
        FieldService::new(self.store.clone())
    }

    pub fn tasks(&self) -> TaskService {
        TaskService::new(self.store.clone())
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http::healthz))
        .route("/api/user/register", post(http::register))
        .route("/api/user/login", post(http::login))
        .route("/api/user/update", put(http::update_profile))
        .route("/api/user/changePassword", put(http::change_password))
        .route("/api/user/delete", delete(http::delete_account))
        .route("/api/field/create-field", post(http::create_field))
        .route("/api/field/get-fields", get(http::get_fields))
        .route(
            "/api/field/update-field-status",
            post(http::update_field_status),
        )
        .route("/api/field/update-field", put(http::update_field))
        .route("/api/field/delete-field", post(http::delete_field))
        .route(
            "/api/field/delete-all-fields",
            delete(http::delete_all_fields),
        )
        .route("/api/task/create-task", post(http::create_task))
        .route("/api/task/get-tasks", get(http::get_tasks))
        .route("/api/task/update-task", put(http::update_task))
        .route("/api/task/status-update", put(http::update_task_status))
        .route("/api/task/delete-task", post(http::delete_task))
        .route(
            "/api/task/delete-all-tasks",
            delete(http::delete_all_tasks),
        )
        .with_state(state)
}
