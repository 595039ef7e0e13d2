//! Request handlers. Thin glue: extract the principal and the body, call
//! the lifecycle service, wrap the result in the response envelope.

use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::info;

use farmstead_core::{
    ChangePasswordRequest, CreateFieldRequest, CreateTaskRequest, DeleteAccountRequest,
    DeleteFieldRequest, DeleteTaskRequest, LoginRequest, RegisterRequest, UpdateFieldRequest,
    UpdateFieldStatusRequest, UpdateProfileRequest, UpdateTaskRequest, UpdateTaskStatusRequest,
};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;

/// `axum::Json` with its rejection folded into the error envelope, so a
/// malformed body gets the same `message` shape as every other failure.
pub(crate) struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
        }
    }
}

pub(crate) async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// -- users -------------------------------------------------------------

pub(crate) async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.users().register(req)?;
    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "user registered", "user": user })),
    ))
}

pub(crate) async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (token, user) = state.users().login(req)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(
        json!({ "message": "login successful", "token": token, "user": user }),
    ))
}

pub(crate) async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state.users().update_profile(&user.user_id, req)?;
    Ok(Json(json!({ "message": "profile updated", "user": updated })))
}

pub(crate) async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.users().change_password(&user.user_id, req)?;
    Ok(Json(json!({ "message": "password changed" })))
}

pub(crate) async fn delete_account(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<DeleteAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.users().delete_account(&user.user_id, req)?;
    info!(user_id = %user.user_id, "account deleted");
    Ok(Json(json!({ "message": "account deleted" })))
}

// -- fields ------------------------------------------------------------

pub(crate) async fn create_field(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateFieldRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let field = state.fields().create(&user.user_id, req)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "field created", "field": field })),
    ))
}

pub(crate) async fn get_fields(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let fields = state.fields().list(&user.user_id)?;
    Ok(Json(json!({ "message": "fields fetched", "fields": fields })))
}

pub(crate) async fn update_field_status(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateFieldStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let field = state
        .fields()
        .update_status(&user.user_id, &req.field_id, &req.status)?;
    Ok(Json(json!({ "message": "field status updated", "field": field })))
}

pub(crate) async fn update_field(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateFieldRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let field = state.fields().update(&user.user_id, req)?;
    Ok(Json(json!({ "message": "field updated", "field": field })))
}

pub(crate) async fn delete_field(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<DeleteFieldRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let field = state.fields().delete(&user.user_id, &req.field_id)?;
    Ok(Json(json!({ "message": "field deleted", "field": field })))
}

pub(crate) async fn delete_all_fields(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let (deleted, skipped) = state.fields().delete_all(&user.user_id)?;
    Ok(Json(json!({
        "message": "fields deleted",
        "deleted": deleted,
        "skipped": skipped,
    })))
}

// -- tasks -------------------------------------------------------------

pub(crate) async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.tasks().create(&user.user_id, req)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "task created", "task": task })),
    ))
}

pub(crate) async fn get_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let tasks = state.tasks().list(&user.user_id)?;
    Ok(Json(json!({ "message": "tasks fetched", "tasks": tasks })))
}

pub(crate) async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.tasks().update(&user.user_id, req)?;
    Ok(Json(json!({ "message": "task updated", "task": task })))
}

pub(crate) async fn update_task_status(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateTaskStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.tasks().update_status(&user.user_id, req)?;
    Ok(Json(json!({ "message": "task status updated", "task": task })))
}

pub(crate) async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<DeleteTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.tasks().delete(&user.user_id, &req.task_id)?;
    Ok(Json(json!({ "message": "task deleted" })))
}

pub(crate) async fn delete_all_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state.tasks().delete_all(&user.user_id)?;
    Ok(Json(json!({ "message": "tasks deleted", "removed": removed })))
}
