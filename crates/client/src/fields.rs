//! Typed wrapper over the field endpoints.

use reqwest::{Client, RequestBuilder};

use farmstead_core::{
    CreateFieldRequest, DeleteAllFieldsResponse, DeleteFieldRequest, Field, FieldResponse,
    FieldStatus, FieldsResponse, UpdateFieldRequest, UpdateFieldStatusRequest,
};

use crate::error::{error_from_response, ClientError};
use crate::session::SessionHandle;

#[derive(Clone)]
pub struct FieldsApi {
    base_url: String,
    http_client: Client,
    session: SessionHandle,
}

impl FieldsApi {
    pub fn new(base_url: &str, http_client: Client, session: SessionHandle) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session,
        }
    }

    pub async fn create(&self, req: CreateFieldRequest) -> Result<Field, ClientError> {
        let response = self
            .authed(
                self.http_client
                    .post(format!("{}/api/field/create-field", self.base_url)),
            )?
            .json(&req)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<FieldResponse>().await?.field)
    }

    pub async fn list(&self) -> Result<Vec<Field>, ClientError> {
        let response = self
            .authed(
                self.http_client
                    .get(format!("{}/api/field/get-fields", self.base_url)),
            )?
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<FieldsResponse>().await?.fields)
    }

    pub async fn update_status(
        &self,
        field_id: &str,
        status: FieldStatus,
    ) -> Result<Field, ClientError> {
        let response = self
            .authed(
                self.http_client
                    .post(format!("{}/api/field/update-field-status", self.base_url)),
            )?
            .json(&UpdateFieldStatusRequest {
                field_id: field_id.to_string(),
                status: status.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<FieldResponse>().await?.field)
    }

    pub async fn update(&self, req: UpdateFieldRequest) -> Result<Field, ClientError> {
        let response = self
            .authed(
                self.http_client
                    .put(format!("{}/api/field/update-field", self.base_url)),
            )?
            .json(&req)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<FieldResponse>().await?.field)
    }

    /// Delete one field. A 409 with a `tasks` payload means the delete was
    /// refused because tasks still reference the field.
    pub async fn delete(&self, field_id: &str) -> Result<Field, ClientError> {
        let response = self
            .authed(
                self.http_client
                    .post(format!("{}/api/field/delete-field", self.base_url)),
            )?
            .json(&DeleteFieldRequest {
                field_id: field_id.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<FieldResponse>().await?.field)
    }

    pub async fn delete_all(&self) -> Result<DeleteAllFieldsResponse, ClientError> {
        let response = self
            .authed(
                self.http_client
                    .delete(format!("{}/api/field/delete-all-fields", self.base_url)),
            )?
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    fn authed(&self, builder: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.session.token().ok_or(ClientError::MissingSession)?;
        Ok(builder.bearer_auth(token))
    }
}
