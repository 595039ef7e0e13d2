//! Registration, login, and profile self-service.

use reqwest::{Client, RequestBuilder};

use farmstead_core::{
    ChangePasswordRequest, DeleteAccountRequest, LoginRequest, LoginResponse, RegisterRequest,
    Session, UpdateProfileRequest, User, UserResponse,
};

use crate::error::{error_from_response, ClientError};
use crate::session::SessionHandle;

pub struct AuthApi {
    base_url: String,
    http_client: Client,
    session: SessionHandle,
}

impl AuthApi {
    pub fn new(base_url: &str, http_client: Client, session: SessionHandle) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session,
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ClientError> {
        let response = self
            .http_client
            .post(format!("{}/api/user/register", self.base_url))
            .json(&RegisterRequest {
                username: Some(username.to_string()),
                email: Some(email.to_string()),
                password: Some(password.to_string()),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<UserResponse>().await?.user)
    }

    /// Log in and store the session on the shared handle.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let response = self
            .http_client
            .post(format!("{}/api/user/login", self.base_url))
            .json(&LoginRequest {
                email: Some(email.to_string()),
                password: Some(password.to_string()),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let body: LoginResponse = response.json().await?;
        let session = Session {
            token: body.token,
            user: body.user,
        };
        self.session.set(session.clone());
        Ok(session)
    }

    pub async fn update_profile(&self, req: UpdateProfileRequest) -> Result<User, ClientError> {
        let response = self
            .authed(
                self.http_client
                    .put(format!("{}/api/user/update", self.base_url)),
            )?
            .json(&req)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<UserResponse>().await?.user)
    }

    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ClientError> {
        let response = self
            .authed(
                self.http_client
                    .put(format!("{}/api/user/changePassword", self.base_url)),
            )?
            .json(&ChangePasswordRequest {
                old_password: Some(old_password.to_string()),
                new_password: Some(new_password.to_string()),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    /// Delete the account (password re-entry required) and drop the session.
    pub async fn delete_account(&self, password: &str) -> Result<(), ClientError> {
        let response = self
            .authed(
                self.http_client
                    .delete(format!("{}/api/user/delete", self.base_url)),
            )?
            .json(&DeleteAccountRequest {
                password: Some(password.to_string()),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        self.session.clear();
        Ok(())
    }

    fn authed(&self, builder: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.session.token().ok_or(ClientError::MissingSession)?;
        Ok(builder.bearer_auth(token))
    }
}
