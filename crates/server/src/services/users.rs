//! Account lifecycle: registration, login, profile updates, password
//! change, and self-service deletion (which cascades to fields and tasks).

use std::sync::Arc;

use uuid::Uuid;

use farmstead_core::{
    ChangePasswordRequest, DeleteAccountRequest, LoginRequest, RegisterRequest,
    UpdateProfileRequest, User, UserRole,
};

use crate::auth::{hash_password, verify_password, TokenSigner};
use crate::error::ApiError;
use crate::store::{Store, UserRecord};

const BAD_CREDENTIALS: &str = "invalid email or password";

pub struct UserService {
    store: Arc<Store>,
    tokens: Arc<TokenSigner>,
}

impl UserService {
    pub fn new(store: Arc<Store>, tokens: Arc<TokenSigner>) -> Self {
        Self { store, tokens }
    }

    pub fn register(&self, req: RegisterRequest) -> Result<User, ApiError> {
        let username = required(req.username, "username is required")?;
        let email = required(req.email, "email is required")?;
        let password = required(req.password, "password is required")?;

        let record = UserRecord {
            user: User {
                id: Uuid::new_v4().to_string(),
                username,
                email,
                role: UserRole::User,
                profile_picture: None,
            },
            password_hash: hash_password(&password)?,
        };

        match self.store.insert_user(&record) {
            Ok(()) => Ok(record.user),
            Err(err) if err.is_unique_violation() => Err(ApiError::Conflict(
                "username or email already in use".to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }

    pub fn login(&self, req: LoginRequest) -> Result<(String, User), ApiError> {
        let email = required(req.email, "email is required")?;
        let password = required(req.password, "password is required")?;

        let record = self
            .store
            .user_by_email(&email)?
            .ok_or_else(|| ApiError::Unauthorized(BAD_CREDENTIALS.to_string()))?;
        if !verify_password(&password, &record.password_hash)? {
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        let token = self.tokens.issue(&record.user.id, &record.user.email)?;
        Ok((token, record.user))
    }

    pub fn update_profile(
        &self,
        user_id: &str,
        req: UpdateProfileRequest,
    ) -> Result<User, ApiError> {
        let mut user = self.load(user_id)?.user;

        if let Some(username) = req.username.filter(|u| !u.trim().is_empty()) {
            user.username = username.trim().to_string();
        }
        if let Some(email) = req.email.filter(|e| !e.trim().is_empty()) {
            user.email = email.trim().to_string();
        }
        if let Some(picture) = req.profile_picture {
            user.profile_picture = Some(picture);
        }

        match self.store.update_user(&user) {
            Ok(true) => Ok(user),
            Ok(false) => Err(ApiError::NotFound("user not found".to_string())),
            Err(err) if err.is_unique_violation() => Err(ApiError::Conflict(
                "username or email already in use".to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }

    pub fn change_password(
        &self,
        user_id: &str,
        req: ChangePasswordRequest,
    ) -> Result<(), ApiError> {
        let old = required(req.old_password, "old password is required")?;
        let new = required(req.new_password, "new password is required")?;

        let record = self.load(user_id)?;
        if !verify_password(&old, &record.password_hash)? {
            return Err(ApiError::Unauthorized(
                "current password is incorrect".to_string(),
            ));
        }

        self.store.set_password_hash(user_id, &hash_password(&new)?)?;
        Ok(())
    }

    /// Requires the password to be re-entered; deletion cascades to the
    /// user's fields and tasks at the storage layer.
    pub fn delete_account(
        &self,
        user_id: &str,
        req: DeleteAccountRequest,
    ) -> Result<(), ApiError> {
        let password = required(req.password, "password is required")?;

        let record = self.load(user_id)?;
        if !verify_password(&password, &record.password_hash)? {
            return Err(ApiError::Unauthorized("password is incorrect".to_string()));
        }

        self.store.delete_user(user_id)?;
        Ok(())
    }

    fn load(&self, user_id: &str) -> Result<UserRecord, ApiError> {
        self.store
            .user_by_id(user_id)?
            .ok_or_else(|| ApiError::NotFound("user not found".to_string()))
    }
}

fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::Validation(message.to_string()))
}
