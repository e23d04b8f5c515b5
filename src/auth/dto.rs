use bytes::Bytes;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::User;

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for starting a password reset.
#[derive(Debug, Deserialize)]
pub struct ForgotRequest {
    pub email: String,
}

/// Request body for completing a password reset.
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
    pub otp: String,
    pub password: String,
}

/// Request body for social login with a Google ID token.
#[derive(Debug, Deserialize)]
pub struct GoogleLoginRequest {
    pub token: String,
}

/// Response returned after register, login or google login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub currency: String,
    pub email_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            avatar_url: u.avatar_url,
            currency: u.currency,
            email_verified: u.email_verified,
            created_at: u.created_at,
        }
    }
}

/// A file pulled out of a multipart field.
#[derive(Debug)]
pub struct UploadedFile {
    pub body: Bytes,
    pub content_type: String,
}

/// Fields collected from the multipart register form.
#[derive(Debug, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<UploadedFile>,
}

/// Fields collected from the multipart profile update form.
#[derive(Debug, Default)]
pub struct ProfileForm {
    pub name: Option<String>,
    pub currency: Option<String>,
    pub avatar: Option<UploadedFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_response_serialization() {
        let response = AuthResponse {
            token: "signed.jwt.here".into(),
            user: PublicUser {
                id: Uuid::new_v4(),
                name: "Test".into(),
                email: "test@example.com".into(),
                avatar_url: None,
                currency: "USD".into(),
                email_verified: true,
                created_at: OffsetDateTime::UNIX_EPOCH,
            },
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("signed.jwt.here"));
        assert!(json.contains("test@example.com"));
        assert!(json.contains("1970-01-01T00:00:00Z"));
    }
}
