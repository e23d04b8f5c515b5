use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database. Hash, OTP and verification state never
/// leave the server in JSON.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub avatar_url: Option<String>,
    pub currency: String,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub verify_token: Option<Uuid>,
    #[serde(skip_serializing)]
    pub verify_token_expiry: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub reset_otp: Option<String>,
    #[serde(skip_serializing)]
    pub reset_otp_expiry: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Everything needed to insert a user row. Social accounts carry no
/// password hash.
#[derive(Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub verify_token: Option<Uuid>,
    pub verify_token_expiry: Option<OffsetDateTime>,
}

const USER_COLUMNS: &str = "id, name, email, password_hash, avatar_url, currency, \
     email_verified, verify_token, verify_token_expiry, reset_otp, reset_otp_expiry, \
     created_at, updated_at";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    pub async fn find_by_verify_token(db: &PgPool, token: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE verify_token = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(token)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    /// Create a new user.
    pub async fn create(db: &PgPool, new: &NewUser) -> anyhow::Result<User> {
        let sql = format!(
            "INSERT INTO users (name, email, password_hash, avatar_url, email_verified, \
             verify_token, verify_token_expiry) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&new.name)
            .bind(&new.email)
            .bind(new.password_hash.as_deref())
            .bind(new.avatar_url.as_deref())
            .bind(new.email_verified)
            .bind(new.verify_token)
            .bind(new.verify_token_expiry)
            .fetch_one(db)
            .await?;
        Ok(user)
    }

    /// Consume the verification token.
    pub async fn mark_verified(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET email_verified = TRUE, verify_token = NULL, verify_token_expiry = NULL,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Replace the verification token, e.g. when an unverified user tries
    /// to log in again.
    pub async fn refresh_verify_token(
        db: &PgPool,
        id: Uuid,
        token: Uuid,
        expiry: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET verify_token = $2, verify_token_expiry = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(expiry)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn set_reset_otp(
        db: &PgPool,
        id: Uuid,
        otp: &str,
        expiry: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_otp = $2, reset_otp_expiry = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(otp)
        .bind(expiry)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Store a fresh password hash and consume the OTP in one statement.
    pub async fn reset_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, reset_otp = NULL, reset_otp_expiry = NULL,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Partial profile update; absent fields keep their stored value.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        currency: Option<&str>,
        avatar_url: Option<&str>,
    ) -> anyhow::Result<User> {
        let sql = format!(
            "UPDATE users \
             SET name = COALESCE($2, name), currency = COALESCE($3, currency), \
                 avatar_url = COALESCE($4, avatar_url), updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(name)
            .bind(currency)
            .bind(avatar_url)
            .fetch_one(db)
            .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_never_serialize() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: "test@example.com".into(),
            password_hash: Some("$argon2id$...".into()),
            avatar_url: None,
            currency: "USD".into(),
            email_verified: false,
            verify_token: Some(Uuid::new_v4()),
            verify_token_expiry: None,
            reset_otp: Some("123456".into()),
            reset_otp_expiry: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("reset_otp"));
        assert!(!json.contains("123456"));
        assert!(!json.contains("verify_token"));
    }
}
