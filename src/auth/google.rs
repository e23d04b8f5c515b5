use serde::Deserialize;
use tracing::warn;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Subset of Google's tokeninfo response we care about.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleTokenInfo {
    pub aud: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl GoogleTokenInfo {
    pub fn audience_matches(&self, client_id: &str) -> bool {
        self.aud == client_id
    }

    /// Falls back to the mailbox local part when Google sends no name.
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Asks Google whether the ID token is genuine and was minted for us.
pub async fn verify_id_token(client_id: &str, id_token: &str) -> anyhow::Result<GoogleTokenInfo> {
    let info: GoogleTokenInfo = reqwest::Client::new()
        .get(TOKENINFO_URL)
        .query(&[("id_token", id_token)])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if !info.audience_matches(client_id) {
        warn!(aud = %info.aud, "google token audience mismatch");
        anyhow::bail!("token audience mismatch");
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "iss": "https://accounts.google.com",
        "aud": "client-123.apps.googleusercontent.com",
        "sub": "110169484474386276334",
        "email": "jane.doe@example.com",
        "email_verified": "true",
        "name": "Jane Doe",
        "picture": "https://lh3.googleusercontent.com/a/photo.jpg",
        "exp": "1700000000"
    }"#;

    #[test]
    fn parses_tokeninfo_payload() {
        let info: GoogleTokenInfo = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(info.email, "jane.doe@example.com");
        assert_eq!(info.name.as_deref(), Some("Jane Doe"));
        assert!(info.audience_matches("client-123.apps.googleusercontent.com"));
        assert!(!info.audience_matches("another-client"));
    }

    #[test]
    fn display_name_falls_back_to_mailbox() {
        let info: GoogleTokenInfo =
            serde_json::from_str(r#"{"aud":"a","email":"sam@example.com"}"#).unwrap();
        assert_eq!(info.display_name(), "sam");

        let info: GoogleTokenInfo =
            serde_json::from_str(r#"{"aud":"a","email":"sam@example.com","name":"  "}"#).unwrap();
        assert_eq!(info.display_name(), "sam");
    }
}
