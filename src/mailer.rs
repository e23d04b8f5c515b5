use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("failed to build email message: {0}")]
    MessageBuild(String),
    #[error("failed to send email: {0}")]
    SendFailed(String),
    #[error("mailer configuration error: {0}")]
    Config(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

/// Delivers through an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)?
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .build();
        Ok(Self {
            transport,
            from: cfg.from.clone(),
        })
    }
}

pub fn build_message(from: &str, to: &str, subject: &str, html: &str) -> Result<Message, MailError> {
    Message::builder()
        .from(from
            .parse()
            .map_err(|e| MailError::Config(format!("invalid from address: {e}")))?)
        .to(to
            .parse()
            .map_err(|e| MailError::MessageBuild(format!("invalid recipient: {e}")))?)
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(html.to_string())
        .map_err(|e| MailError::MessageBuild(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        let message = build_message(&self.from, to, subject, html)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::SendFailed(e.to_string()))?;
        Ok(())
    }
}

/// Logs instead of sending. Used in development and tests when no SMTP
/// relay is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        info!(%to, %subject, "email (not sent, no SMTP configured)");
        info!("   body: {}", html);
        Ok(())
    }
}

// --- message bodies ---

pub fn verification_email(link: &str) -> (&'static str, String) {
    let html = format!(
        r#"<h2>Email Verification</h2>
<p>Click to verify your account</p>
<a href="{link}">
<button style="padding:10px;background:purple;color:white;border:none;border-radius:5px">
Verify Email
</button>
</a>
<p>If button not working paste this link:</p>
<p>{link}</p>"#
    );
    ("Verify Email", html)
}

pub fn reset_otp_email(otp: &str) -> (&'static str, String) {
    ("Reset OTP", format!("<h2>Your OTP is {otp}</h2>"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        LogMailer
            .send("user@example.com", "Hello", "<p>hi</p>")
            .await
            .expect("log mailer never fails");
    }

    #[test]
    fn verification_email_contains_link() {
        let link = "http://localhost:8080/api/auth/verify/abc";
        let (subject, html) = verification_email(link);
        assert_eq!(subject, "Verify Email");
        assert!(html.matches(link).count() >= 2);
    }

    #[test]
    fn reset_otp_email_contains_code() {
        let (subject, html) = reset_otp_email("123456");
        assert_eq!(subject, "Reset OTP");
        assert!(html.contains("123456"));
    }

    #[test]
    fn build_message_accepts_named_mailbox() {
        let msg = build_message(
            "Expense Tracker <no-reply@localhost>",
            "user@example.com",
            "Reset OTP",
            "<h2>Your OTP is 000000</h2>",
        );
        assert!(msg.is_ok());
    }

    #[test]
    fn build_message_rejects_bad_recipient() {
        let err = build_message("no-reply@localhost", "not-an-address", "s", "b").unwrap_err();
        assert!(matches!(err, MailError::MessageBuild(_)));
    }
}
