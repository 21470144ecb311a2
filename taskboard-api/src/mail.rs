/// Outgoing mail
///
/// Account flows hand their mails to a [`Mailer`]. The server ships with
/// [`LogMailer`], which writes each mail to the log; a real transport plugs in
/// by implementing the trait. Delivery failures are logged by [`deliver`] and
/// never fail the request that triggered them.
///
/// # Example
///
/// ```
/// use taskboard_api::mail::{verification_mail, LogMailer, Mailer};
///
/// # async fn example() {
/// let mailer = LogMailer;
/// let mail = verification_mail(
///     "ada@example.com",
///     "ada",
///     "http://localhost:8080/api/v1/auth/verify-email/abc123",
/// );
/// mailer.send(mail).await.unwrap();
/// # }
/// ```

use async_trait::async_trait;
use tokio::sync::Mutex;

/// A plain-text mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Transport rejected or failed the mail
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// Mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Transport name, for logs
    fn name(&self) -> &str;

    /// Sends one mail
    async fn send(&self, mail: Mail) -> Result<(), MailError>;
}

/// Writes mails to the log instead of sending them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        tracing::info!(
            to = %mail.to,
            subject = %mail.subject,
            body = %mail.body,
            "Mail sent"
        );
        Ok(())
    }
}

/// Keeps sent mails in memory
///
/// Lets tests read the links the server would have mailed.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Mail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mails sent so far, oldest first
    pub async fn sent(&self) -> Vec<Mail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        self.sent.lock().await.push(mail);
        Ok(())
    }
}

/// Sends a mail, logging instead of returning failures
pub async fn deliver(mailer: &dyn Mailer, mail: Mail) {
    let to = mail.to.clone();
    let subject = mail.subject.clone();

    if let Err(e) = mailer.send(mail).await {
        tracing::error!(
            error = %e,
            mailer = mailer.name(),
            to = %to,
            subject = %subject,
            "Failed to send mail"
        );
    }
}

/// Mail carrying the email verification link
pub fn verification_mail(to: &str, username: &str, verification_url: &str) -> Mail {
    Mail {
        to: to.to_string(),
        subject: "Please verify your email".to_string(),
        body: format!(
            "Hi {username},\n\n\
             Welcome to Taskboard! To verify your email, open this link:\n\n\
             {verification_url}\n\n\
             The link expires in 20 minutes.\n"
        ),
    }
}

/// Mail carrying the password reset link
pub fn password_reset_mail(to: &str, username: &str, reset_url: &str) -> Mail {
    Mail {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        body: format!(
            "Hi {username},\n\n\
             We got a request to reset the password of your account. To choose a new one, \
             open this link:\n\n\
             {reset_url}\n\n\
             The link expires in 20 minutes. If you did not ask for this, ignore this mail.\n"
        ),
    }
}
