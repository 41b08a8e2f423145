use anyhow::Result;
use tracing::info;

/// Seam for outbound mail. Actual delivery (SMTP, a provider API) lives in an
/// external subsystem; the runner only needs something it can hand a message
/// to and retry on failure.
pub trait Mailer: Send + Sync {
    fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<()>;
}

/// Default mailer that records sends in the log. Used in development and as
/// the stand-in until a transport is wired up.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<()> {
        info!(
            "Mail to {} recipient(s): subject='{}' ({} bytes)",
            recipients.len(),
            subject,
            body.len()
        );
        Ok(())
    }
}
