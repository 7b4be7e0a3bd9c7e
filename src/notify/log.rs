use async_trait::async_trait;

use super::{Mail, Notifier, NotifyError};

/// Development notifier: writes the message to the log instead of sending it
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, mail: Mail) -> Result<(), NotifyError> {
        tracing::info!(
            from = %mail.from,
            to = %mail.to,
            subject = %mail.subject,
            "Mail not sent (no MAIL_API_URL configured):\n{}",
            mail.text
        );
        Ok(())
    }
}
