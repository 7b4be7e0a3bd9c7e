//! Outbound email.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub mod http;
pub mod log;
pub mod recording;

pub use http::HttpMailer;
pub use log::LogNotifier;
pub use recording::RecordingNotifier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Mail API rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), NotifyError>;
}
