use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{Mail, Notifier, NotifyError};

/// Keeps every message in memory; can be switched into a failing mode
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Mail>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, mail: Mail) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("mail relay unavailable".to_string()));
        }
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).push(mail);
        Ok(())
    }
}
