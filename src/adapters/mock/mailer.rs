use crate::domain::notice::Notification;
use crate::ports::mailer::{Mailer as MailerTrait, MailerError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

/// Mock implementation of Mailer
///
/// Records every accepted notification instead of sending it.
/// Individual recipients can be made to fail, or the whole relay can reject authentication.
pub struct Mailer {
    sent: Mutex<Vec<Notification>>,
    rejected_recipients: Mutex<HashSet<String>>,
    reject_authentication: Mutex<bool>,
    attempts: Mutex<usize>,
}

impl Mailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            rejected_recipients: Mutex::new(HashSet::new()),
            reject_authentication: Mutex::new(false),
            attempts: Mutex::new(0),
        }
    }

    /// Make delivery to the given recipient fail
    pub fn reject_recipient(&self, recipient: &str) {
        self.rejected_recipients
            .lock()
            .unwrap()
            .insert(recipient.to_string());
    }

    /// Make every send fail with an authentication error
    pub fn reject_authentication(&self) {
        *self.reject_authentication.lock().unwrap() = true;
    }

    /// Notifications accepted so far
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of send calls, including failed ones
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

impl Default for Mailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailerTrait for Mailer {
    async fn send(&self, notification: &Notification) -> Result<(), MailerError> {
        *self.attempts.lock().unwrap() += 1;

        if *self.reject_authentication.lock().unwrap() {
            return Err(MailerError::Authentication(
                "535 5.7.8 authentication credentials invalid".to_string(),
            ));
        }

        if self
            .rejected_recipients
            .lock()
            .unwrap()
            .contains(&notification.recipient)
        {
            return Err(MailerError::Delivery(format!(
                "550 mailbox unavailable: {}",
                notification.recipient
            )));
        }

        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
