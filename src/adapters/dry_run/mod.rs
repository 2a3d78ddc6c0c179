use crate::domain::notice::Notification;
use crate::ports::mailer::{Mailer as MailerTrait, MailerError};
use async_trait::async_trait;

/// 送信せずにログ出力だけ行うMailer
///
/// 本番リレーに接続せず、通知内容を確認するためのリハーサル用。
#[derive(Debug, Default)]
pub struct DryRunMailer;

impl DryRunMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MailerTrait for DryRunMailer {
    async fn send(&self, notification: &Notification) -> Result<(), MailerError> {
        tracing::info!(
            recipient = %notification.recipient,
            body = %notification.body,
            "dry run: notification not sent"
        );
        Ok(())
    }
}
