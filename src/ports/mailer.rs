use crate::domain::notice::Notification;
use async_trait::async_trait;
use thiserror::Error;

/// メール送信のエラー
#[derive(Debug, Error)]
pub enum MailerError {
    /// 宛先または送信元アドレスが不正
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// メッセージの組み立てに失敗
    #[error("failed to build message: {0}")]
    Build(String),

    /// リレーが認証を拒否した
    ///
    /// 以降のすべての送信に影響するため、呼び出し側は残りの送信を中止する。
    #[error("relay rejected authentication: {0}")]
    Authentication(String),

    /// 接続・TLS・送信のいずれかで失敗
    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl MailerError {
    /// 以降の送信もすべて失敗するエラーか
    pub fn is_fatal_for_queue(&self) -> bool {
        matches!(self, MailerError::Authentication(_))
    }
}

/// メール送信ポート
///
/// 1通ごとにセッションを確立し、送信の成否に関わらず閉じる。
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), MailerError>;
}
