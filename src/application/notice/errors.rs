use thiserror::Error;

use crate::domain::CatalogRecordError;
use crate::ports::MailerError;

use super::notify_loans::BatchSummary;

/// 貸出1件の通知失敗
///
/// いずれもその貸出だけをスキップし、バケットの処理は続行する。
#[derive(Debug, Error)]
pub enum LoanNoticeError {
    /// 書誌レコードから書名を取り出せない
    #[error("undecodable catalog record")]
    Undecodable(#[source] CatalogRecordError),

    /// メール送信に失敗
    #[error("delivery failed")]
    Undeliverable(#[source] MailerError),
}

/// バケット処理を中断するエラー
#[derive(Debug, Error)]
pub enum NotifyError {
    /// リレーが認証を拒否した
    ///
    /// 以降の送信もすべて失敗するため、残りの貸出は処理しない。
    /// `summary`は中断までの処理結果。
    #[error("relay rejected authentication after {} of {} loans", .summary.processed(), .summary.selected)]
    RelayAuthentication {
        summary: BatchSummary,
        #[source]
        source: MailerError,
    },
}

/// 通知アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, NotifyError>;
