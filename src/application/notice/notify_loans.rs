use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{self, NoticeFields, NoticeKind, Notification};
use crate::ports::{LoanRow, Mailer};

use super::errors::{LoanNoticeError, NotifyError, Result};

/// バケット1つ分の処理結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// 選択された貸出の件数
    pub selected: usize,
    /// 送信できた件数
    pub sent: usize,
    /// 書誌レコードを解読できずスキップした件数
    pub undecodable: usize,
    /// 送信に失敗した件数
    pub undeliverable: usize,
}

impl BatchSummary {
    /// 処理を終えた貸出の件数
    pub fn processed(&self) -> usize {
        self.sent + self.undecodable + self.undeliverable
    }
}

/// 貸出1件から通知を組み立てる（純粋な関数）
///
/// 1. 書誌レコードから書名を取り出す
/// 2. 延滞日数を計算する
/// 3. 種類に応じたテンプレートで本文を組み立てる
///
/// # エラー
/// 書誌レコードが解読できない場合は`LoanNoticeError::Undecodable`
pub fn build_notification(
    kind: NoticeKind,
    loan: &LoanRow,
    today: NaiveDate,
) -> std::result::Result<Notification, LoanNoticeError> {
    let book_title = domain::catalog_record::book_title(&loan.catalog_record)
        .map_err(LoanNoticeError::Undecodable)?;
    let expected_return = loan.expected_return_date;

    let fields = NoticeFields {
        name: loan.borrower_name.clone(),
        email_addr: loan.borrower_email.clone(),
        book_title,
        expiration_date: domain::format_expiration_date(expected_return),
        days_late: domain::days_late(today, expected_return),
    };

    Ok(Notification {
        recipient: loan.borrower_email.clone(),
        body: domain::render(kind, &fields),
    })
}

/// 貸出ごとに通知を送信する
///
/// 各貸出は独立して処理される。書名の解読失敗や送信失敗は
/// その貸出のみスキップしてログに記録し、次の貸出へ進む。
/// バケットをまたいだ重複排除は行わない。
///
/// # エラー
/// リレーが認証を拒否した場合は、残りの貸出を処理せず
/// `NotifyError::RelayAuthentication`を返す。
pub async fn notify_loans(
    mailer: &dyn Mailer,
    kind: NoticeKind,
    loans: &[LoanRow],
    today: NaiveDate,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary {
        selected: loans.len(),
        ..BatchSummary::default()
    };

    for loan in loans {
        let notification = match build_notification(kind, loan, today) {
            Ok(notification) => notification,
            Err(e) => {
                tracing::warn!(
                    bucket = kind.as_str(),
                    loan_id = %loan.loan_id,
                    error = %e,
                    reason = ?std::error::Error::source(&e),
                    "skipping loan"
                );
                summary.undecodable += 1;
                continue;
            }
        };

        match mailer.send(&notification).await {
            Ok(()) => {
                tracing::info!(
                    bucket = kind.as_str(),
                    loan_id = %loan.loan_id,
                    recipient = %notification.recipient,
                    "notification sent"
                );
                summary.sent += 1;
            }
            Err(e) if e.is_fatal_for_queue() => {
                tracing::error!(
                    bucket = kind.as_str(),
                    loan_id = %loan.loan_id,
                    error = %e,
                    "relay rejected authentication, abandoning remaining notifications"
                );
                return Err(NotifyError::RelayAuthentication { summary, source: e });
            }
            Err(e) => {
                let e = LoanNoticeError::Undeliverable(e);
                tracing::warn!(
                    bucket = kind.as_str(),
                    loan_id = %loan.loan_id,
                    recipient = %notification.recipient,
                    error = %e,
                    reason = ?std::error::Error::source(&e),
                    "notification not delivered"
                );
                summary.undeliverable += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::Mailer as MockMailer;
    use crate::domain::LoanId;
    use crate::domain::catalog_record::fixtures::record_with_title;
    use crate::domain::local_date;
    use chrono::{TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
    }

    fn loan(id: i64, email: &str, catalog_record: String, due: (i32, u32, u32)) -> LoanRow {
        LoanRow {
            loan_id: LoanId::from_i64(id),
            borrower_name: format!("Borrower {}", id),
            borrower_email: email.to_string(),
            catalog_record,
            expected_return_date: NaiveDate::from_ymd_opt(due.0, due.1, due.2).unwrap(),
        }
    }

    #[test]
    fn test_build_overdue_notification() {
        let row = loan(1, "ana@x.com", record_with_title("Dune /"), (2024, 1, 1));
        let notification = build_notification(NoticeKind::Overdue, &row, today()).unwrap();

        assert_eq!(notification.recipient, "ana@x.com");
        assert!(notification.body.contains("Borrower 1"));
        assert!(notification.body.contains("\"Dune\""));
        assert!(notification.body.contains("01/01/2024"));
        assert!(notification.body.contains("4 day(s) overdue"));
    }

    #[test]
    fn test_evening_return_keeps_library_calendar_day() {
        // 2024-03-14 22:00 -03:00
        let instant = Utc.with_ymd_and_hms(2024, 3, 15, 1, 0, 0).unwrap();
        let mut row = loan(1, "ana@x.com", record_with_title("Dune /"), (2024, 1, 1));
        row.expected_return_date = local_date(instant, &chrono_tz::America::Sao_Paulo);
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

        let notification = build_notification(NoticeKind::Overdue, &row, today).unwrap();

        assert!(notification.body.contains("14/03/2024"));
        assert!(notification.body.contains("1 day(s) overdue"));
    }

    #[test]
    fn test_build_notification_rejects_malformed_record() {
        let row = loan(2, "ana@x.com", "garbage".to_string(), (2024, 1, 5));
        let result = build_notification(NoticeKind::DueToday, &row, today());
        assert!(matches!(result, Err(LoanNoticeError::Undecodable(_))));
    }

    #[tokio::test]
    async fn test_undeliverable_loan_does_not_stop_batch() {
        let mailer = MockMailer::new();
        mailer.reject_recipient("bad@x.com");
        let loans = vec![
            loan(1, "a@x.com", record_with_title("Dune /"), (2024, 1, 5)),
            loan(2, "bad@x.com", record_with_title("Emma /"), (2024, 1, 5)),
            loan(3, "c@x.com", record_with_title("Ulysses /"), (2024, 1, 5)),
        ];

        let summary = notify_loans(&mailer, NoticeKind::DueToday, &loans, today())
            .await
            .unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                selected: 3,
                sent: 2,
                undecodable: 0,
                undeliverable: 1,
            }
        );
        let recipients: Vec<_> = mailer.sent().into_iter().map(|n| n.recipient).collect();
        assert_eq!(recipients, vec!["a@x.com", "c@x.com"]);
    }

    #[tokio::test]
    async fn test_authentication_failure_abandons_remaining_loans() {
        let mailer = MockMailer::new();
        mailer.reject_authentication();
        let loans = vec![
            loan(1, "a@x.com", record_with_title("Dune /"), (2024, 1, 5)),
            loan(2, "b@x.com", record_with_title("Emma /"), (2024, 1, 5)),
        ];

        let result = notify_loans(&mailer, NoticeKind::DueToday, &loans, today()).await;

        match result {
            Err(NotifyError::RelayAuthentication { summary, .. }) => {
                assert_eq!(summary.selected, 2);
                assert_eq!(summary.processed(), 0);
            }
            other => panic!("expected authentication failure, got {:?}", other),
        }
        assert_eq!(mailer.attempts(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let mailer = MockMailer::new();
        let summary = notify_loans(&mailer, NoticeKind::Overdue, &[], today())
            .await
            .unwrap();
        assert_eq!(summary, BatchSummary::default());
        assert_eq!(mailer.attempts(), 0);
    }
}
