use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

use crate::domain::NoticeKind;
use crate::ports::{LoanSelector, Mailer};

use super::errors::NotifyError;
use super::notify_loans::{BatchSummary, notify_loans};

/// ジョブの依存関係
///
/// 関数型の原則に従い、振る舞いを持たないデータ構造として定義する。
#[derive(Clone)]
pub struct JobDependencies {
    pub loan_selector: Arc<dyn LoanSelector>,
    pub mailer: Arc<dyn Mailer>,
}

/// バケットの処理結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BucketOutcome {
    /// 今日は処理対象外（延滞通知は毎月1日と15日のみ）
    Skipped,
    /// 先行バケットでリレー認証が拒否されたため未処理
    NotAttempted,
    /// 貸出の選択に失敗
    SelectionFailed { error: String },
    /// 全件処理した
    Completed(BatchSummary),
    /// リレー認証の拒否により途中で中断した
    Aborted(BatchSummary),
}

impl BucketOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            BucketOutcome::NotAttempted
                | BucketOutcome::SelectionFailed { .. }
                | BucketOutcome::Aborted(_)
        )
    }

    pub fn sent(&self) -> usize {
        match self {
            BucketOutcome::Completed(summary) | BucketOutcome::Aborted(summary) => summary.sent,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketReport {
    pub kind: NoticeKind,
    pub target_date: NaiveDate,
    pub outcome: BucketOutcome,
}

/// 1回の実行結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub today: NaiveDate,
    pub buckets: Vec<BucketReport>,
}

impl JobReport {
    /// すべてのバケットが選択に成功し、中断されなかったか
    ///
    /// 貸出単位の解読・送信失敗はログで回復済みとみなし、成否に影響しない。
    pub fn is_success(&self) -> bool {
        !self.buckets.iter().any(|bucket| bucket.outcome.is_failure())
    }

    pub fn total_sent(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.outcome.sent()).sum()
    }

    pub fn bucket(&self, kind: NoticeKind) -> Option<&BucketReport> {
        self.buckets.iter().find(|bucket| bucket.kind == kind)
    }
}

/// 通知ジョブを1回実行する
///
/// 処理順序：
/// 1. 延滞（毎月1日と15日のみ）
/// 2. 3日後に返却期限
/// 3. 本日が返却期限
///
/// バケットは互いに独立しており、あるバケットの選択失敗は
/// 他のバケットの処理を妨げない。リレー認証の拒否のみ、
/// 以降の全送信が失敗するため残りのバケットを処理しない。
///
/// # 引数
/// * `deps` - ジョブの依存関係
/// * `today` - 基準日（選択・延滞日数・スケジュール判定のすべてに使う）
pub async fn run_notification_job(deps: &JobDependencies, today: NaiveDate) -> JobReport {
    let mut buckets = Vec::with_capacity(NoticeKind::RUN_ORDER.len());
    let mut relay_rejected = false;

    for kind in NoticeKind::RUN_ORDER {
        let comparison = kind.comparison();
        let target_date = kind.target_date(today);

        let outcome = if relay_rejected {
            BucketOutcome::NotAttempted
        } else if !kind.is_scheduled_on(today) {
            tracing::info!(bucket = kind.as_str(), %today, "bucket not scheduled today");
            BucketOutcome::Skipped
        } else {
            match deps.loan_selector.select_loans(comparison, target_date).await {
                Err(e) => {
                    tracing::error!(
                        bucket = kind.as_str(),
                        %comparison,
                        %target_date,
                        error = %e,
                        "failed to select loans"
                    );
                    BucketOutcome::SelectionFailed {
                        error: e.to_string(),
                    }
                }
                Ok(loans) => {
                    tracing::info!(
                        bucket = kind.as_str(),
                        %target_date,
                        count = loans.len(),
                        "loans selected"
                    );
                    match notify_loans(deps.mailer.as_ref(), kind, &loans, today).await {
                        Ok(summary) => BucketOutcome::Completed(summary),
                        Err(NotifyError::RelayAuthentication { summary, .. }) => {
                            relay_rejected = true;
                            BucketOutcome::Aborted(summary)
                        }
                    }
                }
            }
        };

        buckets.push(BucketReport {
            kind,
            target_date,
            outcome,
        });
    }

    JobReport { today, buckets }
}
