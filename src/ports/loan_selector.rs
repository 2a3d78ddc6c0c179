use crate::domain::value_objects::{DateComparison, LoanId};
use async_trait::async_trait;
use chrono::NaiveDate;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 貸出行（ストアからの読み取り専用ビュー）
///
/// 1回の通知で消費され、保持されない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanRow {
    pub loan_id: LoanId,
    pub borrower_name: String,
    pub borrower_email: String,
    /// ISO 2709形式の書誌レコード（生データ）
    pub catalog_record: String,
    /// 返却予定日（図書館のタイムゾーンでの暦日）
    ///
    /// 選択述語と同じタイムゾーンで求めた値であること。
    pub expected_return_date: NaiveDate,
}

/// 貸出選択ポート
///
/// 返却予定日に対する日付比較だけを契約とし、
/// クエリの組み立てやストアの種類はアダプターに委ねる。
#[async_trait]
pub trait LoanSelector: Send + Sync {
    /// `expected_return <comparison> target_date`を満たす貸出を取得する
    ///
    /// 比較は図書館のタイムゾーンでの暦日単位。該当する行はすべて、
    /// ちょうど1回ずつ返される。順序はストアの返す順序のまま。
    async fn select_loans(
        &self,
        comparison: DateComparison,
        target_date: NaiveDate,
    ) -> Result<Vec<LoanRow>>;
}
