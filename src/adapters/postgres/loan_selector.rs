use crate::config::DatabaseConfig;
use crate::domain::value_objects::{DateComparison, LoanId};
use crate::ports::loan_selector::{LoanRow, LoanSelector as LoanSelectorTrait, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use chrono_tz::Tz;
use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{Connection, PgConnection, Row};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// PostgreSQLの行データをLoanRowに変換する
///
/// 列の欠落や型不一致はパニックせずエラーとして返す。
fn map_row_to_loan(row: &PgRow) -> Result<LoanRow> {
    Ok(LoanRow {
        loan_id: LoanId::from_i64(row.try_get("loan_id")?),
        borrower_name: row.try_get("borrower_name")?,
        borrower_email: row.try_get("borrower_email")?,
        catalog_record: row.try_get("catalog_record")?,
        expected_return_date: row.try_get("expected_return_date")?,
    })
}

/// 比較演算子に応じた選択クエリを組み立てる
///
/// 暦日はセッションのタイムゾーンで求め、述語と取得列で同じ式を使う。
/// `relation`は設定読み込み時に識別子として検証済みであること。
fn build_select_query(relation: &str, comparison: DateComparison) -> String {
    format!(
        r#"
        SELECT
            loan_id,
            borrower_name,
            borrower_email,
            catalog_record,
            expected_return::date AS expected_return_date
        FROM {}
        WHERE expected_return::date {} $1
        "#,
        relation,
        comparison.as_sql_operator()
    )
}

/// 接続の解放を待つ（上限つき）
///
/// クエリがタイムアウトした接続は応答しないことがあるため、
/// 解放にも同じ上限を適用し、超えた場合は待たずに破棄する。
async fn release_connection<F, E>(close: F, limit: Duration)
where
    F: Future<Output = std::result::Result<(), E>>,
    E: std::fmt::Display,
{
    match timeout(limit, close).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "failed to close loan store connection cleanly");
        }
        Err(_) => {
            tracing::warn!(?limit, "closing loan store connection timed out, dropping it");
        }
    }
}

/// LoanSelectorのPostgreSQL実装
///
/// 呼び出しごとに専用の接続を確立し、クエリの成否に関わらず閉じる。
/// 接続はバケット間で共有しない。セッションのタイムゾーンは
/// 図書館のタイムゾーンに固定する。
pub struct LoanSelector {
    options: PgConnectOptions,
    relation: String,
    timeout: Duration,
}

impl LoanSelector {
    pub fn new(
        options: PgConnectOptions,
        relation: impl Into<String>,
        timezone: Tz,
        timeout: Duration,
    ) -> Self {
        Self {
            options: options.options([("timezone", timezone.name())]),
            relation: relation.into(),
            timeout,
        }
    }

    /// 設定から接続パラメータを組み立てる
    pub fn from_config(config: &DatabaseConfig, timezone: Tz) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name);

        Self::new(options, config.loans_relation.clone(), timezone, config.timeout)
    }
}

#[async_trait]
impl LoanSelectorTrait for LoanSelector {
    /// 返却予定日で貸出を選択する
    ///
    /// 接続・クエリ・解放それぞれに`timeout`を適用する。
    async fn select_loans(
        &self,
        comparison: DateComparison,
        target_date: NaiveDate,
    ) -> Result<Vec<LoanRow>> {
        let mut connection = timeout(self.timeout, PgConnection::connect_with(&self.options))
            .await
            .map_err(|_| format!("connection timed out after {:?}", self.timeout))??;

        let query = build_select_query(&self.relation, comparison);
        let fetched = timeout(
            self.timeout,
            sqlx::query(&query).bind(target_date).fetch_all(&mut connection),
        )
        .await;

        // クエリの成否に関わらず接続を解放する
        release_connection(connection.close(), self.timeout).await;

        let rows = fetched.map_err(|_| format!("query timed out after {:?}", self.timeout))??;

        rows.iter().map(map_row_to_loan).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_uses_comparison_operator() {
        let overdue = build_select_query("loans", DateComparison::Before);
        assert!(overdue.contains("FROM loans"));
        assert!(overdue.contains("expected_return::date < $1"));

        let due = build_select_query("circulation.loans", DateComparison::Equal);
        assert!(due.contains("FROM circulation.loans"));
        assert!(due.contains("expected_return::date = $1"));
    }

    #[test]
    fn test_query_returns_calendar_day_from_session_timezone() {
        let query = build_select_query("loans", DateComparison::Equal);
        assert!(query.contains("expected_return::date AS expected_return_date"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_gives_up_on_stalled_close() {
        let limit = Duration::from_secs(10);
        let started = tokio::time::Instant::now();

        release_connection(
            std::future::pending::<std::result::Result<(), sqlx::Error>>(),
            limit,
        )
        .await;

        assert!(started.elapsed() >= limit);
    }

    #[tokio::test]
    async fn test_release_reports_close_error_without_failing() {
        release_connection(
            async { Err::<(), _>(sqlx::Error::PoolClosed) },
            Duration::from_secs(1),
        )
        .await;
    }
}
