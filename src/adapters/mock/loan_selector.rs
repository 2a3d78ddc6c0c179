use crate::domain::value_objects::DateComparison;
use crate::ports::loan_selector::{LoanRow, LoanSelector as LoanSelectorTrait, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Mutex;

/// LoanSelectorのモック実装
///
/// 登録された貸出をメモリに保持し、返却予定日（暦日）で選択する。
/// 特定の(比較演算子, 対象日)の組で失敗させることもできる。
pub struct LoanSelector {
    loans: Mutex<Vec<LoanRow>>,
    failing_queries: Mutex<Vec<(DateComparison, NaiveDate)>>,
    calls: Mutex<Vec<(DateComparison, NaiveDate)>>,
}

impl LoanSelector {
    pub fn new() -> Self {
        Self {
            loans: Mutex::new(Vec::new()),
            failing_queries: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// テスト用に貸出を登録
    pub fn add_loan(&self, loan: LoanRow) {
        self.loans.lock().unwrap().push(loan);
    }

    /// 指定したクエリでストア障害を発生させる
    pub fn fail_on(&self, comparison: DateComparison, target_date: NaiveDate) {
        self.failing_queries
            .lock()
            .unwrap()
            .push((comparison, target_date));
    }

    /// これまでに受けた呼び出し
    pub fn calls(&self) -> Vec<(DateComparison, NaiveDate)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for LoanSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoanSelectorTrait for LoanSelector {
    async fn select_loans(
        &self,
        comparison: DateComparison,
        target_date: NaiveDate,
    ) -> Result<Vec<LoanRow>> {
        self.calls.lock().unwrap().push((comparison, target_date));

        if self
            .failing_queries
            .lock()
            .unwrap()
            .contains(&(comparison, target_date))
        {
            return Err(format!("loan store unavailable ({} {})", comparison, target_date).into());
        }

        Ok(self
            .loans
            .lock()
            .unwrap()
            .iter()
            .filter(|loan| comparison.matches(loan.expected_return_date, target_date))
            .cloned()
            .collect())
    }
}
