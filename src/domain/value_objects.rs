use std::fmt;

/// 貸出ID - 貸出ストアの行識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoanId(i64);

impl LoanId {
    pub fn from_i64(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 日付比較演算子
///
/// 貸出選択の述語 `expected_return <演算子> target_date` を表す。
/// 比較は暦日単位で行い、時刻部分は無視する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateComparison {
    /// 対象日より前（延滞判定）
    Before,
    /// 対象日と同日
    Equal,
}

impl DateComparison {
    /// SQL演算子表現を取得する
    pub fn as_sql_operator(&self) -> &'static str {
        match self {
            DateComparison::Before => "<",
            DateComparison::Equal => "=",
        }
    }

    /// 返却予定日が対象日に対して述語を満たすか
    pub fn matches(&self, expected_return: chrono::NaiveDate, target: chrono::NaiveDate) -> bool {
        match self {
            DateComparison::Before => expected_return < target,
            DateComparison::Equal => expected_return == target,
        }
    }
}

impl fmt::Display for DateComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateComparison::Before => write!(f, "before"),
            DateComparison::Equal => write!(f, "equal"),
        }
    }
}
