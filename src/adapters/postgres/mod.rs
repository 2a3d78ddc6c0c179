pub mod loan_selector;

// パブリックに型を再エクスポート
pub use loan_selector::LoanSelector as PostgresLoanSelector;
