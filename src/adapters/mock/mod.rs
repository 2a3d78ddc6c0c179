pub mod loan_selector;
pub mod mailer;

pub use loan_selector::LoanSelector;
pub use mailer::Mailer;
