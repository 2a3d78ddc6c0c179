pub mod loan_selector;
pub mod mailer;

pub use loan_selector::*;
pub use mailer::*;
