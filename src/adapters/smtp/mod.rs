pub mod mailer;

pub use mailer::Mailer as SmtpMailer;
