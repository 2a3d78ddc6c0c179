pub mod dry_run;
pub mod mock;
pub mod postgres;
pub mod smtp;
