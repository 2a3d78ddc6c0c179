mod errors;
mod notification_job;
mod notify_loans;

pub use errors::{LoanNoticeError, NotifyError, Result};
pub use notification_job::{
    BucketOutcome, BucketReport, JobDependencies, JobReport, run_notification_job,
};
pub use notify_loans::{BatchSummary, build_notification, notify_loans};
