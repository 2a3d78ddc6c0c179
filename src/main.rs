use library_loan_notifier::{
    adapters::{dry_run::DryRunMailer, postgres::PostgresLoanSelector, smtp::SmtpMailer},
    application::notice::{JobDependencies, run_notification_job},
    config::Config,
    domain::local_date,
    ports::Mailer,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_loan_notifier=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 設定エラーはクエリ実行前に終了する
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(?config, "configuration loaded");

    let mailer: Arc<dyn Mailer> = if config.dry_run {
        tracing::warn!("dry run enabled, notifications will only be logged");
        Arc::new(DryRunMailer::new())
    } else {
        match SmtpMailer::new(config.smtp.clone()) {
            Ok(mailer) => Arc::new(mailer),
            Err(e) => {
                tracing::error!(error = %e, "invalid mail configuration");
                return ExitCode::FAILURE;
            }
        }
    };

    let deps = JobDependencies {
        loan_selector: Arc::new(PostgresLoanSelector::from_config(
            &config.database,
            config.timezone,
        )),
        mailer,
    };

    // 基準日は起動時に一度だけ、図書館のタイムゾーンで決める
    let today = local_date(chrono::Utc::now(), &config.timezone);
    tracing::info!(%today, timezone = %config.timezone, "reference date");
    let report = run_notification_job(&deps, today).await;

    match serde_json::to_string(&report) {
        Ok(summary) => tracing::info!(%summary, "notification run finished"),
        Err(e) => tracing::warn!(error = %e, "failed to serialize run report"),
    }

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
