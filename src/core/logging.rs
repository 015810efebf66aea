use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn,hyper=warn,reqwest=warn,html5ever=error";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Console output goes to stderr so the query console can own stdout.
/// Each binary writes its own daily file (`server.log`, `indexer.log`, ...)
/// under the shared log dir. Safe to call more than once.
pub fn init(paths: &AppPaths, file_name: &str) {
    if let Err(e) = std::fs::create_dir_all(&paths.log_dir) {
        eprintln!("cannot create log dir {}: {}", paths.log_dir.display(), e);
    }

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&paths.log_dir, file_name));
    if LOG_GUARD.set(guard).is_err() {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let file = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init();
}
