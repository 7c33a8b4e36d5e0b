use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Global crash log directory, set during init.
static CRASH_LOG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize tracing with stdout, optional rolling file, and Sentry layers.
///
/// - Stdout: compact, human-readable (journald captures it under systemd)
/// - File: daily-rolling `triage-agent.log` under `log_dir`, when configured
/// - Sentry: captures ERROR events as issues, WARN as breadcrumbs
/// - Default level: `level` (from `LOG_LEVEL`), override via RUST_LOG env
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the process.
pub fn init(level: &str, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},triage_agent={level}")));

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .compact();

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "triage-agent.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // No-op when Sentry DSN is not configured.
    let sentry_layer = sentry_tracing::layer().event_filter(|meta| match *meta.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .with(sentry_layer)
        .init();

    tracing::debug!("Tracing initialized");
    guard
}

/// Install a panic hook that writes crash details under `log_dir/crash_logs`
/// before handing off to the previous hook.
pub fn install_crash_hook(log_dir: &Path) {
    let crash_dir = log_dir.join("crash_logs");
    let _ = std::fs::create_dir_all(&crash_dir);
    CRASH_LOG_DIR.set(crash_dir).ok();

    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(dir) = CRASH_LOG_DIR.get() {
            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            let path = dir.join(format!("crash_{}.log", timestamp));

            let mut report = String::new();
            report.push_str(&format!(
                "=== TRIAGE AGENT CRASH REPORT ===\n\
                 Time: {}\n\
                 Version: {}\n\n",
                chrono::Local::now().to_rfc3339(),
                env!("CARGO_PKG_VERSION"),
            ));

            if let Some(msg) = info.payload().downcast_ref::<&str>() {
                report.push_str(&format!("Panic: {}\n", msg));
            } else if let Some(msg) = info.payload().downcast_ref::<String>() {
                report.push_str(&format!("Panic: {}\n", msg));
            } else {
                report.push_str("Panic: <unknown payload>\n");
            }

            if let Some(loc) = info.location() {
                report.push_str(&format!("Location: {}:{}:{}\n", loc.file(), loc.line(), loc.column()));
            }

            report.push_str(&format!("\nBacktrace:\n{}\n", std::backtrace::Backtrace::force_capture()));

            let thread = std::thread::current();
            report.push_str(&format!("\nThread: {:?} (id: {:?})\n", thread.name(), thread.id()));

            let _ = std::fs::write(&path, &report);
            eprintln!("[CRASH] Report written to: {}", path.display());
        }

        prev_hook(info);
    }));

    tracing::info!("Crash hook installed");
}
