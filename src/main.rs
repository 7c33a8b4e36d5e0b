use std::process::ExitCode;

use triage_agent::config::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before anything reads the environment.
    let _ = dotenvy::dotenv();

    // Returns a no-op guard when SENTRY_DSN is absent (local dev).
    let _sentry_guard = sentry::init(sentry_options());

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match triage_agent::run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Fatal: {}", e);
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn sentry_options() -> sentry::ClientOptions {
    sentry::ClientOptions {
        dsn: std::env::var("SENTRY_DSN").ok().and_then(|s| s.parse().ok()),
        release: Some(env!("CARGO_PKG_VERSION").into()),
        traces_sample_rate: 0.0,
        send_default_pii: false,
        before_send: Some(std::sync::Arc::new(|mut event| {
            // Ticket payloads may carry customer text.
            if let Some(ref mut request) = event.request {
                request.data = None;
            }
            Some(event)
        })),
        ..Default::default()
    }
}
