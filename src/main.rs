//! Channel digest service: binary entrypoint.
//! Boots the Axum HTTP server with the digest pipeline, CORS and `/metrics`.

use channel_digest::api::{self, AppState};
use channel_digest::metrics::Metrics;
use shuttle_axum::ShuttleAxum;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - DIGEST_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("DIGEST_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("channel_digest=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // DIGEST_CONFIG_PATH, DIGEST_* overrides and MISTRAL_API_KEY may come from there.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let state = AppState::bootstrap()?;
    let metrics = Metrics::init(state.pipeline.current().config())?;

    if std::env::var("DIGEST_AI_PROBE").is_ok_and(|v| v == "1") {
        let limits = state.pipeline.current().config().analysis.clone();
        tokio::spawn(async move {
            if let Err(e) = channel_digest::run_ai_quick_probe(&limits).await {
                warn!(error = ?e, "analysis quick probe didn't run");
            }
        });
    }

    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
