//! Tracing setup shared by the pipeline binaries.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global subscriber. `LOG_FORMAT=json` switches to
/// structured output; `RUST_LOG` filters as usual, defaulting to info
/// for this workspace.
pub fn init_logging() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vidsop_media=info,vidsop_pipeline=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(env_filter)
            .init();
    }
}
