use chainlens_core::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directive used when `RUST_LOG` is unset: our crates at the configured level, everything
/// else at `warn`.
fn default_directive(level: &str) -> String {
    format!("warn,chainlens_core={level},server={level},chainlens={level}")
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    match std::env::var("RUST_LOG") {
        Ok(level) if level == "debug" || level == "trace" => {
            EnvFilter::new(default_directive(&level))
        }
        Ok(_) => EnvFilter::try_from_env("RUST_LOG")
            .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level))),
        Err(_) => EnvFilter::new(default_directive(&config.level)),
    }
}

/// Installs the global tracing subscriber.
///
/// `logging.format = "json"` emits one JSON object per line; anything else uses the
/// human-readable pretty formatter.
pub fn init_logging(config: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(build_filter(config));

    if config.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}
