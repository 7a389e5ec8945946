use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "schoold=warn";
const LOG_ENV: &str = "SCHOOLD_LOG";

/// Resolves the filter directive: explicit level first, then `SCHOOLD_LOG`,
/// then the default. A bare level is scoped to this crate.
pub fn filter_directive(log_level: Option<&str>, env_value: Option<&str>) -> String {
    match log_level.map(str::trim).filter(|s| !s.is_empty()) {
        Some(level) if level.contains('=') => level.to_string(),
        Some(level) => format!("schoold={}", level),
        None => env_value
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_FILTER.to_string()),
    }
}

/// Installs the global subscriber. Everything goes to stderr; stdout carries
/// the protocol.
pub fn init_tracing(log_level: Option<&str>, log_json: bool) -> anyhow::Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let directive = filter_directive(log_level, env_value.as_deref());
    let filter = EnvFilter::try_new(&directive)
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    let registry = tracing_subscriber::registry().with(filter);
    if log_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    }
    Ok(())
}
