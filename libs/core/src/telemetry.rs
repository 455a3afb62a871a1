use clap::ValueEnum;
use tracing_subscriber::{fmt, EnvFilter};

/// Log output format, selectable on both binaries via `--log-format`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Initialize the global tracing subscriber. `log_filter` is an `EnvFilter` directive string
/// (e.g. `"info"`, `"tenantbind_core=debug,info"`).
pub fn init(log_filter: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_new(log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);
    match format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}
