use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// How the process is being run; release switches logs to JSON lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    Debug,
    Release,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Debug => "debug",
            RunMode::Release => "release",
        }
    }
}

/// Level used when neither `--level` nor `LOG_LEVEL` is given.
pub fn default_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// `RUST_LOG` wins when set; otherwise every crate logs at `level`.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

pub fn init(mode: RunMode, level: &str) {
    let filter = env_filter(level);
    match mode {
        RunMode::Release => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init(),
        RunMode::Debug => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
    }
}
