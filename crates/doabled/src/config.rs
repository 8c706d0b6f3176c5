//! Runtime configuration read from the environment

/// Log verbosity accepted in `LOG_LEVEL`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    /// Same verbosity as `Error`
    Fatal,
}

impl LogLevel {
    /// Parse a level name, case-insensitively; unknown names fall back to `Warn`
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            "fatal" => LogLevel::Fatal,
            _ => LogLevel::Warn,
        }
    }

    /// `EnvFilter` directive for this level
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error | LogLevel::Fatal => "error",
        }
    }

    /// Per-request access logging is only wanted while debugging
    pub fn enables_request_logging(self) -> bool {
        self == LogLevel::Debug
    }
}

/// Settings taken from the process environment
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub log_level: LogLevel,
}

impl Config {
    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, defaulting missing keys
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level = lookup("LOG_LEVEL")
            .map(|raw| LogLevel::parse(&raw))
            .unwrap_or_default();
        Self { log_level }
    }
}

/// Load `.env` from the working directory into the environment
///
/// Runs before logging is set up, so the outcome goes to stderr.
pub fn load_dotenv() -> bool {
    match dotenvy::dotenv() {
        Ok(_) => true,
        Err(_) => {
            eprintln!("CONFIG: no .env file loaded, using environment and defaults (LOG_LEVEL=WARN)");
            false
        }
    }
}
