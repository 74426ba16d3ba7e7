use serde::Deserialize;
use std::env;
use std::time::Duration;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

pub const DEFAULT_ENGINE_PROGRAM: &str = "python";
pub const DEFAULT_ENGINE_SCRIPT: &str = "ocr.py";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

/// Where the OCR engine lives and how long it may run.
///
/// `script` is passed as the first argument to `program` when set, which is
/// how interpreter-hosted engines (`python ocr.py ...`) are launched. With no
/// script, `program` is the engine executable itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    pub program: String,
    pub script: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl EngineConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            script: None,
            timeout_secs: None,
        }
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Zero is treated the same as "no timeout".
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    fn from_env() -> Self {
        let script = match env::var("OCR_ENGINE_SCRIPT") {
            Ok(val) if val.trim().is_empty() => None,
            Ok(val) => Some(val),
            Err(_) => Some(DEFAULT_ENGINE_SCRIPT.to_string()),
        };

        Self {
            program: env::var("OCR_ENGINE_PROGRAM")
                .unwrap_or_else(|_| DEFAULT_ENGINE_PROGRAM.to_string()),
            script,
            timeout_secs: parse_env_opt("OCR_TIMEOUT_SECS"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("OCRBRIDGE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("OCRBRIDGE_PORT", 5000),
                max_upload_bytes: parse_env_or(
                    "OCRBRIDGE_MAX_UPLOAD_BYTES",
                    DEFAULT_MAX_UPLOAD_BYTES,
                ),
            },
            engine: EngineConfig::from_env(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
