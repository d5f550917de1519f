//! Runtime configuration from environment variables

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_CONSOLE_MESSAGES: usize = 1000;
const DEFAULT_MAX_NETWORK_REQUESTS: usize = 1000;
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Server and browser session settings
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Explicit Chrome binary; when unset, system Chrome then the fetcher is tried
    pub chrome_executable: Option<PathBuf>,
    pub max_console_messages: usize,
    pub max_network_requests: usize,
    pub idle_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            chrome_executable: None,
            max_console_messages: DEFAULT_MAX_CONSOLE_MESSAGES,
            max_network_requests: DEFAULT_MAX_NETWORK_REQUESTS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable values fall back to defaults
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            port: lookup("BROWSER_LENS_PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            chrome_executable: lookup("BROWSER_LENS_CHROME")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            max_console_messages: parsed("BROWSER_LENS_MAX_CONSOLE")
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(defaults.max_console_messages),
            max_network_requests: parsed("BROWSER_LENS_MAX_REQUESTS")
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(defaults.max_network_requests),
            idle_timeout: parsed("BROWSER_LENS_IDLE_TIMEOUT_SECS")
                .map_or(defaults.idle_timeout, Duration::from_secs),
        }
    }
}
