//! Command-line and environment settings for the headless client.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CliConfig {
    /// RON scenario to load. The built-in demo runs when absent.
    pub scenario: Option<PathBuf>,
    /// Directory for a log file next to stderr output.
    pub log_dir: Option<PathBuf>,
    /// Give up if combat has not ended by then.
    pub time_limit: Duration,
}

impl CliConfig {
    /// Environment variables:
    /// - `SKIRMISH_SCENARIO` - Scenario file, overridden by the first argument
    /// - `SKIRMISH_LOG_DIR` - Also write logs to `<dir>/skirmish.log`
    /// - `SKIRMISH_TIME_LIMIT_SECS` - Wall-clock limit (default: 120)
    pub fn from_env() -> Self {
        let scenario = std::env::args()
            .nth(1)
            .or_else(|| std::env::var("SKIRMISH_SCENARIO").ok())
            .map(PathBuf::from);
        let log_dir = std::env::var_os("SKIRMISH_LOG_DIR").map(PathBuf::from);
        let time_limit = std::env::var("SKIRMISH_TIME_LIMIT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(120));

        Self {
            scenario,
            log_dir,
            time_limit,
        }
    }
}
