//! Configuration types deserialized from `ripple.toml`.

use serde::{Deserialize, Serialize};

/// Default cap on scheduler ticks per step and on zero-delay recursion depth.
pub const DEFAULT_MAX_ITERATIONS: u32 = 1000;

/// Upper bound on zero-delay notification depth, whatever `max_iterations` says.
pub const MAX_ZERO_DELAY_DEPTH: u32 = 1000;

/// The top-level configuration parsed from `ripple.toml`.
///
/// Every section is optional; a missing file or an empty file yields the
/// same configuration as [`RippleConfig::default`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RippleConfig {
    /// Scheduler tunables.
    #[serde(default)]
    pub kernel: KernelConfig,
    /// Logging settings for the command-line front end.
    #[serde(default)]
    pub log: LogConfig,
}

/// Tunables of the propagation kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Maximum number of ticks a single step may take before the run fails
    /// with an oscillation fault. The same bound limits the nesting depth of
    /// synchronous zero-delay notification, clamped to
    /// [`MAX_ZERO_DELAY_DEPTH`] so that a zero-delay loop is reported as a
    /// fault and never overflows the stack.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl KernelConfig {
    /// The effective zero-delay recursion cap.
    pub fn zero_delay_depth(&self) -> u32 {
        self.max_iterations.min(MAX_ZERO_DELAY_DEPTH)
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

/// Logging configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// The maximum level of messages that are emitted.
    #[serde(default)]
    pub level: LogLevel,
}

/// Log verbosity levels, from silent to most verbose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// No log output.
    Off,
    /// Errors only.
    Error,
    /// Errors and warnings (default).
    #[default]
    Warn,
    /// Informational messages.
    Info,
    /// Elaboration and settle summaries.
    Debug,
    /// Per-node dispatch tracing.
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}
