//! Per-invocation setup shared by every subcommand: configuration, logging,
//! value parsing, and fault reporting.

use std::error::Error;
use std::path::Path;

use log::LevelFilter;
use ripple_common::mask;
use ripple_config::{load_config, load_config_file, ConfigError, RippleConfig};
use ripple_diagnostics::{DiagnosticRenderer, JsonRenderer, TerminalRenderer};
use ripple_sim::{Model, SignalId, SimError};

use crate::{GlobalArgs, ReportFormat};

/// Settings resolved once at startup.
pub struct Session {
    /// The loaded `ripple.toml`, or defaults.
    pub config: RippleConfig,
    /// Whether to color terminal diagnostics.
    pub color: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl Session {
    /// Loads the configuration and installs the logger.
    pub fn start(global: &GlobalArgs) -> Result<Self, Box<dyn Error>> {
        let config = load_settings(global.config.as_deref(), &std::env::current_dir()?)?;
        env_logger::Builder::new()
            .format_timestamp(None)
            .filter_level(log_level(global, &config))
            .target(env_logger::Target::Stderr)
            .init();
        log::debug!("max_iterations = {}", config.kernel.max_iterations);
        Ok(Self {
            config,
            color: global.color,
            quiet: global.quiet,
        })
    }

    /// A fresh model using the configured kernel settings.
    pub fn model(&self) -> Model {
        Model::with_config(self.config.kernel)
    }

    /// Prints a fault as a diagnostic and returns the exit code to use.
    pub fn report(&self, err: &SimError, model: &Model, format: ReportFormat) -> i32 {
        let diag = err.to_diagnostic(model);
        match format {
            ReportFormat::Text => eprint!("{}", TerminalRenderer::new(self.color).render(&diag)),
            ReportFormat::Json => println!("{}", JsonRenderer.render(&diag)),
        }
        1
    }
}

/// Reads the config from an explicit file, or from `ripple.toml` in `dir`.
pub fn load_settings(path: Option<&str>, dir: &Path) -> Result<RippleConfig, ConfigError> {
    match path {
        Some(path) => load_config_file(Path::new(path)),
        None => load_config(dir),
    }
}

fn log_level(global: &GlobalArgs, config: &RippleConfig) -> LevelFilter {
    if global.verbose {
        LevelFilter::Debug
    } else if global.quiet {
        LevelFilter::Error
    } else {
        config.log.level.into()
    }
}

/// Parses a driven value for a `bits`-wide port. `z` means floating.
pub fn parse_value(text: &str, bits: u32) -> Result<Option<u64>, String> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") {
        return Ok(None);
    }
    let lower = text.to_ascii_lowercase();
    let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (bin, 2)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        (oct, 8)
    } else {
        (lower.as_str(), 10)
    };
    let digits = digits.replace('_', "");
    let value =
        u64::from_str_radix(&digits, radix).map_err(|_| format!("invalid value '{text}'"))?;
    if value & !mask(bits) != 0 {
        return Err(format!("value '{text}' does not fit in {bits} bit(s)"));
    }
    Ok(Some(value))
}

/// Formats a settled signal value, `Z` while floating.
pub fn show_value(model: &Model, id: SignalId) -> String {
    match model.signal(id).value_or_none() {
        Some(value) => format!("{value:#x}"),
        None => "Z".to_string(),
    }
}
