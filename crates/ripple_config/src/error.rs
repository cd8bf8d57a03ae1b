//! Failures while reading `ripple.toml`.

use std::path::PathBuf;

/// Why a configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        /// The file that was opened.
        path: PathBuf,
        /// The underlying I/O failure.
        source: std::io::Error,
    },

    /// Not valid TOML, or a key has the wrong type or an unknown value.
    #[error("malformed config: {0}")]
    Syntax(#[from] toml::de::Error),

    /// Well-formed, but a value is out of range.
    #[error("config key `{key}` {reason}")]
    OutOfRange {
        /// Dotted key path, e.g. `kernel.max_iterations`.
        key: &'static str,
        /// What the value must satisfy.
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_names_the_key() {
        let err = ConfigError::OutOfRange {
            key: "kernel.max_iterations",
            reason: "must be greater than zero",
        };
        assert_eq!(
            err.to_string(),
            "config key `kernel.max_iterations` must be greater than zero"
        );
    }

    #[test]
    fn read_names_the_path() {
        let err = ConfigError::Read {
            path: PathBuf::from("cfg/ripple.toml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err
            .to_string()
            .starts_with("cannot read config file cfg/ripple.toml:"));
    }
}
