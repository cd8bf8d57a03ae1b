//! The `ripple` command: inspect partitions and drive small circuits through
//! the signal-propagation kernel.
//!
//! Provides `ripple ports` to show how a range description partitions a bus,
//! `ripple split` to settle a splitter against concrete input values, and
//! `ripple bus` to resolve a multi-driver net and report short circuits.

#![warn(missing_docs)]

mod bus;
mod ports;
mod session;
mod split;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line front end of the ripple kernel.
#[derive(Parser, Debug)]
#[command(name = "ripple", version, about = "Ripple logic simulation kernel")]
pub struct Cli {
    /// Only print faults.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// When to color diagnostics.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `ripple.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the ranges of a partition description.
    Ports(PortsArgs),
    /// Settle a splitter for the given input values.
    Split(SplitArgs),
    /// Resolve a multi-driver net.
    Bus(BusArgs),
}

/// Arguments for the `ripple ports` subcommand.
#[derive(Parser, Debug)]
pub struct PortsArgs {
    /// Range description, e.g. `4,4` or `0-3,4*2`.
    pub description: String,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `ripple split` subcommand.
#[derive(Parser, Debug)]
pub struct SplitArgs {
    /// Input partition description.
    #[arg(short, long)]
    pub input: String,

    /// Output partition description.
    #[arg(short, long)]
    pub output: String,

    /// Allow the single input to float.
    #[arg(long)]
    pub high_z: bool,

    /// One value per input port (`0x1F`, `0b101`, `17`, or `z`).
    #[arg(num_args = 1..)]
    pub values: Vec<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `ripple bus` subcommand.
#[derive(Parser, Debug)]
pub struct BusArgs {
    /// Width of the net in bits.
    #[arg(short, long, default_value_t = 1)]
    pub bits: u32,

    /// One value per driver (`0x1F`, `0b101`, `17`, or `z`).
    #[arg(num_args = 1..)]
    pub drivers: Vec<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// `--color` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Color unless `NO_COLOR` is set or there is no `TERM`.
    Auto,
    /// Always color.
    Always,
    /// Never color.
    Never,
}

/// How results and faults are printed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Plain text.
    Text,
    /// One JSON object per line.
    Json,
}

/// Flags shared by every subcommand.
pub struct GlobalArgs {
    /// `--quiet`.
    pub quiet: bool,
    /// `--verbose`.
    pub verbose: bool,
    /// Resolved `--color`.
    pub color: bool,
    /// `--config`.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => {
            std::env::var_os("NO_COLOR").is_none() && std::env::var_os("TERM").is_some()
        }
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    let result = session::Session::start(&global).and_then(|session| match cli.command {
        Command::Ports(ref args) => ports::run(args, &session),
        Command::Split(ref args) => split::run(args, &session),
        Command::Bus(ref args) => bus::run(args, &session),
    });

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_ports() {
        let cli = Cli::parse_from(["ripple", "ports", "1*2,2"]);
        match cli.command {
            Command::Ports(ref args) => {
                assert_eq!(args.description, "1*2,2");
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Ports command"),
        }
    }

    #[test]
    fn parse_split() {
        let cli = Cli::parse_from([
            "ripple", "split", "--input", "4,4", "--output", "8", "0x3", "0x7",
        ]);
        match cli.command {
            Command::Split(ref args) => {
                assert_eq!(args.input, "4,4");
                assert_eq!(args.output, "8");
                assert!(!args.high_z);
                assert_eq!(args.values, vec!["0x3", "0x7"]);
            }
            _ => panic!("expected Split command"),
        }
    }

    #[test]
    fn parse_split_high_z_json() {
        let cli = Cli::parse_from([
            "ripple", "split", "-i", "8", "-o", "4,4", "--high-z", "-f", "json", "z",
        ]);
        match cli.command {
            Command::Split(ref args) => {
                assert!(args.high_z);
                assert_eq!(args.format, ReportFormat::Json);
                assert_eq!(args.values, vec!["z"]);
            }
            _ => panic!("expected Split command"),
        }
    }

    #[test]
    fn parse_bus() {
        let cli = Cli::parse_from(["ripple", "bus", "--bits", "4", "0xA", "z"]);
        match cli.command {
            Command::Bus(ref args) => {
                assert_eq!(args.bits, 4);
                assert_eq!(args.drivers, vec!["0xA", "z"]);
            }
            _ => panic!("expected Bus command"),
        }
    }

    #[test]
    fn parse_bus_default_width() {
        let cli = Cli::parse_from(["ripple", "bus", "1", "0"]);
        match cli.command {
            Command::Bus(ref args) => assert_eq!(args.bits, 1),
            _ => panic!("expected Bus command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["ripple", "--quiet", "--color", "never", "ports", "8"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn parse_verbose_after_subcommand() {
        let cli = Cli::parse_from(["ripple", "ports", "8", "--verbose"]);
        assert!(cli.verbose);
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["ripple", "--config", "/path/to/ripple.toml", "ports", "8"]);
        assert_eq!(cli.config.as_deref(), Some("/path/to/ripple.toml"));
    }

    #[test]
    fn missing_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["ripple"]).is_err());
    }
}
