//! `ripple ports`: show how a range description partitions a bus.

use std::error::Error;

use ripple_sim::{Model, Partition};

use crate::session::Session;
use crate::{PortsArgs, ReportFormat};

/// Runs the `ripple ports` command.
///
/// Prints each range with its position and width. Returns exit code 1 if the
/// description does not parse or is not an exact cover of its bits.
pub fn run(args: &PortsArgs, session: &Session) -> Result<i32, Box<dyn Error>> {
    let model = Model::new();
    let partition = match Partition::parse(&args.description) {
        Ok(p) => p,
        Err(e) => return Ok(session.report(&e, &model, args.format)),
    };

    match args.format {
        ReportFormat::Text => {
            if !session.quiet {
                println!(
                    "'{}': {} range(s) over {} bit(s)",
                    partition.definition(),
                    partition.len(),
                    partition.bits()
                );
                for range in &partition {
                    println!(
                        "  #{:<3} {:<8} pos {:>2}  width {:>2}",
                        range.index(),
                        range.name(),
                        range.pos(),
                        range.width()
                    );
                }
            }
        }
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&partition)?),
    }

    match partition.check_consistency() {
        Ok(()) => Ok(0),
        Err(e) => Ok(session.report(&e, &model, args.format)),
    }
}
