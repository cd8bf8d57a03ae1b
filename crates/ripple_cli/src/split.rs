//! `ripple split`: settle a splitter against concrete input values.

use std::error::Error;

use log::info;
use ripple_sim::{Model, SignalId, SimError, Splitter};
use serde_json::json;

use crate::session::{parse_value, show_value, Session};
use crate::{ReportFormat, SplitArgs};

/// Runs the `ripple split` command.
///
/// Creates one model input per input range, drives it with the matching
/// value, settles the model, and prints every output. Returns exit code 1 on
/// any fault.
pub fn run(args: &SplitArgs, session: &Session) -> Result<i32, Box<dyn Error>> {
    let mut model = session.model();
    match settle(args, &mut model) {
        Ok(outputs) => {
            print_outputs(&model, &outputs, args.format, session.quiet)?;
            Ok(0)
        }
        Err(SplitFailure::Fault(e)) => Ok(session.report(&e, &model, args.format)),
        Err(SplitFailure::Usage(msg)) => Err(msg.into()),
    }
}

enum SplitFailure {
    Fault(SimError),
    Usage(String),
}

impl From<SimError> for SplitFailure {
    fn from(e: SimError) -> Self {
        SplitFailure::Fault(e)
    }
}

fn settle(args: &SplitArgs, model: &mut Model) -> Result<Vec<SignalId>, SplitFailure> {
    let splitter = Splitter::new(&args.input, &args.output, args.high_z)?;
    let ranges = splitter.inputs().ranges().to_vec();
    if args.values.len() != ranges.len() {
        return Err(SplitFailure::Usage(format!(
            "'{}' has {} input port(s) but {} value(s) were given",
            args.input,
            ranges.len(),
            args.values.len()
        )));
    }

    let mut inputs = Vec::with_capacity(ranges.len());
    for (range, text) in ranges.iter().zip(&args.values) {
        let value = parse_value(text, range.width()).map_err(SplitFailure::Usage)?;
        let id = model.add_input(format!("in[{}]", range.name()), range.width(), args.high_z)?;
        match value {
            Some(v) => model.set_input(id, v)?,
            None => model.set_input_floating(id)?,
        }
        inputs.push(id);
    }

    let outputs = model.wire(splitter, &inputs)?;
    let ticks = model.init()?;
    info!("settled after {ticks} tick(s)");
    Ok(outputs)
}

fn print_outputs(
    model: &Model,
    outputs: &[SignalId],
    format: ReportFormat,
    quiet: bool,
) -> Result<(), Box<dyn Error>> {
    match format {
        ReportFormat::Text => {
            if quiet {
                return Ok(());
            }
            for &id in outputs {
                let signal = model.signal(id);
                println!(
                    "{:<8} [{:>2} bit(s)] = {}",
                    signal.name(),
                    signal.width().bits(),
                    show_value(model, id)
                );
            }
        }
        ReportFormat::Json => {
            let rows: Vec<_> = outputs
                .iter()
                .map(|&id| {
                    let signal = model.signal(id);
                    json!({
                        "name": signal.name(),
                        "bits": signal.width().bits(),
                        "value": signal.value_or_none(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}
