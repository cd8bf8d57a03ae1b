//! `ripple bus`: resolve a multi-driver net.

use std::error::Error;

use ripple_sim::{Bus, Model, SignalId, SimError};

use crate::session::{parse_value, show_value, Session};
use crate::{BusArgs, ReportFormat};

/// Runs the `ripple bus` command.
///
/// Drives one floating-capable input per driver value, settles the net, and
/// prints the resolved value. Returns exit code 1 on a short circuit.
pub fn run(args: &BusArgs, session: &Session) -> Result<i32, Box<dyn Error>> {
    let values = args
        .drivers
        .iter()
        .map(|text| parse_value(text, args.bits))
        .collect::<Result<Vec<_>, _>>()?;

    let mut model = session.model();
    let net = match resolve_net(&mut model, args.bits, &values) {
        Ok(net) => net,
        Err(e) => return Ok(session.report(&e, &model, args.format)),
    };

    match args.format {
        ReportFormat::Text => {
            if !session.quiet {
                println!("net = {}", show_value(&model, net));
            }
        }
        ReportFormat::Json => {
            let value = model.signal(net).value_or_none();
            println!("{}", serde_json::json!({ "net": value }));
        }
    }
    Ok(0)
}

fn resolve_net(model: &mut Model, bits: u32, values: &[Option<u64>]) -> Result<SignalId, SimError> {
    let mut drivers = Vec::with_capacity(values.len());
    for (i, value) in values.iter().enumerate() {
        let id = model.add_input(format!("d{i}"), bits, true)?;
        match *value {
            Some(v) => model.set_input(id, v)?,
            None => model.set_input_floating(id)?,
        }
        drivers.push(id);
    }
    let net = model.wire(Bus::new("net", bits, drivers.len()), &drivers)?[0];
    model.init()?;
    Ok(net)
}
