//! The contract every simulated component implements.

use crate::error::SimError;
use crate::kernel::{Model, Net};
use crate::value::SignalId;

/// A circuit component wired into a [`Model`].
///
/// Elaboration calls the methods in order: [`declare_outputs`] when the
/// element is added, then [`bind_inputs`] and [`register_nodes`] when it is
/// connected, and finally [`init`] when the model is initialized.
///
/// [`declare_outputs`]: Element::declare_outputs
/// [`bind_inputs`]: Element::bind_inputs
/// [`register_nodes`]: Element::register_nodes
/// [`init`]: Element::init
pub trait Element {
    /// A short name used in logs and fault messages.
    fn name(&self) -> &str;

    /// Allocates the element's output signals, in port order.
    fn declare_outputs(&mut self, model: &mut Model) -> Result<Vec<SignalId>, SimError>;

    /// Validates and stores the input signals, subscribing any zero-delay
    /// nodes to them.
    fn bind_inputs(&mut self, model: &mut Model, inputs: &[SignalId]) -> Result<(), SimError>;

    /// Registers delayed nodes with the scheduler. Zero-delay elements have
    /// nothing to register.
    fn register_nodes(&self, _model: &mut Model) -> Result<(), SimError> {
        Ok(())
    }

    /// Re-asserts the element's state so downstream observers settle without
    /// external stimulus.
    fn init(&self, _net: &mut Net<'_>) -> Result<(), SimError> {
        Ok(())
    }
}
