//! Propagation kernel: signal arena, node registry, and the fixed-point scheduler.
//!
//! [`Model`] owns every signal and node of an elaborated circuit. Elements are
//! added in two phases: [`Model::add`] declares an element's outputs and
//! [`Model::connect`] binds its inputs, which lets circuits contain feedback
//! loops. After [`Model::init`], external stimulus is applied with
//! [`Model::set_input`] and the model is driven to a fixed point with
//! [`Model::step`].
//!
//! Zero-delay nodes run synchronously inside the [`Net`] call that changed
//! their trigger. Delayed nodes are collected into a pending set and run once
//! per tick; their writes become visible only after the whole tick has run.

use std::collections::BTreeSet;
use std::fmt;
use std::mem;

use log::{debug, trace, warn};
use ripple_common::{Arena, BitWidth, InternalError};
use ripple_config::KernelConfig;

use crate::element::Element;
use crate::error::{Origin, SignalSet, SimError};
use crate::node::{NodeEntry, NodeId, NodeKind, NodeLogic};
use crate::value::{Signal, SignalId};

/// Storage for every signal of a model.
pub type SignalTable = Arena<SignalId, Signal>;

/// Identifies an element added to a model.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ElementId(u32);

impl ElementId {
    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Lifecycle phase of a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelState {
    /// Elements may be added and connected.
    Elaborating,
    /// Initialized; stimulus may be applied and steps run.
    Running,
    /// A run fault occurred; only [`Model::reset`] is accepted.
    Faulted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WriteMode {
    Immediate,
    Deferred,
}

#[derive(Clone, Copy, Debug)]
struct DeferredWrite {
    signal: SignalId,
    value: u64,
    floating: bool,
}

/// The view of a model that nodes read and write signals through.
///
/// Writes that change a signal notify its observers: zero-delay observers run
/// before the write returns, delayed observers are queued for the next tick.
pub struct Net<'m> {
    signals: &'m mut SignalTable,
    nodes: &'m Arena<NodeId, NodeEntry>,
    pending: &'m mut BTreeSet<NodeId>,
    burn_suspects: &'m mut BTreeSet<NodeId>,
    mode: WriteMode,
    deferred: Vec<DeferredWrite>,
    current: Option<NodeId>,
    /// Trigger signals of the zero-delay dispatches currently on the stack.
    trail: Vec<SignalId>,
    max_depth: u32,
}

impl<'m> Net<'m> {
    fn new(
        signals: &'m mut SignalTable,
        nodes: &'m Arena<NodeId, NodeEntry>,
        pending: &'m mut BTreeSet<NodeId>,
        burn_suspects: &'m mut BTreeSet<NodeId>,
        max_depth: u32,
    ) -> Self {
        Self {
            signals,
            nodes,
            pending,
            burn_suspects,
            mode: WriteMode::Immediate,
            deferred: Vec::new(),
            current: None,
            trail: Vec::new(),
            max_depth,
        }
    }

    /// Returns the state of a signal.
    pub fn signal(&self, id: SignalId) -> &Signal {
        &self.signals[id]
    }

    /// Returns the current value of a signal; zero while floating.
    pub fn value(&self, id: SignalId) -> u64 {
        self.signals[id].value()
    }

    /// Returns `true` if the signal currently floats.
    pub fn is_floating(&self, id: SignalId) -> bool {
        self.signals[id].is_floating()
    }

    /// Returns the signal's width.
    pub fn width(&self, id: SignalId) -> BitWidth {
        self.signals[id].width()
    }

    /// Drives a concrete value, masked to the signal's width.
    pub fn set_value(&mut self, id: SignalId, value: u64) -> Result<(), SimError> {
        self.set(id, value, false)
    }

    /// Lets the signal float.
    pub fn set_floating(&mut self, id: SignalId) -> Result<(), SimError> {
        self.set(id, 0, true)
    }

    /// Drives a value and floating flag. Floating a signal that does not
    /// support high impedance is a wiring fault.
    pub fn set(&mut self, id: SignalId, value: u64, floating: bool) -> Result<(), SimError> {
        if floating && !self.signals[id].supports_high_z() {
            return Err(SimError::wiring(format!(
                "signal '{}' cannot float",
                self.signals[id].name()
            ))
            .with_signals([id])
            .with_origins(self.current_origins()));
        }
        match self.mode {
            WriteMode::Deferred => {
                self.deferred.push(DeferredWrite {
                    signal: id,
                    value,
                    floating,
                });
                Ok(())
            }
            WriteMode::Immediate => {
                if self.signals[id].store(value, floating) {
                    self.notify(id)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Notifies every observer of a signal as if it had changed.
    pub fn fire_has_changed(&mut self, id: SignalId) -> Result<(), SimError> {
        self.notify(id)
    }

    /// Flags the running node for a conflict check once the model settles.
    pub fn suspect_burn(&mut self) {
        if let Some(node) = self.current {
            self.burn_suspects.insert(node);
        }
    }

    fn notify(&mut self, id: SignalId) -> Result<(), SimError> {
        let nodes = self.nodes;
        // observer lists are fixed after elaboration
        for i in 0..self.signals[id].observers().len() {
            let node = self.signals[id].observers()[i];
            match nodes[node].kind {
                NodeKind::Delayed => {
                    self.pending.insert(node);
                }
                NodeKind::ZeroDelay => self.dispatch(node, id)?,
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, node: NodeId, trigger: SignalId) -> Result<(), SimError> {
        let nodes = self.nodes;
        let entry = &nodes[node];
        if self.trail.len() as u32 >= self.max_depth {
            let signals: SignalSet = self.trail.iter().copied().chain([trigger]).collect();
            return Err(SimError::oscillation(self.max_depth)
                .with_signals(signals)
                .with_origins(entry.origins.iter().cloned()));
        }
        trace!("{node} '{}' <- {trigger}", entry.label);

        self.trail.push(trigger);
        let outer = self.current.replace(node);
        let result = entry.logic.update(self);
        self.current = outer;
        self.trail.pop();

        result.map_err(|e| in_scope(e, &entry.origins))
    }

    /// Runs one tick: evaluates every node in `batch` against the current
    /// signal values, then applies their writes. Returns the signals that
    /// changed.
    fn run_tick(&mut self, batch: &[NodeId]) -> Result<SignalSet, SimError> {
        let nodes = self.nodes;
        self.mode = WriteMode::Deferred;
        for &node in batch {
            let entry = &nodes[node];
            trace!("tick: {node} '{}'", entry.label);
            self.current = Some(node);
            let result = entry.logic.update(self);
            self.current = None;
            if let Err(e) = result {
                self.mode = WriteMode::Immediate;
                self.deferred.clear();
                return Err(in_scope(e, &entry.origins));
            }
        }
        self.mode = WriteMode::Immediate;

        let mut changed = SignalSet::new();
        for write in mem::take(&mut self.deferred) {
            if self.signals[write.signal].store(write.value, write.floating) {
                changed.insert(write.signal);
                self.notify(write.signal)?;
            }
        }
        Ok(changed)
    }

    fn current_origins(&self) -> Vec<Origin> {
        self.current
            .map(|node| self.nodes[node].origins.clone())
            .unwrap_or_default()
    }
}

/// Attaches a scope's origins to a fault that has none yet.
fn in_scope(err: SimError, origins: &[Origin]) -> SimError {
    if err.origins().is_empty() {
        err.with_origins(origins.iter().cloned())
    } else {
        err
    }
}

struct ElementEntry {
    name: String,
    /// Taken out while the element is being connected.
    element: Option<Box<dyn Element>>,
    outputs: Vec<SignalId>,
    bound: bool,
    origins: Vec<Origin>,
}

/// An elaborated circuit: signals, nodes, elements, and scheduler state.
pub struct Model {
    signals: SignalTable,
    nodes: Arena<NodeId, NodeEntry>,
    elements: Vec<ElementEntry>,
    inputs: Vec<SignalId>,
    pending: BTreeSet<NodeId>,
    burn_suspects: BTreeSet<NodeId>,
    scope: Vec<Origin>,
    config: KernelConfig,
    state: ModelState,
    total_ticks: u64,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Creates an empty model with the default kernel configuration.
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    /// Creates an empty model with the given kernel configuration.
    pub fn with_config(config: KernelConfig) -> Self {
        Self {
            signals: SignalTable::new(),
            nodes: Arena::new(),
            elements: Vec::new(),
            inputs: Vec::new(),
            pending: BTreeSet::new(),
            burn_suspects: BTreeSet::new(),
            scope: Vec::new(),
            config,
            state: ModelState::Elaborating,
            total_ticks: 0,
        }
    }

    /// Returns the kernel configuration.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Returns the lifecycle phase.
    pub fn state(&self) -> ModelState {
        self.state
    }

    // ---- elaboration ----

    /// Allocates a signal. Elements call this from
    /// [`Element::declare_outputs`].
    pub fn add_signal(
        &mut self,
        name: impl Into<String>,
        bits: u32,
        high_z: bool,
    ) -> Result<SignalId, SimError> {
        let name = name.into();
        let width = BitWidth::new(bits).ok_or_else(|| {
            SimError::bits(format!(
                "signal '{name}' has width {bits}; widths must be between 1 and 64"
            ))
        })?;
        Ok(self.insert_signal(Signal::new(name, width, high_z)))
    }

    /// Adds a fully constructed signal.
    pub fn insert_signal(&mut self, signal: Signal) -> SignalId {
        self.signals.alloc(signal)
    }

    /// Adds an external input driven by [`Model::set_input`].
    pub fn add_input(
        &mut self,
        name: impl Into<String>,
        bits: u32,
        high_z: bool,
    ) -> Result<SignalId, SimError> {
        let id = self.add_signal(name, bits, high_z)?;
        self.inputs.push(id);
        Ok(id)
    }

    /// Registers a node. The node inherits the current scope's origins.
    ///
    /// Nodes can only be added while elaborating.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        label: impl Into<String>,
        logic: impl NodeLogic + 'static,
    ) -> Result<NodeId, SimError> {
        self.ensure_elaborating()?;
        Ok(self.nodes.alloc(NodeEntry {
            kind,
            label: label.into(),
            logic: Box::new(logic),
            origins: self.scope.clone(),
        }))
    }

    /// Subscribes a node to changes of a signal. Only allowed while
    /// elaborating.
    pub fn observe(&mut self, signal: SignalId, node: NodeId) -> Result<(), SimError> {
        self.ensure_elaborating()?;
        if !self.nodes.contains(node) {
            return Err(InternalError::new(format!("unknown node {node}")).into());
        }
        let signal = self
            .signals
            .try_get_mut(signal)
            .ok_or_else(|| InternalError::new(format!("unknown signal {signal}")))?;
        signal.add_observer(node);
        Ok(())
    }

    /// Opens a nested scope; elements added until the matching
    /// [`exit_scope`](Model::exit_scope) report this origin in their faults.
    pub fn enter_scope(&mut self, origin: impl Into<Origin>) {
        self.scope.push(origin.into());
    }

    /// Closes the innermost scope.
    pub fn exit_scope(&mut self) {
        self.scope.pop();
    }

    /// Adds an element and declares its outputs. Inputs are bound later with
    /// [`connect`](Model::connect).
    pub fn add<E: Element + 'static>(&mut self, mut element: E) -> Result<ElementId, SimError> {
        self.ensure_elaborating()?;
        let outputs = match element.declare_outputs(self) {
            Ok(outputs) => outputs,
            Err(e) => return Err(in_scope(e, &self.scope)),
        };
        let id = ElementId(self.elements.len() as u32);
        debug!(
            "added {id} '{}' with {} output(s)",
            element.name(),
            outputs.len()
        );
        self.elements.push(ElementEntry {
            name: element.name().to_string(),
            element: Some(Box::new(element)),
            outputs,
            bound: false,
            origins: self.scope.clone(),
        });
        Ok(id)
    }

    /// Binds an element's inputs and registers its nodes.
    pub fn connect(&mut self, id: ElementId, inputs: &[SignalId]) -> Result<(), SimError> {
        self.ensure_elaborating()?;
        let index = id.0 as usize;
        if let Some(&unknown) = inputs.iter().find(|&&s| !self.signals.contains(s)) {
            return Err(InternalError::new(format!("unknown signal {unknown}")).into());
        }
        let entry = self
            .elements
            .get_mut(index)
            .ok_or_else(|| InternalError::new(format!("unknown element {id}")))?;
        if entry.bound {
            return Err(SimError::wiring(format!(
                "element '{}' is already connected",
                entry.name
            )));
        }
        let mut element = entry
            .element
            .take()
            .ok_or_else(|| InternalError::new(format!("element {id} is being connected")))?;

        // nodes created while binding belong to the element's scope
        let saved_scope = mem::replace(&mut self.scope, entry.origins.clone());
        let result = element
            .bind_inputs(self, inputs)
            .and_then(|()| element.register_nodes(self));
        self.scope = saved_scope;

        let entry = &mut self.elements[index];
        entry.element = Some(element);
        match result {
            Ok(()) => {
                entry.bound = true;
                debug!("connected {id} '{}' to {} input(s)", entry.name, inputs.len());
                Ok(())
            }
            Err(e) => Err(in_scope(e, &entry.origins)),
        }
    }

    /// Adds an element and binds its inputs in one go, returning its outputs.
    pub fn wire<E: Element + 'static>(
        &mut self,
        element: E,
        inputs: &[SignalId],
    ) -> Result<Vec<SignalId>, SimError> {
        let id = self.add(element)?;
        self.connect(id, inputs)?;
        Ok(self.outputs(id).to_vec())
    }

    /// Returns the outputs an element declared.
    pub fn outputs(&self, id: ElementId) -> &[SignalId] {
        self.elements
            .get(id.0 as usize)
            .map(|e| e.outputs.as_slice())
            .unwrap_or(&[])
    }

    // ---- running ----

    /// Finishes elaboration and settles the model into its initial state.
    ///
    /// Every delayed node is scheduled for the first tick, every element
    /// re-asserts its inputs, and every external input fires once, so purely
    /// combinational parts settle without stimulus. Returns the number of
    /// ticks taken.
    pub fn init(&mut self) -> Result<u32, SimError> {
        self.ensure_elaborating()?;
        if let Some(entry) = self.elements.iter().find(|e| !e.bound) {
            return Err(in_scope(
                SimError::wiring(format!("element '{}' has unbound inputs", entry.name))
                    .with_signals(entry.outputs.iter().copied()),
                &entry.origins,
            ));
        }
        debug!(
            "init: {} signal(s), {} node(s), {} element(s)",
            self.signals.len(),
            self.nodes.len(),
            self.elements.len()
        );
        self.state = ModelState::Running;
        for (id, entry) in self.nodes.iter() {
            if entry.kind == NodeKind::Delayed {
                self.pending.insert(id);
            }
        }

        let fired = {
            let mut net = Net::new(
                &mut self.signals,
                &self.nodes,
                &mut self.pending,
                &mut self.burn_suspects,
                self.config.zero_delay_depth(),
            );
            fire_all(&mut net, &self.elements, &self.inputs)
        };
        if let Err(e) = fired {
            return Err(self.fault(e));
        }
        self.step()
    }

    /// Drives an external input to a concrete value.
    ///
    /// Before [`init`](Model::init) this sets the input's initial value.
    /// Afterwards zero-delay consequences are applied immediately; delayed
    /// ones wait for [`step`](Model::step).
    pub fn set_input(&mut self, id: SignalId, value: u64) -> Result<(), SimError> {
        self.drive_input(id, value, false)
    }

    /// Lets an external input float.
    pub fn set_input_floating(&mut self, id: SignalId) -> Result<(), SimError> {
        self.drive_input(id, 0, true)
    }

    fn drive_input(&mut self, id: SignalId, value: u64, floating: bool) -> Result<(), SimError> {
        if !self.inputs.contains(&id) {
            let name = self
                .signals
                .try_get(id)
                .map_or_else(|| id.to_string(), |s| s.name().to_string());
            return Err(SimError::wiring(format!("signal '{name}' is not a model input")));
        }
        match self.state {
            ModelState::Faulted => Err(SimError::Halted),
            ModelState::Elaborating => {
                let signal = &mut self.signals[id];
                if floating && !signal.supports_high_z() {
                    return Err(SimError::wiring(format!(
                        "signal '{}' cannot float",
                        signal.name()
                    ))
                    .with_signals([id]));
                }
                signal.preset(value, floating);
                Ok(())
            }
            ModelState::Running => {
                let result = self.net().set(id, value, floating);
                result.map_err(|e| self.fault(e))
            }
        }
    }

    /// Runs ticks until no delayed node is pending, then checks every flagged
    /// net for a persisting conflict. Returns the number of ticks taken.
    pub fn step(&mut self) -> Result<u32, SimError> {
        match self.state {
            ModelState::Running => {}
            ModelState::Faulted => return Err(SimError::Halted),
            ModelState::Elaborating => {
                return Err(InternalError::new("step called before init").into())
            }
        }
        match self.settle() {
            Ok(ticks) => {
                self.total_ticks += u64::from(ticks);
                debug!("settled after {ticks} tick(s)");
                Ok(ticks)
            }
            Err(e) => Err(self.fault(e)),
        }
    }

    /// Restores every signal to its initial state and re-runs [`init`](Model::init).
    pub fn reset(&mut self) -> Result<u32, SimError> {
        for signal in self.signals.values_mut() {
            signal.restore_initial();
        }
        self.pending.clear();
        self.burn_suspects.clear();
        self.total_ticks = 0;
        self.state = ModelState::Elaborating;
        self.init()
    }

    fn settle(&mut self) -> Result<u32, SimError> {
        let max = self.config.max_iterations;
        let mut net = Net::new(
            &mut self.signals,
            &self.nodes,
            &mut self.pending,
            &mut self.burn_suspects,
            max,
        );
        let mut ticks = 0u32;
        let mut last_batch: Vec<NodeId> = Vec::new();
        let mut last_changed = SignalSet::new();
        while !net.pending.is_empty() {
            if ticks >= max {
                let origins: Vec<Origin> = last_batch
                    .iter()
                    .flat_map(|&n| self.nodes[n].origins.iter().cloned())
                    .collect();
                return Err(SimError::oscillation(max)
                    .with_signals(last_changed)
                    .with_origins(origins));
            }
            last_batch = mem::take(net.pending).into_iter().collect();
            last_changed = net.run_tick(&last_batch)?;
            ticks += 1;
        }

        for node in mem::take(&mut self.burn_suspects) {
            let entry = &self.nodes[node];
            entry
                .logic
                .check_burn(&self.signals)
                .map_err(|e| in_scope(e, &entry.origins))?;
        }
        Ok(ticks)
    }

    fn net(&mut self) -> Net<'_> {
        Net::new(
            &mut self.signals,
            &self.nodes,
            &mut self.pending,
            &mut self.burn_suspects,
            self.config.zero_delay_depth(),
        )
    }

    fn fault(&mut self, err: SimError) -> SimError {
        warn!("simulation fault: {err}");
        self.state = ModelState::Faulted;
        self.pending.clear();
        self.burn_suspects.clear();
        err
    }

    fn ensure_elaborating(&self) -> Result<(), SimError> {
        if self.state == ModelState::Elaborating {
            Ok(())
        } else {
            Err(SimError::wiring("the model is already initialized"))
        }
    }

    // ---- inspection ----

    /// Returns a signal's state.
    pub fn signal(&self, id: SignalId) -> &Signal {
        &self.signals[id]
    }

    /// Returns all signals.
    pub fn signals(&self) -> &SignalTable {
        &self.signals
    }

    /// Returns a signal's current value; zero while floating.
    pub fn value(&self, id: SignalId) -> u64 {
        self.signals[id].value()
    }

    /// Returns `true` if the signal currently floats.
    pub fn is_floating(&self, id: SignalId) -> bool {
        self.signals[id].is_floating()
    }

    /// Finds the first signal with the given name.
    pub fn find_signal(&self, name: &str) -> Option<SignalId> {
        self.signals
            .iter()
            .find(|(_, s)| s.name() == name)
            .map(|(id, _)| id)
    }

    /// Resolves a set of signal IDs to their names, in ID order.
    pub fn signal_names<'a>(&self, ids: impl IntoIterator<Item = &'a SignalId>) -> Vec<String> {
        ids.into_iter()
            .map(|&id| {
                self.signals
                    .try_get(id)
                    .map_or_else(|| id.to_string(), |s| s.name().to_string())
            })
            .collect()
    }

    /// Returns the external inputs in creation order.
    pub fn inputs(&self) -> &[SignalId] {
        &self.inputs
    }

    /// Returns the number of signals.
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of elements.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Returns the total ticks run since the last init.
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }
}

fn fire_all(
    net: &mut Net<'_>,
    elements: &[ElementEntry],
    inputs: &[SignalId],
) -> Result<(), SimError> {
    for entry in elements {
        if let Some(element) = &entry.element {
            element
                .init(net)
                .map_err(|e| in_scope(e, &entry.origins))?;
        }
    }
    for &input in inputs {
        net.fire_has_changed(input)?;
    }
    Ok(())
}
