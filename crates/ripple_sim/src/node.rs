//! Units of recomputation and their registration records.
//!
//! A node observes one or more signals and recomputes other signals from them.
//! Zero-delay nodes run synchronously inside the call that changed their
//! trigger; delayed nodes are collected and run once on the next tick.

use ripple_common::ArenaId;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Origin, SimError};
use crate::kernel::{Net, SignalTable};

/// Opaque ID for a node in a model.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a `NodeId` from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl ArenaId for NodeId {
    fn from_raw(index: u32) -> Self {
        Self(index)
    }

    fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// How a node reacts to a change of one of its inputs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum NodeKind {
    /// Recomputed immediately, within the call that changed the input.
    ZeroDelay,
    /// Recomputed on the next scheduler tick.
    Delayed,
}

/// The recomputation performed by a node.
///
/// `update` reads its inputs through the [`Net`] and writes its outputs back
/// through it. For delayed nodes the writes are buffered by the scheduler and
/// applied after every node pending in the tick has run.
pub trait NodeLogic {
    /// Recomputes this node's outputs.
    fn update(&self, net: &mut Net<'_>) -> Result<(), SimError>;

    /// Re-checks a conflict this node flagged with [`Net::suspect_burn`].
    ///
    /// Called once the model has settled; returns a short-circuit fault if
    /// the conflict persists.
    fn check_burn(&self, _signals: &SignalTable) -> Result<(), SimError> {
        Ok(())
    }
}

/// A registered node: its logic plus the bookkeeping the scheduler needs.
pub(crate) struct NodeEntry {
    pub(crate) kind: NodeKind,
    pub(crate) label: String,
    pub(crate) logic: Box<dyn NodeLogic>,
    /// Scope stack active when the node was wired, outermost first.
    pub(crate) origins: Vec<Origin>,
}

impl fmt::Debug for NodeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeEntry")
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("origins", &self.origins)
            .finish_non_exhaustive()
    }
}
