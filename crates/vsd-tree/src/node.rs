//! The signal node shape: a tagged variant over a common header (§9 design notes)

use smol_str::SmolStr;
use vsd_common::{DataKind, ElementKind, Value};

/// A stable index into a [`crate::tree::Context`]'s arena.
///
/// Indices are never reused within the life of a context (I1: the node set
/// is append-only after construction), so a `NodeId` is a valid identity for
/// as long as the context that produced it is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifies one `subscribe` registration, returned by
/// [`crate::tree::Context::subscribe`] so a later `unsubscribe` can name
/// exactly that registration without requiring closures to support equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

pub(crate) struct Subscriber {
    pub(crate) id: SubscriptionId,
    pub(crate) callback: crate::subscription::SharedCallback,
}

/// Attributes every node carries regardless of shape.
pub struct SignalHeader {
    /// Dotless local name.
    pub name: SmolStr,
    /// `None` only for the tree root.
    pub parent: Option<NodeId>,
    /// Specification-assigned unique id (I2).
    pub numeric_id: u32,
    /// Truncated hash of the canonical subtree layout (I3); filled in by
    /// [`crate::builder::TreeBuilder::finish`] once the whole tree is known.
    pub subtree_signature: u32,
    /// Role classification.
    pub element_kind: ElementKind,
    /// Payload type; meaningless (but still stored) for branches.
    pub data_kind: DataKind,
    pub(crate) subscribers: Vec<Subscriber>,
}

/// The variant payload distinguishing branches from the two leaf shapes.
pub enum NodeKind {
    /// An interior node; carries no value.
    Branch {
        /// Children in declared (specification) order; part of the subtree signature.
        children: Vec<NodeId>,
    },
    /// A plain typed leaf.
    Leaf {
        /// Current reading.
        value: Value,
        /// Optional inclusive lower bound (unenforced by setters, §9).
        min: Option<Value>,
        /// Optional inclusive upper bound (unenforced by setters, §9).
        max: Option<Value>,
    },
    /// A leaf additionally constrained to a declared set of literals.
    ///
    /// The allowed set is stored and readable but setters do not validate
    /// against it — this mirrors the original behavior and is an intentional
    /// gap, not an oversight (§9).
    Enum {
        /// Current reading.
        value: Value,
        /// Optional inclusive lower bound (unenforced).
        min: Option<Value>,
        /// Optional inclusive upper bound (unenforced).
        max: Option<Value>,
        /// Declared permitted literals.
        allowed_values: Vec<SmolStr>,
    },
}

impl NodeKind {
    /// True for [`NodeKind::Branch`].
    pub fn is_branch(&self) -> bool {
        matches!(self, NodeKind::Branch { .. })
    }

    /// Borrow the current value, if this is a leaf or enum.
    pub fn value(&self) -> Option<&Value> {
        match self {
            NodeKind::Branch { .. } => None,
            NodeKind::Leaf { value, .. } | NodeKind::Enum { value, .. } => Some(value),
        }
    }

    /// Mutably borrow the current value, if this is a leaf or enum.
    pub fn value_mut(&mut self) -> Option<&mut Value> {
        match self {
            NodeKind::Branch { .. } => None,
            NodeKind::Leaf { value, .. } | NodeKind::Enum { value, .. } => Some(value),
        }
    }

    /// Declared lower bound, if any.
    pub fn min(&self) -> Option<&Value> {
        match self {
            NodeKind::Branch { .. } => None,
            NodeKind::Leaf { min, .. } | NodeKind::Enum { min, .. } => min.as_ref(),
        }
    }

    /// Declared upper bound, if any.
    pub fn max(&self) -> Option<&Value> {
        match self {
            NodeKind::Branch { .. } => None,
            NodeKind::Leaf { max, .. } | NodeKind::Enum { max, .. } => max.as_ref(),
        }
    }
}

/// One node in the arena: a header plus its variant payload.
pub struct SignalNode {
    pub header: SignalHeader,
    pub kind: NodeKind,
}
