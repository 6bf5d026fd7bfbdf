//! The signal tree: arena, indexes, lookup, typed mutation, subscribe, and publish.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use smol_str::SmolStr;
use vsd_common::{DataKind, ElementKind, Value, VsdError};

use crate::codec;
use crate::node::{NodeId, NodeKind, SignalNode, Subscriber, SubscriptionId};
use crate::transport::Transport;

/// Owns every node in one signal tree plus the indexes used to resolve
/// lookups. Built once by [`crate::builder::TreeBuilder::finish`]; thereafter
/// only value cells and subscriber lists change (I1: the node set itself is
/// append-only, in fact fixed, after construction).
pub struct Context {
    pub(crate) arena: Vec<SignalNode>,
    root: NodeId,
    by_id: HashMap<u32, NodeId>,
    signature_cache: RefCell<HashMap<u32, NodeId>>,
    next_subscription: u64,
}

impl Context {
    pub(crate) fn from_parts(arena: Vec<SignalNode>, root: NodeId, by_id: HashMap<u32, NodeId>) -> Self {
        Self {
            arena,
            root,
            by_id,
            signature_cache: RefCell::new(HashMap::new()),
            next_subscription: 0,
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> &SignalNode {
        &self.arena[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut SignalNode {
        &mut self.arena[id.index()]
    }

    /// The tree root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    // ---- 4.1 lookup -----------------------------------------------------

    /// Resolve a dotted path from the root (§4.1).
    pub fn lookup_by_path(&self, path: &str) -> Result<NodeId, VsdError> {
        if path.is_empty() || path.ends_with('.') {
            return Err(VsdError::invalid_argument(format!("malformed path: {path:?}")));
        }
        let mut components = path.split('.');
        let first = components.next().unwrap();
        if first != self.node(self.root).header.name {
            return Err(VsdError::not_found("path", path));
        }
        let mut current = self.root;
        for component in components {
            match &self.node(current).kind {
                NodeKind::Branch { children } => {
                    let found = children.iter().copied().find(|&child| self.node(child).header.name == component);
                    current = found.ok_or_else(|| VsdError::not_found("path", path))?;
                }
                _ => return Err(VsdError::not_a_directory(path)),
            }
        }
        Ok(current)
    }

    /// O(1) lookup by specification-assigned id.
    pub fn lookup_by_id(&self, numeric_id: u32) -> Result<NodeId, VsdError> {
        self.by_id.get(&numeric_id).copied().ok_or_else(|| VsdError::not_found("id", numeric_id))
    }

    /// Lookup by subtree signature. The first lookup for a given signature is
    /// linear across the arena; the result is memoized so later lookups are
    /// O(1) (§4.1).
    pub fn lookup_by_signature(&self, signature: u32) -> Option<NodeId> {
        if let Some(&id) = self.signature_cache.borrow().get(&signature) {
            return Some(id);
        }
        let found = self.arena.iter().enumerate().find_map(|(idx, node)| {
            (node.header.subtree_signature == signature).then(|| NodeId(idx as u32))
        })?;
        self.signature_cache.borrow_mut().insert(signature, found);
        Some(found)
    }

    /// Ordered children; empty for a leaf.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        match &self.node(node).kind {
            NodeKind::Branch { children } => children,
            _ => &[],
        }
    }

    /// The canonical dotted path to `node`, or `"[signal path too long]"` if
    /// it would not fit in a 1 KiB buffer.
    pub fn path_of(&self, node: NodeId) -> SmolStr {
        const MAX_PATH_BYTES: usize = 1024;
        let mut segments = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            segments.push(self.node(id).header.name.as_str());
            current = self.node(id).header.parent;
        }
        segments.reverse();
        let joined = segments.join(".");
        if joined.len() > MAX_PATH_BYTES {
            SmolStr::new_static("[signal path too long]")
        } else {
            SmolStr::new(joined)
        }
    }

    /// Read-only view of a leaf's current value; fails with `is-a-directory`
    /// on a branch (I5).
    pub fn current_value(&self, node: NodeId) -> Result<&Value, VsdError> {
        self.node(node).kind.value().ok_or_else(|| VsdError::is_a_directory(self.path_of(node).to_string()))
    }

    /// The signal's role classification (§6 kind accessor).
    pub fn element_kind(&self, node: NodeId) -> ElementKind {
        self.node(node).header.element_kind
    }

    /// The signal's payload type; meaningless but still present for branches
    /// (§6 kind accessor).
    pub fn data_kind(&self, node: NodeId) -> DataKind {
        self.node(node).header.data_kind
    }

    /// The signal's dotless local name (§6 kind accessor). See
    /// [`Context::path_of`] for the full dotted path.
    pub fn name(&self, node: NodeId) -> &str {
        &self.node(node).header.name
    }

    /// The signal's specification-assigned id (§6 kind accessor).
    pub fn numeric_id(&self, node: NodeId) -> u32 {
        self.node(node).header.numeric_id
    }

    /// Declared lower bound, if any; fails with `is-a-directory` on a branch.
    pub fn min(&self, node: NodeId) -> Result<Option<&Value>, VsdError> {
        if self.node(node).kind.is_branch() {
            return Err(VsdError::is_a_directory(self.path_of(node).to_string()));
        }
        Ok(self.node(node).kind.min())
    }

    /// Declared upper bound, if any; fails with `is-a-directory` on a branch.
    pub fn max(&self, node: NodeId) -> Result<Option<&Value>, VsdError> {
        if self.node(node).kind.is_branch() {
            return Err(VsdError::is_a_directory(self.path_of(node).to_string()));
        }
        Ok(self.node(node).kind.max())
    }

    // ---- 4.2 typed mutation ----------------------------------------------

    /// Write a value into a leaf's cell (§4.2 step 3). Callers are expected
    /// to have already checked the target is a leaf of the right kind —
    /// [`Context::resolve_target`] for the typed setters, the signal's own
    /// `data_kind` for `convert`/codec writes.
    pub(crate) fn write_value(&mut self, node: NodeId, value: Value) -> Result<(), VsdError> {
        match self.node_mut(node).kind.value_mut() {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(VsdError::is_a_directory(self.path_of(node).to_string())),
        }
    }

    fn resolve_target(&self, node: NodeId, expected: DataKind) -> Result<(), VsdError> {
        if self.node(node).kind.is_branch() {
            return Err(VsdError::is_a_directory(self.path_of(node).to_string()));
        }
        let header = &self.node(node).header;
        if header.data_kind != expected {
            return Err(VsdError::invalid_argument(format!(
                "type mismatch at {}: signal is {}, setter is {expected}",
                self.path_of(node),
                header.data_kind
            )));
        }
        Ok(())
    }

    /// Parse `literal` using the target's own data kind and write it
    /// (§4.2 `convert` setter).
    pub fn set_from_str(&mut self, node: NodeId, literal: &str) -> Result<(), VsdError> {
        let kind = self.node(node).header.data_kind;
        if self.node(node).kind.is_branch() {
            return Err(VsdError::is_a_directory(self.path_of(node).to_string()));
        }
        let value = Value::parse(kind, literal)?;
        self.write_value(node, value)
    }

    /// Same as [`Context::set_from_str`], resolving the target by path first.
    pub fn set_from_str_by_path(&mut self, path: &str, literal: &str) -> Result<(), VsdError> {
        let node = self.lookup_by_path(path)?;
        self.set_from_str(node, literal)
    }

    /// Same as [`Context::set_from_str`], resolving the target by id first.
    pub fn set_from_str_by_id(&mut self, id: u32, literal: &str) -> Result<(), VsdError> {
        let node = self.lookup_by_id(id)?;
        self.set_from_str(node, literal)
    }

    /// Set a string leaf directly (grows the buffer through the growth
    /// policy; never broadcasts — see [`Context::publish`]).
    pub fn set_string(&mut self, node: NodeId, s: &str) -> Result<(), VsdError> {
        self.resolve_target(node, DataKind::String)?;
        let value = Value::parse(DataKind::String, s)?;
        self.write_value(node, value)
    }

    /// Same as [`Context::set_string`], resolving the target by path first.
    pub fn set_string_by_path(&mut self, path: &str, s: &str) -> Result<(), VsdError> {
        let node = self.lookup_by_path(path)?;
        self.set_string(node, s)
    }

    /// Same as [`Context::set_string`], resolving the target by id first.
    pub fn set_string_by_id(&mut self, id: u32, s: &str) -> Result<(), VsdError> {
        let node = self.lookup_by_id(id)?;
        self.set_string(node, s)
    }
}

macro_rules! typed_setter {
    ($set:ident, $set_by_path:ident, $set_by_id:ident, $variant:ident, $ty:ty) => {
        impl Context {
            #[doc = concat!("Typed setter for `", stringify!($ty), "` leaves, addressed by handle (§4.2).")]
            pub fn $set(&mut self, node: NodeId, v: $ty) -> Result<(), VsdError> {
                self.resolve_target(node, DataKind::$variant)?;
                self.write_value(node, Value::$variant(v))
            }

            #[doc = concat!("Same as [`Context::", stringify!($set), "`], resolving the target by path first.")]
            pub fn $set_by_path(&mut self, path: &str, v: $ty) -> Result<(), VsdError> {
                let node = self.lookup_by_path(path)?;
                self.$set(node, v)
            }

            #[doc = concat!("Same as [`Context::", stringify!($set), "`], resolving the target by id first.")]
            pub fn $set_by_id(&mut self, id: u32, v: $ty) -> Result<(), VsdError> {
                let node = self.lookup_by_id(id)?;
                self.$set(node, v)
            }
        }
    };
}

typed_setter!(set_i8, set_i8_by_path, set_i8_by_id, I8, i8);
typed_setter!(set_u8, set_u8_by_path, set_u8_by_id, U8, u8);
typed_setter!(set_i16, set_i16_by_path, set_i16_by_id, I16, i16);
typed_setter!(set_u16, set_u16_by_path, set_u16_by_id, U16, u16);
typed_setter!(set_i32, set_i32_by_path, set_i32_by_id, I32, i32);
typed_setter!(set_u32, set_u32_by_path, set_u32_by_id, U32, u32);
typed_setter!(set_f32, set_f32_by_path, set_f32_by_id, F32, f32);
typed_setter!(set_f64, set_f64_by_path, set_f64_by_id, F64, f64);
typed_setter!(set_bool, set_bool_by_path, set_bool_by_id, Bool, bool);

impl Context {
    // ---- 4.4 subscription bus --------------------------------------------

    /// Register a callback on `node`; always succeeds, appending to the
    /// node's subscriber list (insertion order, P4).
    pub fn subscribe(
        &mut self,
        node: NodeId,
        callback: impl FnMut(&mut Context, &[NodeId]) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.node_mut(node).header.subscribers.push(Subscriber {
            id,
            callback: Rc::new(RefCell::new(callback)),
        });
        id
    }

    /// Remove exactly the registration named by `subscription`.
    /// `no-subscriber` if it is not present on `node`.
    pub fn unsubscribe(&mut self, node: NodeId, subscription: SubscriptionId) -> Result<(), VsdError> {
        let subs = &mut self.node_mut(node).header.subscribers;
        let pos = subs.iter().position(|s| s.id == subscription).ok_or_else(VsdError::no_subscriber)?;
        subs.remove(pos);
        Ok(())
    }

    /// Walk from `published_root` up to the tree root inclusive, invoking
    /// every subscriber on each ancestor in insertion order with the full
    /// touched-leaves list (§4.4 dispatch).
    fn dispatch(&mut self, published_root: NodeId, touched: &[NodeId]) {
        let mut current = Some(published_root);
        while let Some(id) = current {
            let callbacks: Vec<_> = self.node(id).header.subscribers.iter().map(|s| s.callback.clone()).collect();
            for callback in callbacks {
                callback.borrow_mut()(self, touched);
            }
            current = self.node(id).header.parent;
        }
    }

    // ---- 4.5 / 4.6 publish and receive ------------------------------------

    /// Encode `root`'s subtree and hand it to `transport`, tagged with
    /// `root`'s subtree signature (§4.5). Does not dispatch locally —
    /// dispatch only ever runs on the receiving side, in [`Context::on_receive`].
    pub fn publish<T: Transport>(&mut self, root: NodeId, transport: &mut T) -> Result<(), VsdError> {
        let mut buf = Vec::new();
        codec::encode(self, root, &mut buf, codec::MAX_PAYLOAD)?;
        let tag = self.node(root).header.subtree_signature;
        #[cfg(feature = "tracing")]
        tracing::debug!(path = %self.path_of(root), bytes = buf.len(), "publish");
        transport.transmit(tag, &buf).map_err(|e| VsdError::transport(Box::new(e)))
    }

    /// Handle one inbound `(tag, bytes)` delivery (§4.6 `on_receive`):
    /// resolve the root by signature, reject a tag mismatch, decode, then
    /// dispatch. Returns the touched-leaves list on success.
    pub fn on_receive(&mut self, tag: u32, bytes: &[u8]) -> Result<Vec<NodeId>, VsdError> {
        let root = self.lookup_by_signature(tag).ok_or(VsdError::unknown_signature(tag))?;
        #[cfg(feature = "tracing")]
        tracing::debug!(tag, bytes = bytes.len(), "on_receive");
        let touched = codec::decode(self, bytes)?;
        self.dispatch(root, &touched);
        Ok(touched)
    }
}
