//! Subscriber storage for the bus (§4.4)
//!
//! Dispatch needs to call back into the same [`crate::tree::Context`] that
//! owns the subscriber list being walked — a callback is free to mutate
//! values or even publish again. Storing callbacks behind `Rc<RefCell<_>>`
//! lets dispatch clone the handle, drop its borrow on the node's subscriber
//! list, and only then invoke the callback with a fresh `&mut Context`,
//! avoiding a double borrow. This is the single-threaded analogue of the
//! `Arc<RwLock<_>>` shared-state idiom used elsewhere for concurrent access;
//! here there is no concurrency (§5), only re-entrancy to guard against.

use std::cell::RefCell;
use std::rc::Rc;

use crate::node::NodeId;
use crate::tree::Context;

/// A subscriber callback: given the context and the full list of leaves
/// touched by one decoded payload, do whatever the application needs.
pub type Callback = dyn FnMut(&mut Context, &[NodeId]);

pub(crate) type SharedCallback = Rc<RefCell<Callback>>;
