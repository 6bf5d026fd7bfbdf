//! Vehicle signal distribution core: the typed signal tree, its binary wire
//! codec, and the subscription bus that fans a decoded update out to every
//! ancestor of the updated node.
//!
//! Build a [`Context`] with [`builder::TreeBuilder`], mutate leaves through
//! its typed setters, then [`Context::publish`] a subtree across a
//! [`transport::Transport`]; the receiving peer's [`Context::on_receive`]
//! decodes the payload and dispatches to subscribers.
//!
//! # Example
//!
//! ```
//! use vsd_tree::builder::{BuilderConfig, TreeBuilder};
//! use vsd_tree::transport::MemoryTransport;
//!
//! let csv = "Vehicle,1,branch,none,,,,,,\nVehicle.Speed,101,sensor,u16,,,,,,\n";
//! let mut a = TreeBuilder::new(BuilderConfig::default()).load_str(csv).unwrap().finish().unwrap();
//! let mut b = TreeBuilder::new(BuilderConfig::default()).load_str(csv).unwrap().finish().unwrap();
//!
//! let speed_a = a.lookup_by_path("Vehicle.Speed").unwrap();
//! a.set_u16(speed_a, 42).unwrap();
//!
//! let mut transport = MemoryTransport::new();
//! a.publish(speed_a, &mut transport).unwrap();
//!
//! let (tag, bytes) = transport.pop().unwrap();
//! b.on_receive(tag, &bytes).unwrap();
//! let speed_b = b.lookup_by_path("Vehicle.Speed").unwrap();
//! assert_eq!(b.current_value(speed_b).unwrap(), &vsd_common::Value::U16(42));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

/// CSV-driven tree construction (§10, ambient).
pub mod builder;
/// Encode/decode one subtree as a flat byte sequence (§4.3).
pub mod codec;
/// The tagged node shape and arena index type (§9 design notes).
pub mod node;
/// 32-bit subtree signature computation (I3).
pub mod signature;
/// Subscriber storage shared between the tree and the bus (§4.4).
pub mod subscription;
/// The signal tree itself: lookup, mutation, subscribe, publish (§4.1-§4.5).
pub mod tree;
/// The abstract transport contract plus an in-memory test double (§4.6).
pub mod transport;

pub use node::{NodeId, SubscriptionId};
pub use tree::Context;
pub use transport::{MemoryTransport, Transport};
