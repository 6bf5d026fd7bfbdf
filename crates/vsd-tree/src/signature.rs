//! Computing the 32-bit `subtree_signature` (I3)
//!
//! A signature must be equal on two peers iff their specifications agree for
//! that logical node, and a branch's signature must depend on the signatures
//! of all of its children in order, so that any shape change anywhere in a
//! subtree changes every ancestor's signature too. A cryptographic hash
//! truncated to 32 bits gives us that without needing a bespoke mixing
//! function; `sha2` is already part of this workspace's dependency stack.

use sha2::{Digest, Sha256};
use smol_str::SmolStr;
use vsd_common::{DataKind, ElementKind, Value};

/// Accumulates the canonical byte representation of one node's layout.
///
/// Field order is fixed (name, element kind, data kind, bounds, allowed
/// values, then — for branches — each child's already-computed signature in
/// declared order) so that two builders fed byte-identical specifications
/// produce byte-identical digests.
#[derive(Default)]
pub struct SignatureInput {
    bytes: Vec<u8>,
}

impl SignatureInput {
    /// Start accumulating the layout for a leaf or branch header.
    pub fn new(name: &str, element_kind: ElementKind, data_kind: DataKind) -> Self {
        let mut input = Self::default();
        input.push_str(name);
        input.push_str(&element_kind.to_string());
        input.push_str(&data_kind.to_string());
        input
    }

    /// Fold in an optional bound.
    pub fn push_bound(&mut self, bound: Option<&Value>) {
        match bound {
            Some(v) => self.push_str(&format!("{v:?}")),
            None => self.bytes.push(0xff),
        }
    }

    /// Fold in the declared allowed-values set, in declaration order.
    pub fn push_allowed_values(&mut self, allowed: &[SmolStr]) {
        for v in allowed {
            self.push_str(v);
        }
    }

    /// Fold in a child's already-computed signature (branches only).
    pub fn push_child_signature(&mut self, signature: u32) {
        self.bytes.extend_from_slice(&signature.to_le_bytes());
    }

    fn push_str(&mut self, s: &str) {
        self.bytes.extend_from_slice(&(s.len() as u32).to_le_bytes());
        self.bytes.extend_from_slice(s.as_bytes());
    }

    /// Finish: truncate the digest to the wire-sized u32.
    pub fn finish(self) -> u32 {
        let digest = Sha256::digest(&self.bytes);
        u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_layouts_produce_identical_signatures() {
        let mut a = SignatureInput::new("Speed", ElementKind::Sensor, DataKind::U16);
        a.push_bound(None);
        a.push_bound(None);
        let mut b = SignatureInput::new("Speed", ElementKind::Sensor, DataKind::U16);
        b.push_bound(None);
        b.push_bound(None);
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn differing_names_produce_differing_signatures() {
        let a = SignatureInput::new("Speed", ElementKind::Sensor, DataKind::U16).finish();
        let b = SignatureInput::new("RPM", ElementKind::Sensor, DataKind::U16).finish();
        assert_ne!(a, b);
    }
}
