//! Encode/decode one subtree as a flat, self-delimiting byte sequence (§4.3)

use vsd_common::{DataKind, Value, VsdError};

use crate::node::{NodeId, NodeKind};
use crate::tree::Context;

/// Upper bound on one published payload (§4.5); also the largest string a
/// wire record can carry, since the length field is two bytes.
pub const MAX_PAYLOAD: usize = 65_280;

/// Encode `root`'s subtree (pre-order over the canonical child order) into
/// `out`, appending. Fails with `no-space` and leaves `out` untouched beyond
/// its prior contents if the subtree would not fit within `cap` bytes total.
pub fn encode(ctx: &Context, root: NodeId, out: &mut Vec<u8>, cap: usize) -> Result<(), VsdError> {
    encode_node(ctx, root, out, cap)
}

fn encode_node(ctx: &Context, id: NodeId, out: &mut Vec<u8>, cap: usize) -> Result<(), VsdError> {
    let node = ctx.node(id);
    match &node.kind {
        NodeKind::Branch { children } => {
            for &child in children {
                encode_node(ctx, child, out, cap)?;
            }
            Ok(())
        }
        NodeKind::Leaf { value, .. } | NodeKind::Enum { value, .. } => {
            encode_leaf(node.header.subtree_signature, value, out, cap)
        }
    }
}

fn record_len(value: &Value) -> usize {
    4 + match value {
        Value::I8(_) | Value::U8(_) | Value::Bool(_) => 1,
        Value::I16(_) | Value::U16(_) => 2,
        Value::I32(_) | Value::U32(_) | Value::F32(_) => 4,
        Value::F64(_) => 8,
        Value::String(cell) => 2 + cell.len(),
    }
}

fn encode_leaf(signature: u32, value: &Value, out: &mut Vec<u8>, cap: usize) -> Result<(), VsdError> {
    let needed = out.len() + record_len(value);
    if needed > cap {
        return Err(VsdError::no_space(needed, cap));
    }
    out.extend_from_slice(&signature.to_le_bytes());
    match value {
        Value::I8(v) => out.push(*v as u8),
        Value::U8(v) => out.push(*v),
        Value::I16(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Bool(v) => out.push(*v as u8),
        Value::String(cell) => {
            out.extend_from_slice(&(cell.len() as u16).to_le_bytes());
            out.extend_from_slice(cell.as_str().as_bytes());
        }
    }
    Ok(())
}

/// Decode a payload produced by [`encode`], writing values into `ctx` in
/// place and returning the leaves touched, in the order they were decoded.
///
/// An unresolvable signature, a branch signature, or a non-transportable
/// data kind (`stream`/`none`) all fail the whole payload; values already
/// written by earlier records in this call stay written (there is no
/// rollback — the source has the same behavior, since a payload this
/// malformed indicates a specification mismatch the caller must resolve
/// before trusting anything from this peer again).
pub fn decode(ctx: &mut Context, bytes: &[u8]) -> Result<Vec<NodeId>, VsdError> {
    let mut touched = Vec::new();
    let mut pos = 0usize;
    while pos < bytes.len() {
        let signature = read_u32(bytes, &mut pos)?;
        let id = ctx
            .lookup_by_signature(signature)
            .ok_or(VsdError::unknown_signature(signature))?;
        let data_kind = ctx.node(id).header.data_kind;
        if ctx.node(id).kind.is_branch() {
            return Err(VsdError::unsupported_kind(format!(
                "signature 0x{signature:08x} names a branch"
            )));
        }
        if !data_kind.is_transportable() {
            return Err(VsdError::unsupported_kind(format!("{data_kind} leaf in payload")));
        }
        let value = match data_kind.fixed_width() {
            Some(width) => decode_scalar(data_kind, read_bytes(bytes, &mut pos, width)?),
            None => {
                let len = read_u16(bytes, &mut pos)? as usize;
                let raw = read_bytes(bytes, &mut pos, len)?;
                let s = std::str::from_utf8(raw)
                    .map_err(|_| VsdError::invalid_argument("payload string is not valid utf-8"))?;
                Value::parse(DataKind::String, s)?
            }
        };
        ctx.write_value(id, value)?;
        touched.push(id);
    }
    Ok(touched)
}

fn decode_scalar(kind: DataKind, raw: &[u8]) -> Value {
    match kind {
        DataKind::I8 => Value::I8(raw[0] as i8),
        DataKind::U8 => Value::U8(raw[0]),
        DataKind::Bool => Value::Bool(raw[0] != 0),
        DataKind::I16 => Value::I16(i16::from_le_bytes(raw.try_into().unwrap())),
        DataKind::U16 => Value::U16(u16::from_le_bytes(raw.try_into().unwrap())),
        DataKind::I32 => Value::I32(i32::from_le_bytes(raw.try_into().unwrap())),
        DataKind::U32 => Value::U32(u32::from_le_bytes(raw.try_into().unwrap())),
        DataKind::F32 => Value::F32(f32::from_le_bytes(raw.try_into().unwrap())),
        DataKind::F64 => Value::F64(f64::from_le_bytes(raw.try_into().unwrap())),
        DataKind::String | DataKind::Stream | DataKind::None => {
            unreachable!("fixed_width() returns None for these kinds")
        }
    }
}

fn read_u32(bytes: &[u8], pos: &mut usize) -> Result<u32, VsdError> {
    Ok(u32::from_le_bytes(read_bytes(bytes, pos, 4)?.try_into().unwrap()))
}

fn read_u16(bytes: &[u8], pos: &mut usize) -> Result<u16, VsdError> {
    Ok(u16::from_le_bytes(read_bytes(bytes, pos, 2)?.try_into().unwrap()))
}

fn read_bytes<'b>(bytes: &'b [u8], pos: &mut usize, len: usize) -> Result<&'b [u8], VsdError> {
    if bytes.len() - *pos < len {
        return Err(VsdError::truncated(format!(
            "expected {len} more bytes at offset {pos}, found {}",
            bytes.len() - *pos
        )));
    }
    let slice = &bytes[*pos..*pos + len];
    *pos += len;
    Ok(slice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuilderConfig, TreeBuilder};

    fn sample_tree() -> Context {
        let csv = "Vehicle,1,branch,none,,,,,,\n\
                    Vehicle.Speed,101,sensor,u16,,,,,,\n\
                    Vehicle.Name,102,attribute,string,,,,,,\n\
                    Vehicle.Tiny,103,sensor,i8,,,,,,\n\
                    Vehicle.Small,104,sensor,i16,,,,,,\n\
                    Vehicle.Big,105,sensor,i32,,,,,,\n\
                    Vehicle.Ratio,106,sensor,f32,,,,,,\n\
                    Vehicle.Precise,107,sensor,f64,,,,,,\n";
        TreeBuilder::new(BuilderConfig::default())
            .load_str(csv)
            .unwrap()
            .finish()
            .unwrap()
    }

    #[test]
    fn round_trips_scalar_and_string_leaves() {
        let mut a = sample_tree();
        let mut b = sample_tree();

        let speed = a.lookup_by_path("Vehicle.Speed").unwrap();
        let name = a.lookup_by_path("Vehicle.Name").unwrap();
        let tiny = a.lookup_by_path("Vehicle.Tiny").unwrap();
        let small = a.lookup_by_path("Vehicle.Small").unwrap();
        let big = a.lookup_by_path("Vehicle.Big").unwrap();
        let ratio = a.lookup_by_path("Vehicle.Ratio").unwrap();
        let precise = a.lookup_by_path("Vehicle.Precise").unwrap();
        a.set_u16(speed, 42).unwrap();
        a.set_string(name, "ECU-7").unwrap();
        a.set_i8(tiny, -7).unwrap();
        a.set_i16(small, -2000).unwrap();
        a.set_i32(big, -70_000).unwrap();
        a.set_f32(ratio, 0.5).unwrap();
        a.set_f64(precise, 2.718281828).unwrap();

        let root = a.lookup_by_path("Vehicle").unwrap();
        let mut buf = Vec::new();
        encode(&a, root, &mut buf, MAX_PAYLOAD).unwrap();

        let touched = decode(&mut b, &buf).unwrap();
        assert_eq!(touched.len(), 7);

        let b_speed = b.lookup_by_path("Vehicle.Speed").unwrap();
        let b_name = b.lookup_by_path("Vehicle.Name").unwrap();
        let b_tiny = b.lookup_by_path("Vehicle.Tiny").unwrap();
        let b_small = b.lookup_by_path("Vehicle.Small").unwrap();
        let b_big = b.lookup_by_path("Vehicle.Big").unwrap();
        let b_ratio = b.lookup_by_path("Vehicle.Ratio").unwrap();
        let b_precise = b.lookup_by_path("Vehicle.Precise").unwrap();
        assert_eq!(b.current_value(b_speed).unwrap().clone(), Value::U16(42));
        assert_eq!(b.current_value(b_name).unwrap().as_str(), Some("ECU-7"));
        assert_eq!(b.current_value(b_tiny).unwrap().clone(), Value::I8(-7));
        assert_eq!(b.current_value(b_small).unwrap().clone(), Value::I16(-2000));
        assert_eq!(b.current_value(b_big).unwrap().clone(), Value::I32(-70_000));
        assert_eq!(b.current_value(b_ratio).unwrap().clone(), Value::F32(0.5));
        assert_eq!(b.current_value(b_precise).unwrap().clone(), Value::F64(2.718281828));
    }

    #[test]
    fn encode_reports_no_space_without_partial_write() {
        let mut a = sample_tree();
        let name = a.lookup_by_path("Vehicle.Name").unwrap();
        a.set_string(name, "a value long enough to not fit").unwrap();
        let root = a.lookup_by_path("Vehicle").unwrap();
        let mut buf = Vec::new();
        let err = encode(&a, root, &mut buf, 8).unwrap_err();
        assert_eq!(err.kind(), vsd_common::VsdErrorKind::NoSpace);
    }

    #[test]
    fn decode_rejects_unknown_signature() {
        let mut b = sample_tree();
        let mut bogus = Vec::new();
        bogus.extend_from_slice(&0xdead_beefu32.to_le_bytes());
        bogus.extend_from_slice(&1u16.to_le_bytes());
        let err = decode(&mut b, &bogus).unwrap_err();
        assert_eq!(err.kind(), vsd_common::VsdErrorKind::UnknownSignature);
    }
}
