//! Serialization of a message instance to the wire format.
//!
//! Two surfaces, one engine: a contiguous buffer the caller has sized with
//! [`packed_size`](crate::MessageValue::packed_size), or an append-only
//! [`PackSink`]. Both produce byte-identical output: known fields in
//! ascending-tag order, unknown fields last in arrival order.

use crate::descriptor::{FieldDescriptor, FieldKind};
use crate::size::{kind_mismatch, message_size, SizeQueue};
use crate::value::{FieldValue, MessageValue, Value};
use crate::varint::{self, MAX_VARINT_LEN};
use crate::wire::{self, WireType};

/// Append-only byte sink for streaming serialization.
pub trait PackSink {
    fn append(&mut self, data: &[u8]);
}

impl PackSink for Vec<u8> {
    fn append(&mut self, data: &[u8]) {
        self.extend_from_slice(data);
    }
}

/// Internal write surface shared by the buffer and sink engines.
trait WireWrite {
    fn put(&mut self, data: &[u8]);
}

/// Writes into a caller-supplied slice; running past the end is a caller
/// contract violation and panics.
struct SliceWriter<'a> {
    out: &'a mut [u8],
    pos: usize,
}

impl WireWrite for SliceWriter<'_> {
    fn put(&mut self, data: &[u8]) {
        let end = self.pos + data.len();
        self.out[self.pos..end].copy_from_slice(data);
        self.pos = end;
    }
}

struct SinkWriter<'a> {
    sink: &'a mut dyn PackSink,
    written: usize,
}

impl WireWrite for SinkWriter<'_> {
    fn put(&mut self, data: &[u8]) {
        self.sink.append(data);
        self.written += data.len();
    }
}

impl MessageValue {
    /// Serialize into `out`, which must hold at least
    /// [`packed_size`](Self::packed_size) bytes. Returns the bytes written.
    pub fn pack(&self, out: &mut [u8]) -> usize {
        self.descriptor().assert_magic();
        let mut queue = SizeQueue::new();
        let total = message_size(self, &mut queue);
        assert!(
            out.len() >= total,
            "pack buffer holds {} bytes but the message needs {}",
            out.len(),
            total,
        );
        let mut writer = SliceWriter { out, pos: 0 };
        pack_message(self, &mut queue, &mut writer);
        debug_assert!(queue.drained());
        debug_assert_eq!(writer.pos, total);
        total
    }

    /// Serialize through an append-only sink. Byte-identical to
    /// [`pack`](Self::pack); returns the bytes appended.
    pub fn pack_to_sink(&self, sink: &mut dyn PackSink) -> usize {
        self.descriptor().assert_magic();
        let mut queue = SizeQueue::new();
        let total = message_size(self, &mut queue);
        let mut writer = SinkWriter { sink, written: 0 };
        pack_message(self, &mut queue, &mut writer);
        debug_assert!(queue.drained());
        debug_assert_eq!(writer.written, total);
        total
    }
}

fn pack_message(msg: &MessageValue, queue: &mut SizeQueue, w: &mut dyn WireWrite) {
    for (field, slot) in msg.descriptor().fields.iter().zip(msg.fields()) {
        pack_field(field, slot, queue, w);
    }
    for unknown in msg.unknown_fields() {
        put_varint(wire::key(unknown.tag, unknown.wire_type), w);
        w.put(&unknown.data);
    }
}

fn pack_field(
    field: &FieldDescriptor,
    slot: &FieldValue,
    queue: &mut SizeQueue,
    w: &mut dyn WireWrite,
) {
    match slot {
        FieldValue::Single(None) => {}
        FieldValue::Single(Some(value)) => pack_single(field, value, queue, w),
        // A packed repetition of zero elements emits nothing at all.
        FieldValue::Repeated(items) if items.is_empty() => {}
        FieldValue::Repeated(items) => {
            if field.packed && field.kind.packable() {
                put_varint(wire::key(field.tag, WireType::LengthPrefixed), w);
                put_varint(queue.take() as u64, w);
                for item in items {
                    pack_scalar(field, item, w);
                }
            } else {
                for item in items {
                    pack_single(field, item, queue, w);
                }
            }
        }
    }
}

/// One key-prefixed occurrence of a field.
fn pack_single(
    field: &FieldDescriptor,
    value: &Value,
    queue: &mut SizeQueue,
    w: &mut dyn WireWrite,
) {
    match (&field.kind, value) {
        (FieldKind::Message(_), Value::Message(child)) => {
            put_varint(wire::key(field.tag, WireType::LengthPrefixed), w);
            put_varint(queue.take() as u64, w);
            pack_message(child, queue, w);
        }
        (FieldKind::String, Value::String(s)) => {
            put_varint(wire::key(field.tag, WireType::LengthPrefixed), w);
            put_varint(s.len() as u64, w);
            w.put(s.as_bytes());
        }
        (FieldKind::Bytes, Value::Bytes(b)) => {
            put_varint(wire::key(field.tag, WireType::LengthPrefixed), w);
            put_varint(b.len() as u64, w);
            w.put(b);
        }
        _ => {
            put_varint(wire::key(field.tag, field.kind.wire_type()), w);
            pack_scalar(field, value, w);
        }
    }
}

/// The payload of one numeric/bool/enum value, without its key.
fn pack_scalar(field: &FieldDescriptor, value: &Value, w: &mut dyn WireWrite) {
    match (&field.kind, value) {
        // Plain int32 emits the sign-extended two's-complement pattern.
        (FieldKind::Int32, Value::I32(v)) => put_varint(*v as i64 as u64, w),
        (FieldKind::Enum(_), Value::Enum(v)) => put_varint(*v as i64 as u64, w),
        (FieldKind::Sint32, Value::I32(v)) => put_varint(u64::from(varint::zigzag32(*v)), w),
        (FieldKind::Int64, Value::I64(v)) => put_varint(*v as u64, w),
        (FieldKind::Sint64, Value::I64(v)) => put_varint(varint::zigzag64(*v), w),
        (FieldKind::Uint32, Value::U32(v)) => put_varint(u64::from(*v), w),
        (FieldKind::Uint64, Value::U64(v)) => put_varint(*v, w),
        (FieldKind::Bool, Value::Bool(v)) => w.put(&[u8::from(*v)]),
        (FieldKind::Sfixed32, Value::I32(v)) => w.put(&v.to_le_bytes()),
        (FieldKind::Fixed32, Value::U32(v)) => w.put(&v.to_le_bytes()),
        (FieldKind::Float, Value::Float(v)) => w.put(&v.to_le_bytes()),
        (FieldKind::Sfixed64, Value::I64(v)) => w.put(&v.to_le_bytes()),
        (FieldKind::Fixed64, Value::U64(v)) => w.put(&v.to_le_bytes()),
        (FieldKind::Double, Value::Double(v)) => w.put(&v.to_le_bytes()),
        _ => kind_mismatch(field),
    }
}

#[inline(always)]
fn put_varint(value: u64, w: &mut dyn WireWrite) {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = varint::encode(value, &mut buf);
    w.put(&buf[..len]);
}
