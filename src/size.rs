//! Exact encoded-size computation, with submessage lengths queued for the
//! pack pass so each body is measured exactly once.

use crate::descriptor::{FieldDescriptor, FieldKind};
use crate::value::{FieldValue, MessageValue, Value};
use crate::varint;
use crate::wire;

/// Body lengths recorded during the sizing pass, consumed in the same
/// traversal order by the pack pass.
///
/// A submessage's length is needed before its body is walked, so sizing
/// reserves the slot first and fills it once the recursion returns; packed
/// blocks have no nested lengths and push directly.
pub(crate) struct SizeQueue {
    lengths: Vec<usize>,
    next: usize,
}

impl SizeQueue {
    pub(crate) fn new() -> Self {
        Self {
            lengths: Vec::new(),
            next: 0,
        }
    }

    fn reserve(&mut self) -> usize {
        self.lengths.push(0);
        self.lengths.len() - 1
    }

    fn set(&mut self, slot: usize, length: usize) {
        self.lengths[slot] = length;
    }

    fn push(&mut self, length: usize) {
        self.lengths.push(length);
    }

    pub(crate) fn take(&mut self) -> usize {
        let length = self.lengths[self.next];
        self.next += 1;
        length
    }

    pub(crate) fn drained(&self) -> bool {
        self.next == self.lengths.len()
    }
}

impl MessageValue {
    /// The exact number of bytes [`pack`](Self::pack) will emit.
    pub fn packed_size(&self) -> usize {
        self.descriptor().assert_magic();
        message_size(self, &mut SizeQueue::new())
    }
}

/// Size of a message body: known fields in ascending-tag order, then unknown
/// fields in arrival order.
pub(crate) fn message_size(msg: &MessageValue, queue: &mut SizeQueue) -> usize {
    let mut total = 0;
    for (field, slot) in msg.descriptor().fields.iter().zip(msg.fields()) {
        total += field_size(field, slot, queue);
    }
    for unknown in msg.unknown_fields() {
        total += varint::encoded_len(wire::key(unknown.tag, unknown.wire_type));
        total += unknown.data.len();
    }
    total
}

fn field_size(field: &FieldDescriptor, slot: &FieldValue, queue: &mut SizeQueue) -> usize {
    match slot {
        // Absent emits nothing; a missing required field is check()'s to report.
        FieldValue::Single(None) => 0,
        FieldValue::Single(Some(value)) => single_size(field, value, queue),
        FieldValue::Repeated(items) if items.is_empty() => 0,
        FieldValue::Repeated(items) => {
            if field.packed && field.kind.packable() {
                let body: usize = items
                    .iter()
                    .map(|item| scalar_size(field, item))
                    .sum();
                queue.push(body);
                key_size(field) + varint::encoded_len(body as u64) + body
            } else {
                items
                    .iter()
                    .map(|item| single_size(field, item, queue))
                    .sum()
            }
        }
    }
}

/// Size of one key-prefixed occurrence of a field.
fn single_size(field: &FieldDescriptor, value: &Value, queue: &mut SizeQueue) -> usize {
    match (&field.kind, value) {
        (FieldKind::Message(_), Value::Message(child)) => {
            let slot = queue.reserve();
            let body = message_size(child, queue);
            queue.set(slot, body);
            key_size(field) + varint::encoded_len(body as u64) + body
        }
        (FieldKind::String, Value::String(s)) => {
            key_size(field) + varint::encoded_len(s.len() as u64) + s.len()
        }
        (FieldKind::Bytes, Value::Bytes(b)) => {
            key_size(field) + varint::encoded_len(b.len() as u64) + b.len()
        }
        _ => key_size(field) + scalar_size(field, value),
    }
}

fn key_size(field: &FieldDescriptor) -> usize {
    varint::encoded_len(wire::key(field.tag, field.kind.wire_type()))
}

/// Payload size of one numeric/bool/enum value, without its key.
fn scalar_size(field: &FieldDescriptor, value: &Value) -> usize {
    match (&field.kind, value) {
        // Plain int32 sign-extends to 64 bits, so negatives cost ten bytes.
        (FieldKind::Int32, Value::I32(v)) => varint::encoded_len(*v as i64 as u64),
        (FieldKind::Enum(_), Value::Enum(v)) => varint::encoded_len(*v as i64 as u64),
        (FieldKind::Sint32, Value::I32(v)) => {
            varint::encoded_len(u64::from(varint::zigzag32(*v)))
        }
        (FieldKind::Int64, Value::I64(v)) => varint::encoded_len(*v as u64),
        (FieldKind::Sint64, Value::I64(v)) => varint::encoded_len(varint::zigzag64(*v)),
        (FieldKind::Uint32, Value::U32(v)) => varint::encoded_len(u64::from(*v)),
        (FieldKind::Uint64, Value::U64(v)) => varint::encoded_len(*v),
        (FieldKind::Bool, Value::Bool(_)) => 1,
        (FieldKind::Sfixed32, Value::I32(_))
        | (FieldKind::Fixed32, Value::U32(_))
        | (FieldKind::Float, Value::Float(_)) => 4,
        (FieldKind::Sfixed64, Value::I64(_))
        | (FieldKind::Fixed64, Value::U64(_))
        | (FieldKind::Double, Value::Double(_)) => 8,
        _ => kind_mismatch(field),
    }
}

/// Inputs to pack/sizing are caller-owned and assumed valid; a slot whose
/// value does not match the declared kind is unrecoverable misuse.
pub(crate) fn kind_mismatch(field: &FieldDescriptor) -> ! {
    panic!(
        "value does not match the declared kind of field {} (tag {})",
        field.name, field.tag,
    )
}
