//! In-memory message instances shaped by their descriptors.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::alloc::{element_charge, payload_charge, record_charge, unknown_charge, Allocator};
use crate::descriptor::{
    DefaultValue, FieldDescriptor, FieldKind, Label, MessageDescriptor,
};
use crate::wire::WireType;

/// A single decoded value.
///
/// Storage-typed: one variant serves every declared type that shares a Rust
/// representation (`I32` holds int32, sint32, and sfixed32 alike). The field
/// descriptor's [`kind`](FieldDescriptor::kind), not the value, selects the
/// wire form.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    Float(f32),
    Double(f64),
    Bool(bool),
    /// Raw enum number; values outside the declared set are preserved.
    Enum(i32),
    String(String),
    Bytes(Vec<u8>),
    Message(MessageValue),
}

/// Storage for one field of a message instance.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// REQUIRED or OPTIONAL storage; `None` is absent.
    Single(Option<Value>),
    /// REPEATED storage, packed or expanded.
    Repeated(Vec<Value>),
}

impl FieldValue {
    fn single(&self) -> &Option<Value> {
        match self {
            Self::Single(slot) => slot,
            Self::Repeated(_) => panic!("repeated field accessed as singular"),
        }
    }
}

/// A wire field whose tag the local schema does not know, retained verbatim.
///
/// `data` holds the raw bytes following the key: the varint bytes, the fixed
/// 4 or 8 bytes, the length prefix plus payload, or (for a group) the body
/// through the matching end-group key.
#[derive(Clone, Debug, PartialEq)]
pub struct UnknownField {
    pub tag: u32,
    pub wire_type: WireType,
    pub data: Vec<u8>,
}

/// An instance of a message: a slot per descriptor field, plus any unknown
/// fields in arrival order.
#[derive(Clone)]
pub struct MessageValue {
    descriptor: &'static MessageDescriptor,
    fields: Vec<FieldValue>,
    unknown: Vec<UnknownField>,
}

impl MessageValue {
    /// Initialize a blank instance: declared defaults installed, optional
    /// presence cleared, repeated fields empty. Performs no accounting; the
    /// record is caller-owned and must not be passed to
    /// [`free_unpacked`](Self::free_unpacked).
    pub fn new(descriptor: &'static MessageDescriptor) -> Self {
        descriptor.assert_magic();
        let fields = descriptor.fields.iter().map(initial_slot).collect();
        Self {
            descriptor,
            fields,
            unknown: Vec::new(),
        }
    }

    /// An instance with every field absent, the starting point for `unpack`,
    /// where a missing required field must stay observable.
    pub(crate) fn blank(descriptor: &'static MessageDescriptor) -> Self {
        descriptor.assert_magic();
        let fields = descriptor
            .fields
            .iter()
            .map(|field| match field.label {
                Label::Repeated => FieldValue::Repeated(Vec::new()),
                Label::Required | Label::Optional => FieldValue::Single(None),
            })
            .collect();
        Self {
            descriptor,
            fields,
            unknown: Vec::new(),
        }
    }

    pub fn descriptor(&self) -> &'static MessageDescriptor {
        self.descriptor
    }

    /// Field slots, parallel to `descriptor().fields`.
    pub fn fields(&self) -> &[FieldValue] {
        &self.fields
    }

    pub fn unknown_fields(&self) -> &[UnknownField] {
        &self.unknown
    }

    /// Storage slot for the field with the given tag.
    pub fn field(&self, tag: u32) -> Option<&FieldValue> {
        let (index, _) = self.descriptor.field(tag)?;
        Some(&self.fields[index])
    }

    /// The value of a singular field, or `None` when absent.
    pub fn get(&self, tag: u32) -> Option<&Value> {
        self.field(tag)?.single().as_ref()
    }

    /// Set a singular field. The tag must name a REQUIRED or OPTIONAL field
    /// of this message type.
    pub fn set(&mut self, tag: u32, value: Value) {
        match self.slot_mut(tag) {
            FieldValue::Single(slot) => *slot = Some(value),
            FieldValue::Repeated(_) => panic!("repeated field assigned as singular"),
        }
    }

    /// Append an element to a REPEATED field.
    pub fn push(&mut self, tag: u32, value: Value) {
        match self.slot_mut(tag) {
            FieldValue::Repeated(items) => items.push(value),
            FieldValue::Single(_) => panic!("singular field extended as repeated"),
        }
    }

    /// Clear a field back to absence (or emptiness, for repeated fields).
    pub fn clear(&mut self, tag: u32) {
        match self.slot_mut(tag) {
            FieldValue::Single(slot) => *slot = None,
            FieldValue::Repeated(items) => items.clear(),
        }
    }

    fn slot_mut(&mut self, tag: u32) -> &mut FieldValue {
        let (index, _) = self
            .descriptor
            .field(tag)
            .unwrap_or_else(|| panic!("no field {} in {}", tag, self.descriptor.name));
        &mut self.fields[index]
    }

    pub(crate) fn fields_mut(&mut self) -> &mut [FieldValue] {
        &mut self.fields
    }

    pub(crate) fn push_unknown(&mut self, unknown: UnknownField) {
        self.unknown.push(unknown);
    }

    /// Whether every REQUIRED field is present, recursing through every
    /// present submessage. Enum membership is not validated.
    pub fn check(&self) -> bool {
        self.descriptor.assert_magic();
        for (field, slot) in self.descriptor.fields.iter().zip(&self.fields) {
            match slot {
                FieldValue::Single(None) => {
                    if field.label == Label::Required {
                        return false;
                    }
                }
                FieldValue::Single(Some(Value::Message(child))) => {
                    if !child.check() {
                        return false;
                    }
                }
                FieldValue::Single(Some(_)) => {}
                FieldValue::Repeated(items) => {
                    for item in items {
                        if let Value::Message(child) = item {
                            if !child.check() {
                                return false;
                            }
                        }
                    }
                }
            }
        }
        true
    }

    /// Release a record produced by `unpack`, returning every charge to the
    /// allocator that accepted it. Must not be called on records built with
    /// [`new`](Self::new); those were never charged.
    pub fn free_unpacked(self, allocator: &dyn Allocator) {
        release_message(self, allocator);
    }
}

fn release_message(msg: MessageValue, allocator: &dyn Allocator) {
    allocator.free(record_charge(msg.descriptor));
    for slot in msg.fields {
        match slot {
            FieldValue::Single(Some(value)) => release_value(value, allocator),
            FieldValue::Single(None) => {}
            FieldValue::Repeated(items) => {
                allocator.free(items.len() * element_charge());
                for item in items {
                    release_value(item, allocator);
                }
            }
        }
    }
    for unknown in msg.unknown {
        allocator.free(unknown_charge(unknown.data.len()));
    }
}

fn release_value(value: Value, allocator: &dyn Allocator) {
    match value {
        Value::String(s) => allocator.free(payload_charge(s.len())),
        Value::Bytes(b) => allocator.free(payload_charge(b.len())),
        Value::Message(child) => release_message(child, allocator),
        _ => {}
    }
}

/// Init-time storage for one field, per its label, kind, and default.
fn initial_slot(field: &FieldDescriptor) -> FieldValue {
    match field.label {
        Label::Repeated => FieldValue::Repeated(Vec::new()),
        Label::Optional => FieldValue::Single(None),
        Label::Required => FieldValue::Single(match (&field.kind, &field.default) {
            (_, Some(default)) => Some(default.to_value()),
            // An unset required pointer field stays absent until the caller
            // fills it in; check() reports it meanwhile.
            (FieldKind::Message(_) | FieldKind::String | FieldKind::Bytes, None) => None,
            (kind, None) => Some(zero_value(kind)),
        }),
    }
}

/// The type's zero value, used where no default was declared.
pub(crate) fn zero_value(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Int32 | FieldKind::Sint32 | FieldKind::Sfixed32 => Value::I32(0),
        FieldKind::Int64 | FieldKind::Sint64 | FieldKind::Sfixed64 => Value::I64(0),
        FieldKind::Uint32 | FieldKind::Fixed32 => Value::U32(0),
        FieldKind::Uint64 | FieldKind::Fixed64 => Value::U64(0),
        FieldKind::Float => Value::Float(0.0),
        FieldKind::Double => Value::Double(0.0),
        FieldKind::Bool => Value::Bool(false),
        FieldKind::Enum(_) => Value::Enum(0),
        FieldKind::String => Value::String(String::new()),
        FieldKind::Bytes => Value::Bytes(Vec::new()),
        FieldKind::Message(_) => panic!("message fields have no zero value"),
    }
}

impl DefaultValue {
    pub(crate) fn to_value(&self) -> Value {
        match self {
            Self::I32(v) => Value::I32(*v),
            Self::I64(v) => Value::I64(*v),
            Self::U32(v) => Value::U32(*v),
            Self::U64(v) => Value::U64(*v),
            Self::Float(v) => Value::Float(*v),
            Self::Double(v) => Value::Double(*v),
            Self::Bool(v) => Value::Bool(*v),
            Self::Enum(v) => Value::Enum(*v),
            Self::String(v) => Value::String((*v).to_string()),
            Self::Bytes(v) => Value::Bytes(v.to_vec()),
        }
    }
}

/// Structural equality: same message type, same field storage, same unknown
/// fields in the same order.
impl PartialEq for MessageValue {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.descriptor, other.descriptor)
            && self.fields == other.fields
            && self.unknown == other.unknown
    }
}

impl Debug for MessageValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut out = f.debug_struct(self.descriptor.name);
        for (field, slot) in self.descriptor.fields.iter().zip(&self.fields) {
            out.field(field.name, slot);
        }
        if !self.unknown.is_empty() {
            out.field("unknown", &self.unknown);
        }
        out.finish()
    }
}
