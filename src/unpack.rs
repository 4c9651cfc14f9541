//! Parsing untrusted wire input into a freshly allocated record.
//!
//! One pass, merging into a blank record as fields arrive: scalars last-wins,
//! repeated fields concatenate, non-repeated submessages merge recursively.
//! Unknown tags, and known tags whose wire type the declared type cannot
//! accept, are preserved verbatim. Every owned block is charged to the
//! caller's allocator before it is created, and any failure releases every
//! charge before returning.

use crate::alloc::{element_charge, payload_charge, record_charge, unknown_charge, Allocator};
use crate::descriptor::{FieldDescriptor, FieldKind, Label, MessageDescriptor};
use crate::error::{
    UnpackError, INVALID_UTF8, INVALID_VARINT, RECURSION_LIMIT, UNMATCHED_END_GROUP,
};
use crate::value::{FieldValue, MessageValue, UnknownField, Value};
use crate::varint;
use crate::wire::{WireReader, WireType};

/// Knobs for a single parse.
#[derive(Clone, Debug)]
pub struct UnpackOptions {
    /// Maximum submessage nesting before the input is rejected as malformed.
    pub recursion_limit: u32,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            recursion_limit: 100,
        }
    }
}

impl MessageDescriptor {
    /// Parse `data` into a new record, charging every allocation to
    /// `allocator`. On error the heap is restored to its pre-call state.
    pub fn unpack(
        &'static self,
        allocator: &dyn Allocator,
        data: &[u8],
    ) -> Result<MessageValue, UnpackError> {
        self.unpack_with_options(allocator, &UnpackOptions::default(), data)
    }

    /// [`unpack`](Self::unpack) with explicit limits.
    pub fn unpack_with_options(
        &'static self,
        allocator: &dyn Allocator,
        options: &UnpackOptions,
        data: &[u8],
    ) -> Result<MessageValue, UnpackError> {
        self.assert_magic();
        let mut ctx = UnpackContext {
            allocator,
            remaining_depth: options.recursion_limit,
            charged: 0,
        };
        match unpack_root(self, &mut ctx, data) {
            Ok(msg) => Ok(msg),
            Err(error) => {
                ctx.allocator.free(ctx.charged);
                tracing::debug!(
                    target: "protodyn",
                    message_type = self.name,
                    %error,
                    "unpack rejected input"
                );
                Err(error)
            }
        }
    }
}

fn unpack_root(
    descriptor: &'static MessageDescriptor,
    ctx: &mut UnpackContext<'_>,
    data: &[u8],
) -> Result<MessageValue, UnpackError> {
    ctx.charge(record_charge(descriptor))?;
    let mut msg = MessageValue::blank(descriptor);
    let mut reader = WireReader::new(data);
    merge_message(ctx, &mut reader, &mut msg)?;
    Ok(msg)
}

struct UnpackContext<'a> {
    allocator: &'a dyn Allocator,

    /// Submessage levels still available before the recursion limit trips.
    remaining_depth: u32,

    /// Running total of accepted charges, released wholesale on error.
    charged: usize,
}

impl UnpackContext<'_> {
    fn charge(&mut self, size: usize) -> Result<(), UnpackError> {
        self.allocator
            .alloc(size)
            .map_err(|_| UnpackError::allocation_failed())?;
        self.charged += size;
        Ok(())
    }

    fn release(&mut self, size: usize) {
        self.allocator.free(size);
        self.charged -= size;
    }

    fn descend(&mut self) -> Result<(), UnpackError> {
        match self.remaining_depth.checked_sub(1) {
            Some(depth) => {
                self.remaining_depth = depth;
                Ok(())
            }
            None => Err(UnpackError::malformed(RECURSION_LIMIT)),
        }
    }

    fn ascend(&mut self) {
        self.remaining_depth += 1;
    }
}

/// Whether an occurrence with this wire type may populate the field, or must
/// be preserved as an unknown field instead.
fn accepts(field: &FieldDescriptor, wire_type: WireType) -> bool {
    wire_type == field.kind.wire_type()
        || (wire_type == WireType::LengthPrefixed
            && field.label == Label::Repeated
            && field.kind.packable())
}

/// Merge every field of one message frame into `msg`.
fn merge_message(
    ctx: &mut UnpackContext<'_>,
    reader: &mut WireReader<'_>,
    msg: &mut MessageValue,
) -> Result<(), UnpackError> {
    while !reader.at_end() {
        let (tag, wire_type) = reader.read_key()?;
        match msg.descriptor().field(tag) {
            Some((index, field)) if accepts(field, wire_type) => {
                merge_field(ctx, reader, field, &mut msg.fields_mut()[index], wire_type)
                    .map_err(|e| e.with_field(tag))?;
            }
            // Unknown tag, or a wire type the declared type cannot accept.
            _ => capture_unknown(ctx, reader, msg, tag, wire_type)
                .map_err(|e| e.with_field(tag))?,
        }
    }
    Ok(())
}

/// Merge one occurrence of a known field into its storage slot.
fn merge_field(
    ctx: &mut UnpackContext<'_>,
    reader: &mut WireReader<'_>,
    field: &'static FieldDescriptor,
    slot: &mut FieldValue,
    wire_type: WireType,
) -> Result<(), UnpackError> {
    match slot {
        FieldValue::Repeated(items) => {
            if wire_type == WireType::LengthPrefixed && field.kind.packable() {
                // A packed block, whether or not the field was declared
                // packed: decoders accept both forms, intermixed.
                let length = reader.read_length()?;
                let mut block = reader.sub_reader(length);
                while !block.at_end() {
                    let value = decode_scalar(&mut block, field)
                        .map_err(|e| e.with_index(items.len()))?;
                    ctx.charge(element_charge())?;
                    items.push(value);
                }
            } else {
                let value =
                    decode_element(ctx, reader, field).map_err(|e| e.with_index(items.len()))?;
                ctx.charge(element_charge())?;
                items.push(value);
            }
            Ok(())
        }
        FieldValue::Single(single) => match field.kind {
            FieldKind::Message(child_descriptor) => {
                let length = reader.read_length()?;
                let mut block = reader.sub_reader(length);
                ctx.descend()?;
                let result = match single {
                    // A repeated occurrence of a non-repeated submessage
                    // merges into the record already built.
                    Some(Value::Message(existing)) => merge_message(ctx, &mut block, existing),
                    _ => {
                        ctx.charge(record_charge(child_descriptor)).and_then(|()| {
                            let mut child = MessageValue::blank(child_descriptor);
                            merge_message(ctx, &mut block, &mut child)?;
                            *single = Some(Value::Message(child));
                            Ok(())
                        })
                    }
                };
                ctx.ascend();
                result
            }
            FieldKind::String => {
                let value = decode_string(ctx, reader)?;
                replace_payload(ctx, single, Value::String(value));
                Ok(())
            }
            FieldKind::Bytes => {
                let value = decode_bytes(ctx, reader)?;
                replace_payload(ctx, single, Value::Bytes(value));
                Ok(())
            }
            // Scalars follow last-occurrence-wins.
            _ => {
                *single = Some(decode_scalar(reader, field)?);
                Ok(())
            }
        },
    }
}

/// Decode one expanded element of a repeated field.
fn decode_element(
    ctx: &mut UnpackContext<'_>,
    reader: &mut WireReader<'_>,
    field: &'static FieldDescriptor,
) -> Result<Value, UnpackError> {
    match field.kind {
        FieldKind::Message(child_descriptor) => {
            let length = reader.read_length()?;
            let mut block = reader.sub_reader(length);
            ctx.descend()?;
            let result = ctx.charge(record_charge(child_descriptor)).and_then(|()| {
                let mut child = MessageValue::blank(child_descriptor);
                merge_message(ctx, &mut block, &mut child)?;
                Ok(Value::Message(child))
            });
            ctx.ascend();
            result
        }
        FieldKind::String => Ok(Value::String(decode_string(ctx, reader)?)),
        FieldKind::Bytes => Ok(Value::Bytes(decode_bytes(ctx, reader)?)),
        _ => decode_scalar(reader, field),
    }
}

/// Decode one numeric/bool/enum payload. Never allocates.
fn decode_scalar(
    reader: &mut WireReader<'_>,
    field: &'static FieldDescriptor,
) -> Result<Value, UnpackError> {
    Ok(match &field.kind {
        // Plain int32 truncates the sign-extended 64-bit pattern.
        FieldKind::Int32 => Value::I32(reader.read_varint(INVALID_VARINT)? as i32),
        FieldKind::Sint32 => Value::I32(varint::unzigzag32(
            reader.read_varint(INVALID_VARINT)? as u32
        )),
        FieldKind::Int64 => Value::I64(reader.read_varint(INVALID_VARINT)? as i64),
        FieldKind::Sint64 => Value::I64(varint::unzigzag64(reader.read_varint(INVALID_VARINT)?)),
        FieldKind::Uint32 => Value::U32(reader.read_varint(INVALID_VARINT)? as u32),
        FieldKind::Uint64 => Value::U64(reader.read_varint(INVALID_VARINT)?),
        FieldKind::Bool => Value::Bool(reader.read_varint(INVALID_VARINT)? != 0),
        // Numbers outside the declared value set pass through untouched.
        FieldKind::Enum(_) => Value::Enum(reader.read_varint(INVALID_VARINT)? as i32),
        FieldKind::Sfixed32 => Value::I32(reader.read_u32_le()? as i32),
        FieldKind::Fixed32 => Value::U32(reader.read_u32_le()?),
        FieldKind::Float => Value::Float(reader.read_f32_le()?),
        FieldKind::Sfixed64 => Value::I64(reader.read_u64_le()? as i64),
        FieldKind::Fixed64 => Value::U64(reader.read_u64_le()?),
        FieldKind::Double => Value::Double(reader.read_f64_le()?),
        FieldKind::String | FieldKind::Bytes | FieldKind::Message(_) => {
            unreachable!("length-prefixed kinds are decoded by their callers")
        }
    })
}

fn decode_string(
    ctx: &mut UnpackContext<'_>,
    reader: &mut WireReader<'_>,
) -> Result<String, UnpackError> {
    let length = reader.read_length()?;
    let raw = reader.read_slice(length)?;
    let text = std::str::from_utf8(raw).map_err(|_| UnpackError::malformed(INVALID_UTF8))?;
    ctx.charge(payload_charge(text.len()))?;
    Ok(text.to_owned())
}

fn decode_bytes(
    ctx: &mut UnpackContext<'_>,
    reader: &mut WireReader<'_>,
) -> Result<Vec<u8>, UnpackError> {
    let length = reader.read_length()?;
    let raw = reader.read_slice(length)?;
    ctx.charge(payload_charge(raw.len()))?;
    Ok(raw.to_vec())
}

/// Last-occurrence-wins for an owned payload: install the new value and
/// release the charge held by the one it displaced.
fn replace_payload(ctx: &mut UnpackContext<'_>, single: &mut Option<Value>, value: Value) {
    match single.replace(value) {
        Some(Value::String(old)) => ctx.release(payload_charge(old.len())),
        Some(Value::Bytes(old)) => ctx.release(payload_charge(old.len())),
        Some(_) | None => {}
    }
}

/// Preserve one occurrence whose tag or wire type the schema cannot place.
fn capture_unknown(
    ctx: &mut UnpackContext<'_>,
    reader: &mut WireReader<'_>,
    msg: &mut MessageValue,
    tag: u32,
    wire_type: WireType,
) -> Result<(), UnpackError> {
    // A bare end-group key has no opening to match.
    if wire_type == WireType::EndGroup {
        return Err(UnpackError::malformed(UNMATCHED_END_GROUP));
    }
    let raw = reader.capture_value(tag, wire_type)?;
    ctx.charge(unknown_charge(raw.len()))?;
    tracing::trace!(target: "protodyn", tag, "preserving unknown field");
    msg.push_unknown(UnknownField {
        tag,
        wire_type,
        data: raw.to_vec(),
    });
    Ok(())
}
