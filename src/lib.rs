//! Descriptor-driven Protocol Buffers wire-format runtime.
//!
//! Descriptors are static, read-only tables emitted by an external code
//! generator; this crate is the engine that walks them. Given a
//! [`MessageDescriptor`] it sizes and serializes a [`MessageValue`] to the
//! standard wire format, parses untrusted bytes back into one, validates
//! required-field presence, and answers descriptor lookups.
//!
//! Encode and decode are pure transformations over caller memory: no I/O, no
//! background work. Descriptors may be shared freely across threads; a single
//! record may not be mutated concurrently. The decoder charges every
//! allocation to a caller-supplied [`Allocator`] and guarantees that any
//! rejected input leaves nothing outstanding.
//!
//! ```
//! use protodyn::{MessageDescriptor, SystemAllocator, Value};
//! # use protodyn::{FieldDescriptor, FieldKind, IntRange, Label, MESSAGE_DESCRIPTOR_MAGIC};
//! # static FIELDS: [FieldDescriptor; 1] = [FieldDescriptor {
//! #     name: "a",
//! #     tag: 1,
//! #     label: Label::Required,
//! #     kind: FieldKind::Int32,
//! #     packed: false,
//! #     deprecated: false,
//! #     default: None,
//! # }];
//! # static RANGES: [IntRange; 2] = [
//! #     IntRange { start_value: 1, orig_index: 0 },
//! #     IntRange { start_value: 2, orig_index: 1 },
//! # ];
//! # static BY_NAME: [u32; 1] = [0];
//! # static TEST: MessageDescriptor = MessageDescriptor {
//! #     magic: MESSAGE_DESCRIPTOR_MAGIC,
//! #     name: "example.Test",
//! #     fields: &FIELDS,
//! #     fields_sorted_by_name: &BY_NAME,
//! #     field_ranges: &RANGES,
//! # };
//! let mut msg = protodyn::MessageValue::new(&TEST);
//! msg.set(1, Value::I32(150));
//!
//! let mut wire = vec![0; msg.packed_size()];
//! msg.pack(&mut wire);
//!
//! let back = TEST.unpack(&SystemAllocator, &wire).unwrap();
//! assert_eq!(back, msg);
//! ```

mod alloc;
mod descriptor;
mod error;
mod lookup;
mod pack;
mod service;
mod size;
mod unpack;
mod value;
mod varint;
mod wire;

pub use alloc::{AllocationFailed, Allocator, SystemAllocator};
pub use descriptor::{
    DefaultValue, EnumDescriptor, EnumValue, EnumValueIndex, FieldDescriptor, FieldKind, IntRange,
    Label, MessageDescriptor, MethodDescriptor, ServiceDescriptor, ENUM_DESCRIPTOR_MAGIC,
    MESSAGE_DESCRIPTOR_MAGIC, SERVICE_DESCRIPTOR_MAGIC,
};
pub use error::{UnpackError, UnpackErrorKind};
pub use pack::PackSink;
pub use service::Service;
pub use unpack::UnpackOptions;
pub use value::{FieldValue, MessageValue, UnknownField, Value};
pub use wire::WireType;
