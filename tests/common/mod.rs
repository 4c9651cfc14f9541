//! Shared fixtures: hand-laid static descriptors standing in for generator
//! output, and an accounting allocator for leak checks.

#![allow(dead_code)]

use std::cell::Cell;

use protodyn::{
    AllocationFailed, Allocator, DefaultValue, EnumDescriptor, EnumValue, EnumValueIndex,
    FieldDescriptor, FieldKind, IntRange, Label, MessageDescriptor, ENUM_DESCRIPTOR_MAGIC,
    MESSAGE_DESCRIPTOR_MAGIC,
};

pub const fn field(
    name: &'static str,
    tag: u32,
    label: Label,
    kind: FieldKind,
) -> FieldDescriptor {
    FieldDescriptor {
        name,
        tag,
        label,
        kind,
        packed: false,
        deprecated: false,
        default: None,
    }
}

pub const fn packed_field(name: &'static str, tag: u32, kind: FieldKind) -> FieldDescriptor {
    FieldDescriptor {
        name,
        tag,
        label: Label::Repeated,
        kind,
        packed: true,
        deprecated: false,
        default: None,
    }
}

pub const fn defaulted_field(
    name: &'static str,
    tag: u32,
    label: Label,
    kind: FieldKind,
    default: DefaultValue,
) -> FieldDescriptor {
    FieldDescriptor {
        name,
        tag,
        label,
        kind,
        packed: false,
        deprecated: false,
        default: Some(default),
    }
}

// --- test.Basic: { required int32 a = 1; optional string b = 2; } ---

static BASIC_FIELDS: [FieldDescriptor; 2] = [
    field("a", 1, Label::Required, FieldKind::Int32),
    field("b", 2, Label::Optional, FieldKind::String),
];
static BASIC_BY_NAME: [u32; 2] = [0, 1];
static BASIC_RANGES: [IntRange; 2] = [
    IntRange {
        start_value: 1,
        orig_index: 0,
    },
    IntRange {
        start_value: 3,
        orig_index: 2,
    },
];
pub static BASIC: MessageDescriptor = MessageDescriptor {
    magic: MESSAGE_DESCRIPTOR_MAGIC,
    name: "test.Basic",
    fields: &BASIC_FIELDS,
    fields_sorted_by_name: &BASIC_BY_NAME,
    field_ranges: &BASIC_RANGES,
};

// --- test.Narrow: { optional int32 a = 1; } ---

static NARROW_FIELDS: [FieldDescriptor; 1] = [field("a", 1, Label::Optional, FieldKind::Int32)];
static NARROW_BY_NAME: [u32; 1] = [0];
static NARROW_RANGES: [IntRange; 2] = [
    IntRange {
        start_value: 1,
        orig_index: 0,
    },
    IntRange {
        start_value: 2,
        orig_index: 1,
    },
];
pub static NARROW: MessageDescriptor = MessageDescriptor {
    magic: MESSAGE_DESCRIPTOR_MAGIC,
    name: "test.Narrow",
    fields: &NARROW_FIELDS,
    fields_sorted_by_name: &NARROW_BY_NAME,
    field_ranges: &NARROW_RANGES,
};

// --- test.Signed: { required sint32 x = 1; } ---

static SIGNED_FIELDS: [FieldDescriptor; 1] = [field("x", 1, Label::Required, FieldKind::Sint32)];
static SIGNED_BY_NAME: [u32; 1] = [0];
static SIGNED_RANGES: [IntRange; 2] = [
    IntRange {
        start_value: 1,
        orig_index: 0,
    },
    IntRange {
        start_value: 2,
        orig_index: 1,
    },
];
pub static SIGNED: MessageDescriptor = MessageDescriptor {
    magic: MESSAGE_DESCRIPTOR_MAGIC,
    name: "test.Signed",
    fields: &SIGNED_FIELDS,
    fields_sorted_by_name: &SIGNED_BY_NAME,
    field_ranges: &SIGNED_RANGES,
};

// --- test.Packed: { repeated int32 nums = 4 [packed = true]; } ---

static PACKED_FIELDS: [FieldDescriptor; 1] = [packed_field("nums", 4, FieldKind::Int32)];
static PACKED_BY_NAME: [u32; 1] = [0];
static PACKED_RANGES: [IntRange; 2] = [
    IntRange {
        start_value: 4,
        orig_index: 0,
    },
    IntRange {
        start_value: 5,
        orig_index: 1,
    },
];
pub static PACKED: MessageDescriptor = MessageDescriptor {
    magic: MESSAGE_DESCRIPTOR_MAGIC,
    name: "test.Packed",
    fields: &PACKED_FIELDS,
    fields_sorted_by_name: &PACKED_BY_NAME,
    field_ranges: &PACKED_RANGES,
};

// --- test.Color: sparse enum with an alias ---

static COLOR_VALUES: [EnumValue; 4] = [
    EnumValue {
        name: "RED",
        value: 0,
    },
    EnumValue {
        name: "GREEN",
        value: 1,
    },
    EnumValue {
        name: "BLUE",
        value: 2,
    },
    EnumValue {
        name: "ULTRAVIOLET",
        value: 100,
    },
];
static COLOR_BY_NAME: [EnumValueIndex; 5] = [
    EnumValueIndex {
        name: "BLUE",
        index: 2,
    },
    EnumValueIndex {
        name: "CRIMSON",
        index: 0,
    },
    EnumValueIndex {
        name: "GREEN",
        index: 1,
    },
    EnumValueIndex {
        name: "RED",
        index: 0,
    },
    EnumValueIndex {
        name: "ULTRAVIOLET",
        index: 3,
    },
];
static COLOR_RANGES: [IntRange; 3] = [
    IntRange {
        start_value: 0,
        orig_index: 0,
    },
    IntRange {
        start_value: 100,
        orig_index: 3,
    },
    IntRange {
        start_value: 101,
        orig_index: 4,
    },
];
pub static COLOR: EnumDescriptor = EnumDescriptor {
    magic: ENUM_DESCRIPTOR_MAGIC,
    name: "test.Color",
    values: &COLOR_VALUES,
    values_by_name: &COLOR_BY_NAME,
    value_ranges: &COLOR_RANGES,
};

// --- test.Inner: { optional int32 id = 1; optional string note = 2; } ---

static INNER_FIELDS: [FieldDescriptor; 2] = [
    field("id", 1, Label::Optional, FieldKind::Int32),
    field("note", 2, Label::Optional, FieldKind::String),
];
static INNER_BY_NAME: [u32; 2] = [0, 1];
static INNER_RANGES: [IntRange; 2] = [
    IntRange {
        start_value: 1,
        orig_index: 0,
    },
    IntRange {
        start_value: 3,
        orig_index: 2,
    },
];
pub static INNER: MessageDescriptor = MessageDescriptor {
    magic: MESSAGE_DESCRIPTOR_MAGIC,
    name: "test.Inner",
    fields: &INNER_FIELDS,
    fields_sorted_by_name: &INNER_BY_NAME,
    field_ranges: &INNER_RANGES,
};

// --- test.Everything: one field of every kind, plus repetition ---

static EVERYTHING_FIELDS: [FieldDescriptor; 21] = [
    field("int32_value", 1, Label::Optional, FieldKind::Int32),
    field("sint32_value", 2, Label::Optional, FieldKind::Sint32),
    field("sfixed32_value", 3, Label::Optional, FieldKind::Sfixed32),
    field("int64_value", 4, Label::Optional, FieldKind::Int64),
    field("sint64_value", 5, Label::Optional, FieldKind::Sint64),
    field("sfixed64_value", 6, Label::Optional, FieldKind::Sfixed64),
    field("uint32_value", 7, Label::Optional, FieldKind::Uint32),
    field("fixed32_value", 8, Label::Optional, FieldKind::Fixed32),
    field("uint64_value", 9, Label::Optional, FieldKind::Uint64),
    field("fixed64_value", 10, Label::Optional, FieldKind::Fixed64),
    field("float_value", 11, Label::Optional, FieldKind::Float),
    field("double_value", 12, Label::Optional, FieldKind::Double),
    field("bool_value", 13, Label::Optional, FieldKind::Bool),
    field("color", 14, Label::Optional, FieldKind::Enum(&COLOR)),
    field("name", 15, Label::Optional, FieldKind::String),
    field("payload", 16, Label::Optional, FieldKind::Bytes),
    field("inner", 17, Label::Optional, FieldKind::Message(&INNER)),
    packed_field("numbers", 18, FieldKind::Int32),
    field("labels", 19, Label::Repeated, FieldKind::String),
    field("inners", 20, Label::Repeated, FieldKind::Message(&INNER)),
    packed_field("samples", 21, FieldKind::Double),
];
static EVERYTHING_BY_NAME: [u32; 21] = [
    12, 13, 11, 7, 9, 10, 16, 19, 0, 3, 18, 14, 17, 15, 20, 2, 5, 1, 4, 6, 8,
];
static EVERYTHING_RANGES: [IntRange; 2] = [
    IntRange {
        start_value: 1,
        orig_index: 0,
    },
    IntRange {
        start_value: 22,
        orig_index: 21,
    },
];
pub static EVERYTHING: MessageDescriptor = MessageDescriptor {
    magic: MESSAGE_DESCRIPTOR_MAGIC,
    name: "test.Everything",
    fields: &EVERYTHING_FIELDS,
    fields_sorted_by_name: &EVERYTHING_BY_NAME,
    field_ranges: &EVERYTHING_RANGES,
};

// --- test.Wrapper: { required Inner inner = 1; } ---

static WRAPPER_FIELDS: [FieldDescriptor; 1] =
    [field("inner", 1, Label::Required, FieldKind::Message(&INNER))];
static WRAPPER_BY_NAME: [u32; 1] = [0];
static WRAPPER_RANGES: [IntRange; 2] = [
    IntRange {
        start_value: 1,
        orig_index: 0,
    },
    IntRange {
        start_value: 2,
        orig_index: 1,
    },
];
pub static WRAPPER: MessageDescriptor = MessageDescriptor {
    magic: MESSAGE_DESCRIPTOR_MAGIC,
    name: "test.Wrapper",
    fields: &WRAPPER_FIELDS,
    fields_sorted_by_name: &WRAPPER_BY_NAME,
    field_ranges: &WRAPPER_RANGES,
};

// --- test.Node: { optional Node next = 1; } (self-referential) ---

static NODE_FIELDS: [FieldDescriptor; 1] =
    [field("next", 1, Label::Optional, FieldKind::Message(&NODE))];
static NODE_BY_NAME: [u32; 1] = [0];
static NODE_RANGES: [IntRange; 2] = [
    IntRange {
        start_value: 1,
        orig_index: 0,
    },
    IntRange {
        start_value: 2,
        orig_index: 1,
    },
];
pub static NODE: MessageDescriptor = MessageDescriptor {
    magic: MESSAGE_DESCRIPTOR_MAGIC,
    name: "test.Node",
    fields: &NODE_FIELDS,
    fields_sorted_by_name: &NODE_BY_NAME,
    field_ranges: &NODE_RANGES,
};

// --- test.Defaults: declared defaults of several kinds ---

static DEFAULTS_FIELDS: [FieldDescriptor; 3] = [
    defaulted_field(
        "answer",
        1,
        Label::Optional,
        FieldKind::Int32,
        DefaultValue::I32(42),
    ),
    defaulted_field(
        "greeting",
        2,
        Label::Required,
        FieldKind::String,
        DefaultValue::String("hi"),
    ),
    defaulted_field(
        "mode",
        3,
        Label::Optional,
        FieldKind::Enum(&COLOR),
        DefaultValue::Enum(2),
    ),
];
static DEFAULTS_BY_NAME: [u32; 3] = [0, 1, 2];
static DEFAULTS_RANGES: [IntRange; 2] = [
    IntRange {
        start_value: 1,
        orig_index: 0,
    },
    IntRange {
        start_value: 4,
        orig_index: 3,
    },
];
pub static DEFAULTS: MessageDescriptor = MessageDescriptor {
    magic: MESSAGE_DESCRIPTOR_MAGIC,
    name: "test.Defaults",
    fields: &DEFAULTS_FIELDS,
    fields_sorted_by_name: &DEFAULTS_BY_NAME,
    field_ranges: &DEFAULTS_RANGES,
};

// --- test.Version: { required int32 version = 1; } (no declared default) ---

static VERSION_FIELDS: [FieldDescriptor; 1] =
    [field("version", 1, Label::Required, FieldKind::Int32)];
static VERSION_BY_NAME: [u32; 1] = [0];
static VERSION_RANGES: [IntRange; 2] = [
    IntRange {
        start_value: 1,
        orig_index: 0,
    },
    IntRange {
        start_value: 2,
        orig_index: 1,
    },
];
pub static VERSION: MessageDescriptor = MessageDescriptor {
    magic: MESSAGE_DESCRIPTOR_MAGIC,
    name: "test.Version",
    fields: &VERSION_FIELDS,
    fields_sorted_by_name: &VERSION_BY_NAME,
    field_ranges: &VERSION_RANGES,
};

// --- test.V1 / test.V2: schema evolution pair ---

static V1_FIELDS: [FieldDescriptor; 1] = [field("keep", 1, Label::Optional, FieldKind::Int32)];
static V1_BY_NAME: [u32; 1] = [0];
static V1_RANGES: [IntRange; 2] = [
    IntRange {
        start_value: 1,
        orig_index: 0,
    },
    IntRange {
        start_value: 2,
        orig_index: 1,
    },
];
pub static V1: MessageDescriptor = MessageDescriptor {
    magic: MESSAGE_DESCRIPTOR_MAGIC,
    name: "test.V1",
    fields: &V1_FIELDS,
    fields_sorted_by_name: &V1_BY_NAME,
    field_ranges: &V1_RANGES,
};

static V2_FIELDS: [FieldDescriptor; 4] = [
    field("keep", 1, Label::Optional, FieldKind::Int32),
    field("extra", 2, Label::Optional, FieldKind::String),
    field("more", 3, Label::Repeated, FieldKind::Uint32),
    field("stamp", 4, Label::Optional, FieldKind::Fixed64),
];
static V2_BY_NAME: [u32; 4] = [1, 0, 2, 3];
static V2_RANGES: [IntRange; 2] = [
    IntRange {
        start_value: 1,
        orig_index: 0,
    },
    IntRange {
        start_value: 5,
        orig_index: 4,
    },
];
pub static V2: MessageDescriptor = MessageDescriptor {
    magic: MESSAGE_DESCRIPTOR_MAGIC,
    name: "test.V2",
    fields: &V2_FIELDS,
    fields_sorted_by_name: &V2_BY_NAME,
    field_ranges: &V2_RANGES,
};

// --- test.Outer: merge-semantics fixture ---

static OUTER_FIELDS: [FieldDescriptor; 3] = [
    field("child", 1, Label::Optional, FieldKind::Message(&INNER)),
    field("count", 2, Label::Optional, FieldKind::Int32),
    field("items", 3, Label::Repeated, FieldKind::Int32),
];
static OUTER_BY_NAME: [u32; 3] = [0, 1, 2];
static OUTER_RANGES: [IntRange; 2] = [
    IntRange {
        start_value: 1,
        orig_index: 0,
    },
    IntRange {
        start_value: 4,
        orig_index: 3,
    },
];
pub static OUTER: MessageDescriptor = MessageDescriptor {
    magic: MESSAGE_DESCRIPTOR_MAGIC,
    name: "test.Outer",
    fields: &OUTER_FIELDS,
    fields_sorted_by_name: &OUTER_BY_NAME,
    field_ranges: &OUTER_RANGES,
};

/// Allocator that tracks outstanding bytes and can refuse the k-th charge.
pub struct CountingAllocator {
    outstanding: Cell<usize>,
    charges: Cell<usize>,
    fail_at: Option<usize>,
}

impl CountingAllocator {
    pub fn new() -> Self {
        Self {
            outstanding: Cell::new(0),
            charges: Cell::new(0),
            fail_at: None,
        }
    }

    /// Refuse the k-th charge (1-based).
    pub fn failing_at(k: usize) -> Self {
        Self {
            fail_at: Some(k),
            ..Self::new()
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.get()
    }

    pub fn charges(&self) -> usize {
        self.charges.get()
    }
}

impl Allocator for CountingAllocator {
    fn alloc(&self, size: usize) -> Result<(), AllocationFailed> {
        let n = self.charges.get() + 1;
        self.charges.set(n);
        if self.fail_at == Some(n) {
            return Err(AllocationFailed);
        }
        self.outstanding.set(self.outstanding.get() + size);
        Ok(())
    }

    fn free(&self, size: usize) {
        let outstanding = self.outstanding.get();
        assert!(size <= outstanding, "released more bytes than were charged");
        self.outstanding.set(outstanding - size);
    }
}
