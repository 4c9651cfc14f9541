//! Static descriptors, the read-only metadata emitted by the code generator.
//!
//! Descriptors live for the whole process (`'static`), are never mutated, and
//! are shared freely between threads and records. Sort orders are generator
//! contracts: `values` ascending by number, `fields` ascending by tag, the
//! name indexes ascending by name, and every range table ends with a sentinel
//! whose `orig_index` equals the length of the indexed array.

use crate::wire::WireType;

pub const ENUM_DESCRIPTOR_MAGIC: u32 = 0x114315af;
pub const MESSAGE_DESCRIPTOR_MAGIC: u32 = 0x28aaeef9;
pub const SERVICE_DESCRIPTOR_MAGIC: u32 = 0x14159bc3;

/// One value of an enumeration, as declared in the schema.
#[derive(Debug)]
pub struct EnumValue {
    pub name: &'static str,
    pub value: i32,
}

/// Entry in a by-name index: the name (aliases included) and the position of
/// the named entry in the primary array.
#[derive(Debug)]
pub struct EnumValueIndex {
    pub name: &'static str,
    pub index: u32,
}

/// Helper for int-to-index lookups where keys cluster into consecutive runs,
/// as field tags and enum numbers usually do.
///
/// The run length is inferred from the next element's `orig_index`; the
/// sentinel at the end makes that uniform.
#[derive(Debug)]
pub struct IntRange {
    pub start_value: i32,
    pub orig_index: u32,
}

/// Description of an enumeration type.
#[derive(Debug)]
pub struct EnumDescriptor {
    pub magic: u32,
    pub name: &'static str,
    /// Sorted ascending by `value`.
    pub values: &'static [EnumValue],
    /// Sorted ascending by `name`.
    pub values_by_name: &'static [EnumValueIndex],
    /// Covers `values`, plus the sentinel.
    pub value_ranges: &'static [IntRange],
}

/// The three field labels of the schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Label {
    Required,
    Optional,
    Repeated,
}

/// Declared field type, fused with the nested descriptor where one exists.
pub enum FieldKind {
    Int32,
    Sint32,
    Sfixed32,
    Int64,
    Sint64,
    Sfixed64,
    Uint32,
    Fixed32,
    Uint64,
    Fixed64,
    Float,
    Double,
    Bool,
    Enum(&'static EnumDescriptor),
    String,
    Bytes,
    Message(&'static MessageDescriptor),
}

/// By name only: descriptors may be self-referential (recursive message
/// types), so the derived representation would never terminate.
impl std::fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int32 => f.write_str("Int32"),
            Self::Sint32 => f.write_str("Sint32"),
            Self::Sfixed32 => f.write_str("Sfixed32"),
            Self::Int64 => f.write_str("Int64"),
            Self::Sint64 => f.write_str("Sint64"),
            Self::Sfixed64 => f.write_str("Sfixed64"),
            Self::Uint32 => f.write_str("Uint32"),
            Self::Fixed32 => f.write_str("Fixed32"),
            Self::Uint64 => f.write_str("Uint64"),
            Self::Fixed64 => f.write_str("Fixed64"),
            Self::Float => f.write_str("Float"),
            Self::Double => f.write_str("Double"),
            Self::Bool => f.write_str("Bool"),
            Self::Enum(e) => write!(f, "Enum({})", e.name),
            Self::String => f.write_str("String"),
            Self::Bytes => f.write_str("Bytes"),
            Self::Message(m) => write!(f, "Message({})", m.name),
        }
    }
}

impl FieldKind {
    /// The wire type of a single unpacked value of this kind.
    pub(crate) fn wire_type(&self) -> WireType {
        match self {
            Self::Int32
            | Self::Sint32
            | Self::Int64
            | Self::Sint64
            | Self::Uint32
            | Self::Uint64
            | Self::Bool
            | Self::Enum(_) => WireType::Varint,
            Self::Sfixed32 | Self::Fixed32 | Self::Float => WireType::ThirtyTwoBit,
            Self::Sfixed64 | Self::Fixed64 | Self::Double => WireType::SixtyFourBit,
            Self::String | Self::Bytes | Self::Message(_) => WireType::LengthPrefixed,
        }
    }

    /// Whether repeated values of this kind may share one length-prefixed
    /// block. Strings, bytes, and messages can only be expanded.
    pub(crate) fn packable(&self) -> bool {
        !matches!(self, Self::String | Self::Bytes | Self::Message(_))
    }
}

/// Declared default for a field, installed by [`init`](crate::MessageValue::new).
///
/// Storage-typed like [`Value`](crate::Value): the field kind decides the
/// wire form, so one variant serves int32, sint32, and sfixed32 alike.
#[derive(Debug)]
pub enum DefaultValue {
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Enum(i32),
    String(&'static str),
    Bytes(&'static [u8]),
}

/// Description of a single field in a message.
#[derive(Debug)]
pub struct FieldDescriptor {
    pub name: &'static str,
    /// Field number from the schema, `1..=2^29-1`.
    pub tag: u32,
    pub label: Label,
    pub kind: FieldKind,
    /// Encode repetitions into one length-prefixed block. Only meaningful on
    /// REPEATED fields of packable kinds.
    pub packed: bool,
    /// Generator metadata; the engine does not act on it.
    pub deprecated: bool,
    pub default: Option<DefaultValue>,
}

/// Description of a message type.
#[derive(Debug)]
pub struct MessageDescriptor {
    pub magic: u32,
    /// Qualified name, e.g. `package.Type`.
    pub name: &'static str,
    /// Sorted ascending by `tag`.
    pub fields: &'static [FieldDescriptor],
    /// Indexes into `fields`, sorted ascending by field name.
    pub fields_sorted_by_name: &'static [u32],
    /// Covers `fields` by tag, plus the sentinel.
    pub field_ranges: &'static [IntRange],
}

impl MessageDescriptor {
    /// Magic mismatch means the caller handed the engine something that was
    /// never a descriptor; that is unrecoverable misuse.
    #[inline]
    pub(crate) fn assert_magic(&self) {
        assert_eq!(
            self.magic, MESSAGE_DESCRIPTOR_MAGIC,
            "not an initialized message descriptor: {}",
            self.name,
        );
    }
}

impl EnumDescriptor {
    #[inline]
    pub(crate) fn assert_magic(&self) {
        assert_eq!(
            self.magic, ENUM_DESCRIPTOR_MAGIC,
            "not an initialized enum descriptor: {}",
            self.name,
        );
    }
}

/// One method of a service: a name and its request/response message types.
#[derive(Debug)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub input: &'static MessageDescriptor,
    pub output: &'static MessageDescriptor,
}

/// Description of a service, addressed by stable method index.
#[derive(Debug)]
pub struct ServiceDescriptor {
    pub magic: u32,
    pub name: &'static str,
    /// In declaration order from the schema.
    pub methods: &'static [MethodDescriptor],
    /// Indexes into `methods`, sorted ascending by method name.
    pub method_indices_by_name: &'static [u32],
}

impl ServiceDescriptor {
    #[inline]
    pub(crate) fn assert_magic(&self) {
        assert_eq!(
            self.magic, SERVICE_DESCRIPTOR_MAGIC,
            "not an initialized service descriptor: {}",
            self.name,
        );
    }
}
