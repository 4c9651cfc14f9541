//! Errors surfaced while parsing untrusted wire input.

use std::error::Error as StdError;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult, Write};

/// Why [`unpack`](crate::descriptor::MessageDescriptor::unpack) gave up.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnpackErrorKind {
    /// Truncated, over-long, or structurally invalid input.
    Malformed,
    /// The allocator refused a charge; nothing remains allocated.
    AllocationFailed,
}

/// An error encountered while decoding a message.
///
/// Carries a traceback of the mutual recursion through submessages and
/// repeated elements (most recent first), so a failure deep inside nested
/// input renders as `UnpackError(.2.7[3]): ...`.
pub struct UnpackError {
    kind: UnpackErrorKind,

    /// Basic error message.
    message: &'static str,

    /// Traceback of mutual recursion during decoding (most recent first).
    traceback: Vec<UnpackLevel>,
}

/// A level of recursion among submessages in an error traceback.
enum UnpackLevel {
    /// Message field number.
    Field(u32),
    /// Repeated field index.
    Index(usize),
}

impl UnpackError {
    #[cold]
    pub(crate) fn malformed(message: &'static str) -> Self {
        Self {
            kind: UnpackErrorKind::Malformed,
            message,
            traceback: Vec::new(),
        }
    }

    #[cold]
    pub(crate) fn allocation_failed() -> Self {
        Self {
            kind: UnpackErrorKind::AllocationFailed,
            message: ALLOCATION_REFUSED,
            traceback: Vec::new(),
        }
    }

    #[cold]
    pub(crate) fn with_field(mut self, number: u32) -> Self {
        self.traceback.push(UnpackLevel::Field(number));
        self
    }

    #[cold]
    pub(crate) fn with_index(mut self, i: usize) -> Self {
        self.traceback.push(UnpackLevel::Index(i));
        self
    }

    pub fn kind(&self) -> UnpackErrorKind {
        self.kind
    }

    pub fn message(&self) -> &'static str {
        self.message
    }
}

/// Rendered like `UnpackError(.path.to[0][4].the.field): <message>`.
impl Display for UnpackError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("UnpackError(")?;
        for level in self.traceback.iter().rev() {
            match level {
                UnpackLevel::Field(number) => {
                    f.write_char('.')?;
                    Display::fmt(number, f)?;
                }
                UnpackLevel::Index(index) => {
                    f.write_char('[')?;
                    Display::fmt(index, f)?;
                    f.write_char(']')?;
                }
            }
        }
        f.write_str("): ")?;
        f.write_str(self.message)
    }
}

impl Debug for UnpackError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(self, f)
    }
}

impl StdError for UnpackError {}

pub(crate) const BUFFER_UNDERFLOW: &str = "input ends inside a fixed-width value";
pub(crate) const LENGTH_OVERFLOW: &str = "length prefix exceeds remaining input";
pub(crate) const INVALID_KEY_VARINT: &str = "invalid varint for field key";
pub(crate) const INVALID_LENGTH_VARINT: &str = "invalid varint for length prefix";
pub(crate) const INVALID_VARINT: &str = "invalid varint";
pub(crate) const INVALID_FIELD_NUMBER: &str = "field number out of range";
pub(crate) const INVALID_WIRE_TYPE: &str = "reserved wire type";
pub(crate) const UNMATCHED_END_GROUP: &str = "end-group key without matching start";
pub(crate) const MISMATCHED_GROUP_TAG: &str = "end-group tag does not match start";
pub(crate) const RECURSION_LIMIT: &str = "message nesting exceeds the recursion limit";
pub(crate) const INVALID_UTF8: &str = "string field is not valid UTF-8";
pub(crate) const ALLOCATION_REFUSED: &str = "allocator refused an allocation";
