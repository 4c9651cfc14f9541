//! Wire keys and a bounds-checked reader over untrusted input.

use bytes::Buf;

use crate::error::{
    UnpackError, BUFFER_UNDERFLOW, INVALID_FIELD_NUMBER, INVALID_KEY_VARINT,
    INVALID_LENGTH_VARINT, INVALID_VARINT, INVALID_WIRE_TYPE, LENGTH_OVERFLOW,
    MISMATCHED_GROUP_TAG, UNMATCHED_END_GROUP,
};
use crate::varint;

/// Field numbers occupy at most 29 bits of the key.
pub(crate) const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// The 3-bit encoding family selector carried in every field key.
///
/// `StartGroup` and `EndGroup` are the deprecated group delimiters; they are
/// recognized only so unknown fields containing them can be skipped and
/// preserved. Values 6 and 7 are reserved and always malformed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireType {
    Varint = 0,
    SixtyFourBit = 1,
    LengthPrefixed = 2,
    StartGroup = 3,
    EndGroup = 4,
    ThirtyTwoBit = 5,
}

impl WireType {
    fn from_key(key: u64) -> Result<Self, UnpackError> {
        match key & 0b111 {
            0 => Ok(Self::Varint),
            1 => Ok(Self::SixtyFourBit),
            2 => Ok(Self::LengthPrefixed),
            3 => Ok(Self::StartGroup),
            4 => Ok(Self::EndGroup),
            5 => Ok(Self::ThirtyTwoBit),
            _ => Err(UnpackError::malformed(INVALID_WIRE_TYPE)),
        }
    }
}

/// Compose the varint key for a field: `(tag << 3) | wire_type`.
#[inline(always)]
pub(crate) fn key(tag: u32, wire_type: WireType) -> u64 {
    (u64::from(tag) << 3) | wire_type as u64
}

/// Reader over a byte slice that never advances past the end.
///
/// Length-prefixed payloads split off sub-readers, so a nested parse can
/// never consume bytes belonging to an enclosing frame.
pub(crate) struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    #[inline(always)]
    pub(crate) fn at_end(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline(always)]
    pub(crate) fn read_varint(&mut self, error: &'static str) -> Result<u64, UnpackError> {
        match varint::decode(self.buf) {
            Some((value, len)) => {
                self.buf.advance(len);
                Ok(value)
            }
            // Overflowed ten bytes or incomplete at end of input.
            None => Err(UnpackError::malformed(error)),
        }
    }

    /// Decode a field key, returning the field number and wire type.
    pub(crate) fn read_key(&mut self) -> Result<(u32, WireType), UnpackError> {
        let raw = self.read_varint(INVALID_KEY_VARINT)?;
        let wire_type = WireType::from_key(raw)?;
        let number = raw >> 3;
        if number == 0 || number > u64::from(MAX_FIELD_NUMBER) {
            return Err(UnpackError::malformed(INVALID_FIELD_NUMBER));
        }
        Ok((number as u32, wire_type))
    }

    /// Read a length prefix and check it fits the remaining input.
    pub(crate) fn read_length(&mut self) -> Result<usize, UnpackError> {
        let length = self.read_varint(INVALID_LENGTH_VARINT)?;
        if length > self.buf.len() as u64 {
            return Err(UnpackError::malformed(LENGTH_OVERFLOW));
        }
        Ok(length as usize)
    }

    /// Split off a reader over exactly the next `length` bytes.
    pub(crate) fn sub_reader(&mut self, length: usize) -> WireReader<'a> {
        let (head, tail) = self.buf.split_at(length);
        self.buf = tail;
        WireReader::new(head)
    }

    pub(crate) fn read_slice(&mut self, length: usize) -> Result<&'a [u8], UnpackError> {
        if length > self.buf.len() {
            return Err(UnpackError::malformed(BUFFER_UNDERFLOW));
        }
        let (head, tail) = self.buf.split_at(length);
        self.buf = tail;
        Ok(head)
    }

    #[inline(always)]
    pub(crate) fn read_u32_le(&mut self) -> Result<u32, UnpackError> {
        if self.buf.remaining() < 4 {
            return Err(UnpackError::malformed(BUFFER_UNDERFLOW));
        }
        Ok(self.buf.get_u32_le())
    }

    #[inline(always)]
    pub(crate) fn read_u64_le(&mut self) -> Result<u64, UnpackError> {
        if self.buf.remaining() < 8 {
            return Err(UnpackError::malformed(BUFFER_UNDERFLOW));
        }
        Ok(self.buf.get_u64_le())
    }

    #[inline(always)]
    pub(crate) fn read_f32_le(&mut self) -> Result<f32, UnpackError> {
        Ok(f32::from_bits(self.read_u32_le()?))
    }

    #[inline(always)]
    pub(crate) fn read_f64_le(&mut self) -> Result<f64, UnpackError> {
        Ok(f64::from_bits(self.read_u64_le()?))
    }

    /// Skip one value of the given wire type, returning the raw bytes that
    /// made it up (everything after the key, including any length prefix, and
    /// for groups the body through the matching end-group key).
    pub(crate) fn capture_value(
        &mut self,
        tag: u32,
        wire_type: WireType,
    ) -> Result<&'a [u8], UnpackError> {
        let start = self.buf;
        self.skip_value(tag, wire_type)?;
        Ok(&start[..start.len() - self.buf.len()])
    }

    fn skip_value(&mut self, tag: u32, wire_type: WireType) -> Result<(), UnpackError> {
        match wire_type {
            WireType::Varint => {
                // To skip a varint, decode and forget it.
                self.read_varint(INVALID_VARINT)?;
            }
            WireType::SixtyFourBit => {
                self.read_slice(8)?;
            }
            WireType::LengthPrefixed => {
                let length = self.read_length()?;
                self.buf.advance(length);
            }
            WireType::ThirtyTwoBit => {
                self.read_slice(4)?;
            }
            WireType::StartGroup => self.skip_group(tag)?,
            WireType::EndGroup => {
                return Err(UnpackError::malformed(UNMATCHED_END_GROUP));
            }
        }
        Ok(())
    }

    /// Skip to the end-group key matching an already-consumed start-group
    /// key for `tag`, honoring balanced nesting.
    fn skip_group(&mut self, tag: u32) -> Result<(), UnpackError> {
        let mut open = vec![tag];
        while let Some(&innermost) = open.last() {
            let (number, wire_type) = self.read_key()?;
            match wire_type {
                WireType::StartGroup => open.push(number),
                WireType::EndGroup => {
                    if number != innermost {
                        return Err(UnpackError::malformed(MISMATCHED_GROUP_TAG));
                    }
                    open.pop();
                }
                other => self.skip_value(number, other)?,
            }
        }
        Ok(())
    }
}
