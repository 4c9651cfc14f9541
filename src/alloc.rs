//! Allocation accounting threaded through the unpack engine.
//!
//! Ownership already guarantees that dropped records release their memory;
//! what the allocator adds is an accounting boundary the caller controls.
//! [`unpack`](crate::descriptor::MessageDescriptor::unpack) charges a
//! deterministic figure for every owned block it creates (the record itself,
//! each repeated element slot, each string/bytes payload, each unknown
//! field), and refusing any charge aborts the parse with every prior charge
//! released. [`free_unpacked`](crate::MessageValue::free_unpacked) walks the
//! record and releases the same figures, so a counting allocator observes an
//! exact balance.

use std::mem::size_of;

use crate::descriptor::MessageDescriptor;
use crate::value::{FieldValue, MessageValue, UnknownField, Value};

/// Marker error: the allocator refused a charge.
#[derive(Debug)]
pub struct AllocationFailed;

/// Caller-supplied allocation policy.
///
/// The engine never mixes allocators: every byte released goes through the
/// allocator that accepted its charge. Implementations must tolerate
/// concurrent use through `&self`.
pub trait Allocator {
    /// Account for `size` bytes about to be allocated. `Err` refuses them.
    fn alloc(&self, size: usize) -> Result<(), AllocationFailed>;

    /// Account for releasing `size` previously accepted bytes.
    fn free(&self, size: usize);
}

/// The process default: routes to the system heap and never refuses.
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    #[inline(always)]
    fn alloc(&self, _size: usize) -> Result<(), AllocationFailed> {
        Ok(())
    }

    #[inline(always)]
    fn free(&self, _size: usize) {}
}

/// Charge for one message record: the header plus one slot per field.
#[inline(always)]
pub(crate) fn record_charge(descriptor: &MessageDescriptor) -> usize {
    size_of::<MessageValue>() + descriptor.fields.len() * size_of::<FieldValue>()
}

/// Charge for one element appended to a repeated array.
#[inline(always)]
pub(crate) fn element_charge() -> usize {
    size_of::<Value>()
}

/// Charge for one preserved unknown field and its raw bytes.
#[inline(always)]
pub(crate) fn unknown_charge(len: usize) -> usize {
    size_of::<UnknownField>() + len
}

/// Charge for an owned string or bytes payload.
#[inline(always)]
pub(crate) fn payload_charge(len: usize) -> usize {
    len
}
