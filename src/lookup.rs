//! Descriptor lookup: int-range search by number, binary search by name.

use crate::descriptor::{
    EnumDescriptor, EnumValue, FieldDescriptor, IntRange, MessageDescriptor, MethodDescriptor,
    ServiceDescriptor,
};

/// Locate `value` in a range table: find the range with
/// `start_value <= value < next.start_value`, then check `value` falls inside
/// the run (the run length is `next.orig_index - orig_index`). Returns the
/// index into the original array the ranges cover.
pub(crate) fn int_range_lookup(ranges: &[IntRange], value: i32) -> Option<usize> {
    // The final entry is the sentinel; it starts no run of its own.
    let runs = ranges.len().checked_sub(1)?;
    let following = ranges[..runs].partition_point(|range| range.start_value <= value);
    let range = &ranges[following.checked_sub(1)?];
    let run_len = ranges[following].orig_index - range.orig_index;
    let offset = value.wrapping_sub(range.start_value) as u32;
    if offset < run_len {
        Some(range.orig_index as usize + offset as usize)
    } else {
        None
    }
}

impl EnumDescriptor {
    /// Look up a value by number.
    pub fn value(&self, number: i32) -> Option<&EnumValue> {
        self.assert_magic();
        int_range_lookup(self.value_ranges, number).map(|i| &self.values[i])
    }

    /// Look up a value (or alias) by name.
    pub fn value_by_name(&self, name: &str) -> Option<&EnumValue> {
        self.assert_magic();
        let i = self
            .values_by_name
            .binary_search_by(|entry| entry.name.cmp(name))
            .ok()?;
        Some(&self.values[self.values_by_name[i].index as usize])
    }
}

impl MessageDescriptor {
    /// Look up a field by tag, returning its index in `fields` as well.
    pub fn field(&self, tag: u32) -> Option<(usize, &FieldDescriptor)> {
        self.assert_magic();
        let i = int_range_lookup(self.field_ranges, tag as i32)?;
        Some((i, &self.fields[i]))
    }

    /// Look up a field by name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.assert_magic();
        let i = self
            .fields_sorted_by_name
            .binary_search_by(|&index| self.fields[index as usize].name.cmp(name))
            .ok()?;
        Some(&self.fields[self.fields_sorted_by_name[i] as usize])
    }
}

impl ServiceDescriptor {
    /// Look up a method by name, returning its stable index.
    pub fn method_by_name(&self, name: &str) -> Option<(usize, &MethodDescriptor)> {
        self.assert_magic();
        let i = self
            .method_indices_by_name
            .binary_search_by(|&index| self.methods[index as usize].name.cmp(name))
            .ok()?;
        let index = self.method_indices_by_name[i] as usize;
        Some((index, &self.methods[index]))
    }
}
