//! The service boundary: descriptors plus an invocation capability.
//!
//! Transport lives entirely outside the runtime. The generator emits a
//! [`ServiceDescriptor`] and an implementation of [`Service`] whose
//! `invoke` hands the response (or `None` on failure) to the closure;
//! teardown is ordinary `Drop`.

use crate::descriptor::ServiceDescriptor;
use crate::value::MessageValue;

/// A callable service endpoint, addressed by stable method index.
pub trait Service {
    fn descriptor(&self) -> &'static ServiceDescriptor;

    /// Invoke the method at `method_index` in `descriptor().methods`.
    ///
    /// `input` must be an instance of the method's input type; the closure
    /// receives an instance of its output type, or `None` if the call fails.
    fn invoke(
        &self,
        method_index: usize,
        input: &MessageValue,
        closure: &mut dyn FnMut(Option<&MessageValue>),
    );
}
