//! Panic containment at the hook boundary.
//!
//! Processor hooks are third-party code. [`guard_hook`] runs one hook call
//! and turns a panic into [`ProcessorError::Panicked`], so a single
//! misbehaving instance cannot unwind through the tick driver.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tilework_core::ProcessorError;

/// Run `f`, converting a panic into [`ProcessorError::Panicked`].
///
/// State touched by `f` before the panic is left as it was; callers mark
/// the instance faulted and stop calling into it.
pub fn guard_hook<R>(f: impl FnOnce() -> R) -> Result<R, ProcessorError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| ProcessorError::Panicked {
        message: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
