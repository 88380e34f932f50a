use crate::func::CallTarget;
use crate::{LinkerError, Value};

/// Call machinery provided by the execution engine.
///
/// The linker itself never executes wasm code; after a successful link it
/// invokes each module's start function through this trait. Embedders plug
/// in their engine here, tests typically record the invocations.
pub trait Externals {
    /// Invokes the function behind `target` with the given arguments.
    fn invoke(
        &mut self,
        target: &CallTarget,
        args: &[Value],
    ) -> Result<Option<Value>, LinkerError>;
}

/// An [`Externals`] implementation that successfully does nothing.
///
/// Convenient when the linked modules have no start functions, or when their
/// effects are irrelevant.
///
/// [`Externals`]: trait.Externals.html
pub struct NopExternals;

impl Externals for NopExternals {
    fn invoke(
        &mut self,
        _target: &CallTarget,
        _args: &[Value],
    ) -> Result<Option<Value>, LinkerError> {
        Ok(None)
    }
}
