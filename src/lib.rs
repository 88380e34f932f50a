//! # wasmlink
//!
//! This library links a set of parsed WebAssembly modules that share one
//! execution context: it resolves every cross-module reference and prepares
//! the modules for execution.
//!
//! # Introduction
//!
//! WebAssembly (wasm) modules may import and export functions, linear
//! memories, tables and global variables. A program is usually composed of
//! several such modules, and before any of them can run, every import has to
//! be matched with the corresponding export, call-sites have to be bound to
//! concrete call targets, shared memories have to be grown to the size their
//! importers require, and data segments have to be copied into place.
//!
//! ## Linking
//!
//! While a front end walks each module it reports every import, export,
//! call-site and data segment to the [`Linker`]. Some of these reports are
//! checked on the spot (global and table imports); the rest are recorded as
//! deferred resolutions with the symbols they depend on. A later call to
//! [`try_link`] orders all deferred resolutions so that every dependency runs
//! before its dependents, executes them, marks every module of the
//! [`Context`] as linked and finally runs each module's `start` function.
//!
//! Linking is a one-shot operation per context: once a link has completed,
//! further [`try_link`] calls return immediately, and a failed link leaves
//! the context unusable. Every failure is reported as a [`LinkerError`] with
//! a single-line, human-readable message.
//!
//! # Examples
//!
//! ```rust
//! use wasmlink::{Context, ImportDescriptor, Linker, ModuleInstance, NopExternals};
//!
//! # fn link() -> Result<(), wasmlink::LinkerError> {
//! let context = Context::new();
//!
//! // A module `env` exporting the local function `print`.
//! let env = ModuleInstance::alloc("env");
//! let print = env.symbols_mut().declare_function();
//! context.push_module(env.clone());
//!
//! // A module `main` importing `env.print`.
//! let main = ModuleInstance::alloc("main");
//! let imported = main
//!     .symbols_mut()
//!     .import_function(ImportDescriptor::new("env", "print"));
//! context.push_module(main.clone());
//!
//! let mut linker = Linker::new();
//! linker.resolve_code_entry(&env, print.index());
//! linker.resolve_function_export(&env, print.index(), "print")?;
//! linker.resolve_function_import(&main, &imported)?;
//!
//! linker.try_link(&context, &mut NopExternals)?;
//!
//! assert!(main.is_linked());
//! assert!(imported.resolve_call_target().is_ok());
//! # Ok(())
//! # }
//! # link().unwrap();
//! ```
//!
//! [`try_link`]: struct.Linker.html#method.try_link

#![warn(missing_docs)]
#![allow(clippy::len_without_is_empty)]

use std::{error, fmt};

/// Error produced while linking modules.
///
/// There is a single error kind; every way a link can fail is described by
/// the carried message. Messages are single-line and stable, so embedders
/// may match on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkerError {
    message: String,
}

impl LinkerError {
    pub(crate) fn new<M: Into<String>>(message: M) -> LinkerError {
        LinkerError {
            message: message.into(),
        }
    }

    /// Returns the diagnostic message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for LinkerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl error::Error for LinkerError {}

mod context;
mod dag;
mod func;
mod global;
mod host;
mod linker;
mod memory;
mod module;
mod sym;
mod table;
mod types;
mod value;

#[cfg(test)]
mod tests;

pub use self::context::Context;
pub use self::func::{Block, BlockRef, CallTarget, FuncInstance, FuncRef};
pub use self::global::{GlobalEntry, GlobalResolution, GlobalStore};
pub use self::host::{Externals, NopExternals};
pub use self::linker::{LinkState, Linker};
pub use self::memory::{MemoryInstance, MemoryRef, LINEAR_MEMORY_PAGE_SIZE};
pub use self::module::{ModuleInstance, ModuleRef, SymbolTable};
pub use self::sym::Sym;
pub use self::table::{TableInstance, TableRef};
pub use self::types::{ImportDescriptor, Mutability, ValueType};
pub use self::value::Value;

/// WebAssembly-specific sizes and units.
pub mod memory_units {
    pub use memory_units::wasm32::*;
    pub use memory_units::{size_of, ByteSize, Bytes, RoundUpTo};
}
