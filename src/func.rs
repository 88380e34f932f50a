use crate::{ImportDescriptor, LinkerError};
use core::fmt;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Reference to a function (see [`FuncInstance`] for details).
///
/// This reference has a reference-counting semantics.
///
/// [`FuncInstance`]: struct.FuncInstance.html
#[derive(Clone, Debug)]
pub struct FuncRef(Rc<FuncInstance>);

impl ::core::ops::Deref for FuncRef {
    type Target = FuncInstance;
    fn deref(&self) -> &FuncInstance {
        &self.0
    }
}

/// Handle to the execution engine's entry point for one function.
///
/// The linker never looks inside a call target; it only moves targets from
/// exporters to importers and hands them to call-sites. Targets have
/// identity semantics: two targets are equal iff they are the same handle.
#[derive(Clone, Debug)]
pub struct CallTarget(Rc<CallTargetInner>);

#[derive(Debug)]
struct CallTargetInner {
    module: String,
    function_index: u32,
}

impl CallTarget {
    pub(crate) fn new<M: Into<String>>(module: M, function_index: u32) -> CallTarget {
        CallTarget(Rc::new(CallTargetInner {
            module: module.into(),
            function_index,
        }))
    }

    /// Returns the name of the module that defines the entered function.
    pub fn module_name(&self) -> &str {
        &self.0.module
    }

    /// Returns the index of the entered function in its defining module.
    pub fn function_index(&self) -> u32 {
        self.0.function_index
    }
}

impl PartialEq for CallTarget {
    fn eq(&self, other: &CallTarget) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for CallTarget {}

#[derive(Debug, Clone)]
enum FuncKind {
    Local,
    Imported { descriptor: ImportDescriptor },
}

/// Runtime representation of a function.
///
/// A function is either declared by its module (local) or imported from
/// another module. Local functions own their [`CallTarget`] from allocation;
/// imported functions receive the exporter's target during linking.
///
/// [`CallTarget`]: struct.CallTarget.html
#[derive(Debug)]
pub struct FuncInstance {
    index: u32,
    kind: FuncKind,
    target: RefCell<Option<CallTarget>>,
}

impl FuncInstance {
    pub(crate) fn alloc_local(module: &str, index: u32) -> FuncRef {
        FuncRef(Rc::new(FuncInstance {
            index,
            kind: FuncKind::Local,
            target: RefCell::new(Some(CallTarget::new(module, index))),
        }))
    }

    pub(crate) fn alloc_imported(index: u32, descriptor: ImportDescriptor) -> FuncRef {
        FuncRef(Rc::new(FuncInstance {
            index,
            kind: FuncKind::Imported { descriptor },
            target: RefCell::new(None),
        }))
    }

    /// Returns the index of this function in its module's function space.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Returns `true` if this function is an import.
    pub fn is_imported(&self) -> bool {
        matches!(self.kind, FuncKind::Imported { .. })
    }

    /// Returns the import descriptor of this function, or `None` for a
    /// local function.
    pub fn import_descriptor(&self) -> Option<&ImportDescriptor> {
        match &self.kind {
            FuncKind::Imported { descriptor } => Some(descriptor),
            FuncKind::Local => None,
        }
    }

    /// Returns the name of the module this function is imported from.
    pub fn imported_module_name(&self) -> Option<&str> {
        self.import_descriptor().map(ImportDescriptor::module_name)
    }

    /// Returns the name this function is imported under.
    pub fn imported_function_name(&self) -> Option<&str> {
        self.import_descriptor().map(ImportDescriptor::member_name)
    }

    /// Returns the call target of this function.
    ///
    /// # Errors
    ///
    /// Returns `Err` for an imported function whose import has not been
    /// resolved. A link run never observes this: the resolution of the
    /// import is ordered before every use of its target.
    pub fn resolve_call_target(&self) -> Result<CallTarget, LinkerError> {
        match &*self.target.borrow() {
            Some(target) => Ok(target.clone()),
            None => {
                let descriptor = match &self.kind {
                    FuncKind::Imported { descriptor } => descriptor,
                    FuncKind::Local => {
                        unreachable!("local functions are allocated with a call target")
                    }
                };
                Err(LinkerError::new(format!(
                    "The imported function '{}' from the module '{}' does not have a resolved call target.",
                    descriptor.member_name(),
                    descriptor.module_name()
                )))
            }
        }
    }

    /// Binds this function to `target`.
    pub fn set_call_target(&self, target: CallTarget) {
        *self.target.borrow_mut() = Some(target);
    }
}

/// Reference to a [`Block`].
///
/// This reference has a reference-counting semantics.
///
/// [`Block`]: struct.Block.html
#[derive(Clone, Debug)]
pub struct BlockRef(Rc<Block>);

impl ::core::ops::Deref for BlockRef {
    type Target = Block;
    fn deref(&self) -> &Block {
        &self.0
    }
}

/// A region of a function body containing call nodes.
///
/// The execution engine materializes one block per structured control
/// region; the linker only needs its start offset (which identifies the
/// call-site symbol) and the ability to bind a call node to a target.
#[derive(Debug)]
pub struct Block {
    start_offset: u32,
    resolved_calls: RefCell<BTreeMap<u32, CallTarget>>,
}

impl Block {
    /// Allocate a block starting at the bytecode offset `start_offset`.
    pub fn alloc(start_offset: u32) -> BlockRef {
        BlockRef(Rc::new(Block {
            start_offset,
            resolved_calls: RefCell::new(BTreeMap::new()),
        }))
    }

    /// Returns the bytecode offset this block starts at.
    pub fn start_offset(&self) -> u32 {
        self.start_offset
    }

    /// Binds the call node at `control_table_offset` to `target`.
    pub fn resolve_call_node(&self, control_table_offset: u32, target: CallTarget) {
        self.resolved_calls
            .borrow_mut()
            .insert(control_table_offset, target);
    }

    /// Returns the target the call node at `control_table_offset` was bound
    /// to, if it has been resolved.
    pub fn call_target_at(&self, control_table_offset: u32) -> Option<CallTarget> {
        self.resolved_calls
            .borrow()
            .get(&control_table_offset)
            .cloned()
    }
}

impl fmt::Display for CallTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}[{}]", self.0.module, self.0.function_index)
    }
}
