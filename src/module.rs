use crate::func::{FuncInstance, FuncRef};
use crate::global::{GlobalEntry, GlobalResolution, GlobalStore};
use crate::memory::MemoryRef;
use crate::table::TableRef;
use crate::{ImportDescriptor, LinkerError, Mutability, Value, ValueType};
use indexmap::IndexMap;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

/// Reference to a [`ModuleInstance`].
///
/// This reference has a reference-counting semantics. Link actions capture
/// clones of it, so modules must be kept registered in their [`Context`]
/// until the link completes.
///
/// [`ModuleInstance`]: struct.ModuleInstance.html
/// [`Context`]: struct.Context.html
#[derive(Clone, Debug)]
pub struct ModuleRef(pub(crate) Rc<ModuleInstance>);

impl ::core::ops::Deref for ModuleRef {
    type Target = ModuleInstance;
    fn deref(&self) -> &ModuleInstance {
        &self.0
    }
}

/// A parsed WebAssembly module loaded into a [`Context`].
///
/// The module's linkable state lives in its [`SymbolTable`], populated by a
/// front end while the module is walked. The `linked` flag is set once
/// linking of the whole context has completed.
///
/// [`Context`]: struct.Context.html
/// [`SymbolTable`]: struct.SymbolTable.html
#[derive(Debug)]
pub struct ModuleInstance {
    name: String,
    symbols: RefCell<SymbolTable>,
    linked: Cell<bool>,
}

impl ModuleInstance {
    /// Allocate a module named `name` with an empty symbol table.
    pub fn alloc<N: Into<String>>(name: N) -> ModuleRef {
        let name = name.into();
        ModuleRef(Rc::new(ModuleInstance {
            symbols: RefCell::new(SymbolTable::new(name.clone())),
            name,
            linked: Cell::new(false),
        }))
    }

    /// Returns the name of this module.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the symbol table of this module.
    pub fn symbols(&self) -> Ref<SymbolTable> {
        self.symbols.borrow()
    }

    /// Returns the symbol table of this module for mutation.
    pub fn symbols_mut(&self) -> RefMut<SymbolTable> {
        self.symbols.borrow_mut()
    }

    /// Marks this module as linked.
    pub fn set_linked(&self) {
        self.linked.set(true);
    }

    /// Returns `true` once linking of the owning context has completed.
    pub fn is_linked(&self) -> bool {
        self.linked.get()
    }

    /// Reads the exported function member `name`.
    ///
    /// # Errors
    ///
    /// Returns an unknown-identifier error if this module exports no
    /// function under `name`.
    pub fn read_member(&self, name: &str) -> Result<FuncRef, LinkerError> {
        self.symbols().exported_function(name).ok_or_else(|| {
            LinkerError::new(format!(
                "Unknown identifier '{}' in the module '{}'.",
                name, self.name
            ))
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct DataSegment {
    pub(crate) base_address: u32,
    pub(crate) bytes: Vec<u8>,
}

/// Linkable state of one module: its functions, memory, table and globals,
/// together with the names they are exported under.
///
/// The table is populated by a front end (and by the [`Linker`] entry points
/// it calls); queries are used by link actions and by the embedder after the
/// link.
///
/// [`Linker`]: struct.Linker.html
#[derive(Debug)]
pub struct SymbolTable {
    module_name: String,
    functions: Vec<FuncRef>,
    exported_functions: IndexMap<String, u32>,
    exported_globals: IndexMap<String, u32>,
    memory: Option<MemoryRef>,
    memory_import: Option<ImportDescriptor>,
    exported_memory_name: Option<String>,
    table: Option<TableRef>,
    table_import: Option<ImportDescriptor>,
    exported_table_name: Option<String>,
    globals: Vec<GlobalEntry>,
    data_segments: Vec<DataSegment>,
    start_function_index: Option<u32>,
}

impl SymbolTable {
    fn new(module_name: String) -> SymbolTable {
        SymbolTable {
            module_name,
            functions: Vec::new(),
            exported_functions: IndexMap::new(),
            exported_globals: IndexMap::new(),
            memory: None,
            memory_import: None,
            exported_memory_name: None,
            table: None,
            table_import: None,
            exported_table_name: None,
            globals: Vec::new(),
            data_segments: Vec::new(),
            start_function_index: None,
        }
    }

    /// Declares a local function at the next index and returns it.
    pub fn declare_function(&mut self) -> FuncRef {
        let index = self.functions.len() as u32;
        let function = FuncInstance::alloc_local(&self.module_name, index);
        self.functions.push(function.clone());
        function
    }

    /// Declares an imported function at the next index and returns it.
    pub fn import_function(&mut self, descriptor: ImportDescriptor) -> FuncRef {
        let index = self.functions.len() as u32;
        let function = FuncInstance::alloc_imported(index, descriptor);
        self.functions.push(function.clone());
        function
    }

    /// Returns the function at `index`.
    pub fn function(&self, index: u32) -> Option<FuncRef> {
        self.functions.get(index as usize).cloned()
    }

    /// Returns the number of declared and imported functions.
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub(crate) fn export_function(&mut self, name: &str, index: u32) {
        self.exported_functions.insert(name.to_string(), index);
    }

    /// Returns the function exported under `name`.
    pub fn exported_function(&self, name: &str) -> Option<FuncRef> {
        self.exported_functions
            .get(name)
            .and_then(|&index| self.function(index))
    }

    /// Assigns the module's linear memory.
    pub fn set_memory(&mut self, memory: MemoryRef) {
        self.memory = Some(memory);
    }

    /// Returns the module's linear memory, if assigned.
    pub fn memory(&self) -> Option<MemoryRef> {
        self.memory.clone()
    }

    pub(crate) fn set_memory_import(&mut self, descriptor: ImportDescriptor) {
        self.memory_import = Some(descriptor);
    }

    /// Returns the descriptor of the module's memory import, if the memory
    /// is imported.
    pub fn memory_import(&self) -> Option<&ImportDescriptor> {
        self.memory_import.as_ref()
    }

    pub(crate) fn set_exported_memory_name(&mut self, name: &str) {
        self.exported_memory_name = Some(name.to_string());
    }

    /// Returns the name the module's memory is exported under.
    pub fn exported_memory_name(&self) -> Option<&str> {
        self.exported_memory_name.as_deref()
    }

    /// Assigns the module's own table.
    pub fn set_table(&mut self, table: TableRef) {
        self.table = Some(table);
    }

    /// Records an imported table together with its descriptor.
    pub fn set_imported_table(&mut self, descriptor: ImportDescriptor, table: TableRef) {
        self.table_import = Some(descriptor);
        self.table = Some(table);
    }

    /// Returns the module's table, if assigned.
    pub fn table(&self) -> Option<TableRef> {
        self.table.clone()
    }

    /// Returns the descriptor of the module's table import, if the table is
    /// imported.
    pub fn table_import(&self) -> Option<&ImportDescriptor> {
        self.table_import.as_ref()
    }

    /// Exports the module's table under `name`.
    pub fn export_table(&mut self, name: &str) {
        self.exported_table_name = Some(name.to_string());
    }

    /// Returns the name the module's table is exported under.
    pub fn exported_table_name(&self) -> Option<&str> {
        self.exported_table_name.as_deref()
    }

    /// Declares a global at the next index, allocating its slot in `store`,
    /// and returns the index.
    pub fn declare_global(
        &mut self,
        store: &GlobalStore,
        value_type: ValueType,
        mutability: Mutability,
        initial: Value,
    ) -> u32 {
        let address = store.allocate(initial);
        let index = self.globals.len() as u32;
        self.globals
            .push(GlobalEntry::declared(value_type, mutability, address, initial));
        index
    }

    /// Records an imported global at `index` with the given resolution
    /// state and address.
    pub fn import_global(
        &mut self,
        index: u32,
        value_type: ValueType,
        mutability: Mutability,
        resolution: GlobalResolution,
        address: i32,
    ) -> u32 {
        let entry = GlobalEntry::imported(value_type, mutability, resolution, address);
        if (index as usize) < self.globals.len() {
            self.globals[index as usize] = entry;
        } else {
            self.globals.push(entry);
        }
        index
    }

    /// Exports the global at `index` under `name`.
    pub fn export_global(&mut self, name: &str, index: u32) {
        self.exported_globals.insert(name.to_string(), index);
    }

    /// Returns the index of the global exported under `name`.
    pub fn exported_global(&self, name: &str) -> Option<u32> {
        self.exported_globals.get(name).copied()
    }

    /// Returns the global entry at `index`.
    pub fn global(&self, index: u32) -> Option<&GlobalEntry> {
        self.globals.get(index as usize)
    }

    /// Returns all global entries in index order.
    pub fn globals(&self) -> &[GlobalEntry] {
        &self.globals
    }

    pub(crate) fn push_data_segment(&mut self, segment: DataSegment) {
        self.data_segments.push(segment);
    }

    pub(crate) fn data_segments(&self) -> &[DataSegment] {
        &self.data_segments
    }

    /// Designates the function at `index` as the module's start function.
    pub fn set_start_function(&mut self, index: u32) {
        self.start_function_index = Some(index);
    }

    /// Returns the module's start function, if one was designated.
    pub fn start_function(&self) -> Option<FuncRef> {
        self.start_function_index
            .and_then(|index| self.function(index))
    }
}

#[cfg(test)]
mod tests {
    use super::ModuleInstance;
    use crate::ImportDescriptor;

    #[test]
    fn function_indices_are_assigned_in_order() {
        let module = ModuleInstance::alloc("m");
        let imported = module
            .symbols_mut()
            .import_function(ImportDescriptor::new("env", "f"));
        let local = module.symbols_mut().declare_function();
        assert_eq!(imported.index(), 0);
        assert_eq!(local.index(), 1);
        assert!(imported.is_imported());
        assert!(!local.is_imported());
    }

    #[test]
    fn read_member_reports_unknown_identifier() {
        let module = ModuleInstance::alloc("m");
        let f = module.symbols_mut().declare_function();
        module.symbols_mut().export_function("f", f.index());

        assert!(module.read_member("f").is_ok());
        let err = module.read_member("g").unwrap_err();
        assert_eq!(err.message(), "Unknown identifier 'g' in the module 'm'.");
    }

    #[test]
    fn start_function_resolves_through_the_function_space() {
        let module = ModuleInstance::alloc("m");
        let f = module.symbols_mut().declare_function();
        assert!(module.symbols().start_function().is_none());
        module.symbols_mut().set_start_function(f.index());
        assert_eq!(module.symbols().start_function().unwrap().index(), 0);
    }
}
