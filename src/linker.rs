use crate::dag::{ResolutionDag, Resolver};
use crate::func::{BlockRef, FuncRef};
use crate::global::GlobalResolution;
use crate::host::Externals;
use crate::memory::MemoryRef;
use crate::module::{DataSegment, ModuleRef};
use crate::table::TableRef;
use crate::{Context, ImportDescriptor, LinkerError, Mutability, Sym, ValueType};
use memory_units::Pages;
use std::sync::atomic::{AtomicU8, Ordering};

/// State of the one-shot link state machine.
///
/// The state only ever moves forward: `NotLinked` → `InProgress` →
/// `Linked`. A failed link stays `InProgress`; the affected context cannot
/// be linked again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No link has been attempted yet.
    NotLinked,
    /// A link is running, or a previous link failed.
    InProgress,
    /// Linking completed successfully.
    Linked,
}

const STATE_NOT_LINKED: u8 = 0;
const STATE_IN_PROGRESS: u8 = 1;
const STATE_LINKED: u8 = 2;

/// Resolves cross-module references of the modules in a [`Context`].
///
/// A front end reports every import, export, call-site and data segment it
/// encounters to one of the `resolve_*`/`import_*` entry points. Global and
/// table imports are checked eagerly; everything else is recorded as a
/// deferred resolution. [`try_link`] then executes all deferred resolutions
/// in dependency order and runs the modules' start functions.
///
/// All entry points must be called from one logical executor; the linker is
/// not thread-safe and guards only against re-entry of [`try_link`].
///
/// [`Context`]: struct.Context.html
/// [`try_link`]: #method.try_link
pub struct Linker {
    dag: ResolutionDag,
    state: AtomicU8,
}

impl Default for Linker {
    fn default() -> Self {
        Self::new()
    }
}

impl Linker {
    /// Creates a linker with no recorded resolutions.
    pub fn new() -> Linker {
        Linker {
            dag: ResolutionDag::new(),
            state: AtomicU8::new(STATE_NOT_LINKED),
        }
    }

    /// Returns the current state of the link state machine.
    pub fn state(&self) -> LinkState {
        match self.state.load(Ordering::Acquire) {
            STATE_NOT_LINKED => LinkState::NotLinked,
            STATE_IN_PROGRESS => LinkState::InProgress,
            _ => LinkState::Linked,
        }
    }

    /// Returns the number of recorded, not yet executed resolutions.
    pub fn pending_resolutions(&self) -> usize {
        self.dag.len()
    }

    /// Eagerly resolves the global import at `index` of `module` against
    /// the export `name` of `from_module`.
    ///
    /// Returns the address of the shared global slot, or `-1` when the
    /// exporter is unknown or its global is itself not resolved yet; in both
    /// cases the import is recorded as unresolved.
    ///
    /// # Errors
    ///
    /// Returns `Err` when the exporter does not export `name`, or exports it
    /// with a different value type or mutability.
    #[allow(clippy::too_many_arguments)]
    pub fn import_global(
        &mut self,
        context: &Context,
        module: &ModuleRef,
        index: u32,
        from_module: &str,
        name: &str,
        value_type: ValueType,
        mutability: Mutability,
    ) -> Result<i32, LinkerError> {
        let exporter = match context.module(from_module) {
            Some(exporter) => exporter,
            None => {
                // TODO: enqueue a deferred resolver so that globals can be
                // imported from modules that are loaded later.
                module.symbols_mut().import_global(
                    index,
                    value_type,
                    mutability,
                    GlobalResolution::UnresolvedImport,
                    -1,
                );
                return Ok(-1);
            }
        };

        let (exported_type, exported_mutability, exported_resolution, exported_address) = {
            let symbols = exporter.symbols();
            let global_index = symbols.exported_global(name).ok_or_else(|| {
                LinkerError::new(format!(
                    "Global variable '{}', imported into module '{}', was not exported in the module '{}'.",
                    name,
                    module.name(),
                    from_module
                ))
            })?;
            let entry = symbols
                .global(global_index)
                .expect("exported globals refer to recorded entries");
            (
                entry.value_type(),
                entry.mutability(),
                entry.resolution(),
                entry.address(),
            )
        };

        if exported_type != value_type {
            return Err(LinkerError::new(format!(
                "Global variable '{}', imported into module '{}', was exported with the type {}, but imported with the type {}.",
                name,
                module.name(),
                exported_type,
                value_type
            )));
        }
        if exported_mutability != mutability {
            return Err(LinkerError::new(format!(
                "Global variable '{}', imported into module '{}', was exported as {}, but imported as {}.",
                name,
                module.name(),
                exported_mutability,
                mutability
            )));
        }

        if exported_resolution.is_resolved() {
            module.symbols_mut().import_global(
                index,
                value_type,
                mutability,
                GlobalResolution::Imported,
                exported_address,
            );
            Ok(exported_address)
        } else {
            module.symbols_mut().import_global(
                index,
                value_type,
                mutability,
                GlobalResolution::UnresolvedImport,
                -1,
            );
            Ok(-1)
        }
    }

    /// Eagerly resolves a table import of `module` against the table
    /// exported by `from_module` under `name`, grows the shared table to at
    /// least `init_size` and records it on the importer.
    ///
    /// # Errors
    ///
    /// Returns `Err` when the exporter is unknown (deferred table resolution
    /// is not implemented), exports no table or exports it under a different
    /// name, or when `init_size`/`max_size` exceed the exporter's bound.
    pub fn import_table(
        &mut self,
        context: &Context,
        module: &ModuleRef,
        from_module: &str,
        name: &str,
        init_size: u32,
        max_size: Option<u32>,
    ) -> Result<TableRef, LinkerError> {
        let exporter = context
            .module(from_module)
            .ok_or_else(|| LinkerError::new("Postponed table resolution not implemented."))?;

        let table = {
            let symbols = exporter.symbols();
            match (symbols.table(), symbols.exported_table_name()) {
                (Some(table), Some(exported_name)) if exported_name == name => table,
                (Some(_), Some(exported_name)) => {
                    return Err(LinkerError::new(format!(
                        "The imported module '{}' exports a table '{}', but module '{}' imports a table '{}'.",
                        from_module,
                        exported_name,
                        module.name(),
                        name
                    )));
                }
                _ => {
                    return Err(LinkerError::new(format!(
                        "The imported module '{}' does not export any tables, but module '{}' imports a table '{}'.",
                        from_module,
                        module.name(),
                        name
                    )));
                }
            }
        };

        if let Some(exporter_max) = table.maximum() {
            if init_size > exporter_max {
                return Err(LinkerError::new(format!(
                    "The table exported from the module '{}' has a maximum size of {}, but module '{}' imports it with an initial size of {}.",
                    from_module,
                    exporter_max,
                    module.name(),
                    init_size
                )));
            }
            if let Some(requested_max) = max_size {
                if requested_max > exporter_max {
                    return Err(LinkerError::new(format!(
                        "The table exported from the module '{}' has a maximum size of {}, but module '{}' imports it with a maximum size of {}.",
                        from_module,
                        exporter_max,
                        module.name(),
                        requested_max
                    )));
                }
            }
        }

        table.ensure_size_at_least(init_size)?;
        module
            .symbols_mut()
            .set_imported_table(ImportDescriptor::new(from_module, name), table.clone());
        Ok(table)
    }

    /// Records the resolution of the imported `function` of `module`
    /// against the matching function export.
    ///
    /// # Errors
    ///
    /// Returns `Err` when `function` is not an import. The lookup of the
    /// exporting module and its member happens when the link runs.
    pub fn resolve_function_import(
        &mut self,
        module: &ModuleRef,
        function: &FuncRef,
    ) -> Result<(), LinkerError> {
        let descriptor = function.import_descriptor().cloned().ok_or_else(|| {
            LinkerError::new(format!(
                "The function at index {} in the module '{}' is not an import.",
                function.index(),
                module.name()
            ))
        })?;

        let sym = Sym::ImportFunction {
            module: module.name().to_string(),
            descriptor: descriptor.clone(),
        };
        let dependency = Sym::ExportFunction {
            module: descriptor.module_name().to_string(),
            name: descriptor.member_name().to_string(),
        };

        let importer = module.name().to_string();
        let function = function.clone();
        self.dag.resolve_later(Resolver::new(
            sym,
            vec![dependency],
            Box::new(move |context: &Context| {
                let exporter = context.module(descriptor.module_name()).ok_or_else(|| {
                    missing_module_error(descriptor.module_name(), descriptor.member_name(), &importer)
                })?;
                let exported = match exporter.read_member(descriptor.member_name()) {
                    Ok(exported) => exported,
                    Err(_) => {
                        return Err(LinkerError::new(format!(
                            "The imported function '{}', referenced in the module '{}', does not exist in the imported module '{}'.",
                            descriptor.member_name(),
                            importer,
                            descriptor.module_name()
                        )));
                    }
                };
                function.set_call_target(exported.resolve_call_target()?);
                Ok(())
            }),
        ));
        Ok(())
    }

    /// Records the export of the function at `index` of `module` under
    /// `exported_name` and registers the export symbol importers order
    /// against.
    ///
    /// # Errors
    ///
    /// Returns `Err` when `module` declares no function at `index`.
    pub fn resolve_function_export(
        &mut self,
        module: &ModuleRef,
        index: u32,
        exported_name: &str,
    ) -> Result<(), LinkerError> {
        let function = module.symbols().function(index).ok_or_else(|| {
            LinkerError::new(format!(
                "The module '{}' does not declare a function at index {}.",
                module.name(),
                index
            ))
        })?;
        module.symbols_mut().export_function(exported_name, index);

        let sym = Sym::ExportFunction {
            module: module.name().to_string(),
            name: exported_name.to_string(),
        };
        // A re-exported import can only be forwarded once the import itself
        // has a call target.
        let dependencies = match function.import_descriptor() {
            Some(descriptor) => vec![Sym::ImportFunction {
                module: module.name().to_string(),
                descriptor: descriptor.clone(),
            }],
            None => Vec::new(),
        };
        self.dag
            .resolve_later(Resolver::new(sym, dependencies, Box::new(|_| Ok(()))));
        Ok(())
    }

    /// Records the resolution of the call node at `control_table_offset` of
    /// `block`, which calls `function`.
    pub fn resolve_callsite(
        &mut self,
        module: &ModuleRef,
        block: &BlockRef,
        control_table_offset: u32,
        function: &FuncRef,
    ) {
        let sym = Sym::Callsite {
            module: module.name().to_string(),
            instruction_offset: block.start_offset(),
            control_table_offset,
        };
        let dependency = match function.import_descriptor() {
            Some(descriptor) => Sym::ImportFunction {
                module: module.name().to_string(),
                descriptor: descriptor.clone(),
            },
            None => Sym::CodeEntry {
                module: module.name().to_string(),
                function_index: function.index(),
            },
        };

        let block = block.clone();
        let function = function.clone();
        self.dag.resolve_later(Resolver::new(
            sym,
            vec![dependency],
            Box::new(move |_context: &Context| {
                block.resolve_call_node(control_table_offset, function.resolve_call_target()?);
                Ok(())
            }),
        ));
    }

    /// Registers the code entry of the local function `function_index` of
    /// `module`.
    ///
    /// The resolver has no dependencies and no effect; it exists as the
    /// dependency target call-sites of local functions order against.
    pub fn resolve_code_entry(&mut self, module: &ModuleRef, function_index: u32) {
        let sym = Sym::CodeEntry {
            module: module.name().to_string(),
            function_index,
        };
        self.dag
            .resolve_later(Resolver::new(sym, Vec::new(), Box::new(|_| Ok(()))));
    }

    /// Records the resolution of a memory import of `module` described by
    /// `descriptor`.
    ///
    /// When the link runs, the exporter's memory is validated against
    /// `init_size` and `max_size`, grown to at least `init_size` pages, and
    /// passed to the `set_memory` effect.
    pub fn resolve_memory_import<F>(
        &mut self,
        module: &ModuleRef,
        descriptor: ImportDescriptor,
        init_size: Pages,
        max_size: Option<Pages>,
        set_memory: F,
    ) where
        F: FnOnce(MemoryRef) + 'static,
    {
        module.symbols_mut().set_memory_import(descriptor.clone());

        let sym = Sym::ImportMemory {
            module: module.name().to_string(),
            descriptor: descriptor.clone(),
        };
        let dependency = Sym::ExportMemory {
            module: descriptor.module_name().to_string(),
            name: descriptor.member_name().to_string(),
        };

        let importer = module.name().to_string();
        self.dag.resolve_later(Resolver::new(
            sym,
            vec![dependency],
            Box::new(move |context: &Context| {
                let exporter = context.module(descriptor.module_name()).ok_or_else(|| {
                    missing_module_error(descriptor.module_name(), descriptor.member_name(), &importer)
                })?;
                let memory = {
                    let symbols = exporter.symbols();
                    match (symbols.memory(), symbols.exported_memory_name()) {
                        (Some(memory), Some(exported_name))
                            if exported_name == descriptor.member_name() =>
                        {
                            memory
                        }
                        (Some(_), Some(exported_name)) => {
                            return Err(LinkerError::new(format!(
                                "The imported module '{}' exports a memory '{}', but module '{}' imports a memory '{}'.",
                                descriptor.module_name(),
                                exported_name,
                                importer,
                                descriptor.module_name()
                            )));
                        }
                        _ => {
                            return Err(LinkerError::new(format!(
                                "The imported module '{}' does not export any memories, but module '{}' imports a memory '{}'.",
                                descriptor.module_name(),
                                importer,
                                descriptor.module_name()
                            )));
                        }
                    }
                };

                if let Some(exporter_max) = memory.maximum() {
                    if init_size > exporter_max {
                        return Err(LinkerError::new(format!(
                            "The memory exported from the module '{}' has a maximum size of {} pages, but module '{}' imports it with an initial size of {} pages.",
                            descriptor.module_name(),
                            exporter_max.0,
                            importer,
                            init_size.0
                        )));
                    }
                    if let Some(requested_max) = max_size {
                        if requested_max > exporter_max {
                            return Err(LinkerError::new(format!(
                                "The memory exported from the module '{}' has a maximum size of {} pages, but module '{}' imports it with a maximum size of {} pages.",
                                descriptor.module_name(),
                                exporter_max.0,
                                importer,
                                requested_max.0
                            )));
                        }
                    }
                }

                let current = memory.current_size();
                if current < init_size {
                    memory.grow(Pages(init_size.0 - current.0))?;
                }
                set_memory(memory);
                Ok(())
            }),
        ));
    }

    /// Records the export of the memory of `module` under `exported_name`
    /// and registers the export symbol importers order against.
    pub fn resolve_memory_export(&mut self, module: &ModuleRef, exported_name: &str) {
        module.symbols_mut().set_exported_memory_name(exported_name);

        let sym = Sym::ExportMemory {
            module: module.name().to_string(),
            name: exported_name.to_string(),
        };
        // A re-exported memory import is only available once the import has
        // been bound to the exporter's memory.
        let dependencies = match module.symbols().memory_import() {
            Some(descriptor) => vec![Sym::ImportMemory {
                module: module.name().to_string(),
                descriptor: descriptor.clone(),
            }],
            None => Vec::new(),
        };
        self.dag
            .resolve_later(Resolver::new(sym, dependencies, Box::new(|_| Ok(()))));
    }

    /// Records the initialization of the data section `id` of `module`:
    /// `bytes` are written at `base_address` when the link runs.
    ///
    /// Unless `prior_data_sections_resolved` is set, the write is ordered
    /// after the write of data section `id - 1`, so the sections of one
    /// module land in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns `Err` when `module` neither declares nor imports a memory.
    pub fn resolve_data_section(
        &mut self,
        module: &ModuleRef,
        id: u32,
        base_address: u32,
        bytes: Vec<u8>,
        prior_data_sections_resolved: bool,
    ) -> Result<(), LinkerError> {
        let memory_import = {
            let symbols = module.symbols();
            if symbols.memory().is_none() && symbols.memory_import().is_none() {
                return Err(no_memory_error(module.name()));
            }
            symbols.memory_import().cloned()
        };

        module.symbols_mut().push_data_segment(DataSegment {
            base_address,
            bytes: bytes.clone(),
        });

        let mut dependencies = Vec::new();
        if let Some(descriptor) = memory_import {
            dependencies.push(Sym::ImportMemory {
                module: module.name().to_string(),
                descriptor,
            });
        }
        if !prior_data_sections_resolved && id > 0 {
            dependencies.push(Sym::Data {
                module: module.name().to_string(),
                data_section_id: id - 1,
            });
        }

        let sym = Sym::Data {
            module: module.name().to_string(),
            data_section_id: id,
        };
        let module = module.clone();
        self.dag.resolve_later(Resolver::new(
            sym,
            dependencies,
            Box::new(move |_context: &Context| {
                let memory = module
                    .symbols()
                    .memory()
                    .ok_or_else(|| no_memory_error(module.name()))?;
                memory.validate_address(base_address, bytes.len() as u32)?;
                memory.set(base_address, &bytes)
            }),
        ));
        Ok(())
    }

    /// Links all modules of `context`.
    ///
    /// Runs every recorded resolution in dependency order, marks every
    /// module as linked, invokes each module's start function through
    /// `externals` (in module registration order, with no arguments) and
    /// clears the recorded resolutions. When the linker is already
    /// `InProgress` or `Linked`, returns immediately without an error.
    ///
    /// # Errors
    ///
    /// Returns `Err` when the dependencies contain a cycle or any resolution
    /// fails. The link aborts at the first failure; no completed effect is
    /// rolled back, and the state stays `InProgress`.
    pub fn try_link<E: Externals>(
        &mut self,
        context: &Context,
        externals: &mut E,
    ) -> Result<(), LinkerError> {
        if self
            .state
            .compare_exchange(
                STATE_NOT_LINKED,
                STATE_IN_PROGRESS,
                Ordering::Acquire,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Ok(());
        }

        let order = self.dag.toposort()?;
        for sym in order {
            if let Some(resolver) = self.dag.take(&sym) {
                resolver.run(context)?;
            }
        }

        let modules = context.modules();
        for module in &modules {
            module.set_linked();
        }
        for module in &modules {
            let start = module.symbols().start_function();
            if let Some(start) = start {
                let target = start.resolve_call_target()?;
                externals.invoke(&target, &[])?;
            }
        }

        self.dag.clear();
        self.state.store(STATE_LINKED, Ordering::Release);
        Ok(())
    }

    /// Re-runs the initialization of `module`: every declared global is set
    /// back to its initial value and all data segments are written again.
    /// The module's memory is zeroed first iff `zero_memory` is set.
    ///
    /// Intended for test and benchmark reuse of a linked module; this is
    /// outside the link state machine.
    ///
    /// # Errors
    ///
    /// Returns `Err` when a recorded data segment no longer fits the
    /// module's memory.
    pub fn reset_module_state(
        &self,
        context: &Context,
        module: &ModuleRef,
        zero_memory: bool,
    ) -> Result<(), LinkerError> {
        let symbols = module.symbols();
        if zero_memory {
            if let Some(memory) = symbols.memory() {
                memory.erase();
            }
        }
        for entry in symbols.globals() {
            if let (GlobalResolution::Declared, Some(initial)) =
                (entry.resolution(), entry.initial())
            {
                context.globals().store(entry.address(), initial);
            }
        }
        if let Some(memory) = symbols.memory() {
            for segment in symbols.data_segments() {
                memory.set(segment.base_address, &segment.bytes)?;
            }
        }
        Ok(())
    }
}

fn missing_module_error(from: &str, member: &str, importer: &str) -> LinkerError {
    LinkerError::new(format!(
        "The module '{}', referenced by the import '{}' in the module '{}', does not exist.",
        from, member, importer
    ))
}

fn no_memory_error(module: &str) -> LinkerError {
    LinkerError::new(format!(
        "No memory declared or imported in the module '{}'.",
        module
    ))
}

#[cfg(test)]
mod tests {
    use super::{LinkState, Linker};
    use crate::{
        Context, GlobalResolution, ImportDescriptor, ModuleInstance, Mutability, NopExternals,
        TableInstance, Value, ValueType,
    };
    use assert_matches::assert_matches;

    #[test]
    fn import_global_from_unknown_module_stays_unresolved() {
        let context = Context::new();
        let main = ModuleInstance::alloc("main");

        let mut linker = Linker::new();
        let address = linker
            .import_global(
                &context,
                &main,
                0,
                "env",
                "g",
                ValueType::I32,
                Mutability::Const,
            )
            .unwrap();
        assert_eq!(address, -1);
        let symbols = main.symbols();
        let entry = symbols.global(0).unwrap();
        assert_matches!(entry.resolution(), GlobalResolution::UnresolvedImport);
        assert_eq!(entry.address(), -1);
    }

    #[test]
    fn import_global_binds_to_the_exporter_address() {
        let context = Context::new();
        let env = ModuleInstance::alloc("env");
        let index = env.symbols_mut().declare_global(
            context.globals(),
            ValueType::I32,
            Mutability::Const,
            Value::I32(7),
        );
        env.symbols_mut().export_global("g", index);
        context.push_module(env.clone());
        let main = ModuleInstance::alloc("main");

        let mut linker = Linker::new();
        let address = linker
            .import_global(
                &context,
                &main,
                0,
                "env",
                "g",
                ValueType::I32,
                Mutability::Const,
            )
            .unwrap();
        assert_eq!(address, env.symbols().global(index).unwrap().address());
        let symbols = main.symbols();
        let entry = symbols.global(0).unwrap();
        assert_matches!(entry.resolution(), GlobalResolution::Imported);
        assert_eq!(context.load_as_int(entry.address()), 7);
    }

    #[test]
    fn import_global_requires_the_export() {
        let context = Context::new();
        context.push_module(ModuleInstance::alloc("env"));
        let main = ModuleInstance::alloc("main");

        let mut linker = Linker::new();
        let err = linker
            .import_global(
                &context,
                &main,
                0,
                "env",
                "counter",
                ValueType::I32,
                Mutability::Const,
            )
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Global variable 'counter', imported into module 'main', was not exported in the module 'env'."
        );
    }

    #[test]
    fn import_global_checks_type_and_mutability() {
        let context = Context::new();
        let env = ModuleInstance::alloc("env");
        let index = env.symbols_mut().declare_global(
            context.globals(),
            ValueType::I64,
            Mutability::Var,
            Value::I64(0),
        );
        env.symbols_mut().export_global("g", index);
        context.push_module(env);
        let main = ModuleInstance::alloc("main");

        let mut linker = Linker::new();
        let err = linker
            .import_global(
                &context,
                &main,
                0,
                "env",
                "g",
                ValueType::I32,
                Mutability::Var,
            )
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Global variable 'g', imported into module 'main', was exported with the type i64, but imported with the type i32."
        );

        let err = linker
            .import_global(
                &context,
                &main,
                0,
                "env",
                "g",
                ValueType::I64,
                Mutability::Const,
            )
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Global variable 'g', imported into module 'main', was exported as mutable, but imported as const."
        );
    }

    #[test]
    fn import_table_from_unknown_module_is_postponed() {
        let context = Context::new();
        let main = ModuleInstance::alloc("main");

        let mut linker = Linker::new();
        let err = linker
            .import_table(&context, &main, "env", "tab", 1, None)
            .unwrap_err();
        assert_eq!(err.message(), "Postponed table resolution not implemented.");
    }

    #[test]
    fn import_table_shares_and_grows_the_exported_table() {
        let context = Context::new();
        let env = ModuleInstance::alloc("env");
        let table = TableInstance::alloc(1, Some(10)).unwrap();
        env.symbols_mut().set_table(table.clone());
        env.symbols_mut().export_table("tab");
        context.push_module(env);
        let main = ModuleInstance::alloc("main");

        let mut linker = Linker::new();
        let shared = linker
            .import_table(&context, &main, "env", "tab", 4, Some(10))
            .unwrap();
        assert_eq!(shared.current_size(), 4);
        assert_eq!(table.current_size(), 4);
        assert_eq!(
            main.symbols().table_import(),
            Some(&ImportDescriptor::new("env", "tab"))
        );
    }

    #[test]
    fn import_table_checks_names_and_sizes() {
        let context = Context::new();
        let env = ModuleInstance::alloc("env");
        let table = TableInstance::alloc(1, Some(4)).unwrap();
        env.symbols_mut().set_table(table);
        env.symbols_mut().export_table("tab");
        context.push_module(env);
        let bare = ModuleInstance::alloc("bare");
        context.push_module(bare);
        let main = ModuleInstance::alloc("main");

        let mut linker = Linker::new();
        let err = linker
            .import_table(&context, &main, "env", "other", 1, None)
            .unwrap_err();
        assert_eq!(
            err.message(),
            "The imported module 'env' exports a table 'tab', but module 'main' imports a table 'other'."
        );

        let err = linker
            .import_table(&context, &main, "bare", "tab", 1, None)
            .unwrap_err();
        assert_eq!(
            err.message(),
            "The imported module 'bare' does not export any tables, but module 'main' imports a table 'tab'."
        );

        let err = linker
            .import_table(&context, &main, "env", "tab", 5, None)
            .unwrap_err();
        assert_eq!(
            err.message(),
            "The table exported from the module 'env' has a maximum size of 4, but module 'main' imports it with an initial size of 5."
        );

        let err = linker
            .import_table(&context, &main, "env", "tab", 2, Some(8))
            .unwrap_err();
        assert_eq!(
            err.message(),
            "The table exported from the module 'env' has a maximum size of 4, but module 'main' imports it with a maximum size of 8."
        );
    }

    #[test]
    fn resolve_function_import_rejects_local_functions() {
        let main = ModuleInstance::alloc("main");
        let local = main.symbols_mut().declare_function();

        let mut linker = Linker::new();
        let err = linker.resolve_function_import(&main, &local).unwrap_err();
        assert_eq!(
            err.message(),
            "The function at index 0 in the module 'main' is not an import."
        );
    }

    #[test]
    fn resolve_data_section_requires_a_memory() {
        let main = ModuleInstance::alloc("main");
        let mut linker = Linker::new();
        let err = linker
            .resolve_data_section(&main, 0, 0, vec![1], true)
            .unwrap_err();
        assert_eq!(
            err.message(),
            "No memory declared or imported in the module 'main'."
        );
    }

    #[test]
    fn state_machine_is_one_shot() {
        let context = Context::new();
        let mut linker = Linker::new();
        assert_eq!(linker.state(), LinkState::NotLinked);
        linker.try_link(&context, &mut NopExternals).unwrap();
        assert_eq!(linker.state(), LinkState::Linked);
        // Linked already; this is a no-op.
        linker.try_link(&context, &mut NopExternals).unwrap();
        assert_eq!(linker.state(), LinkState::Linked);
    }
}
