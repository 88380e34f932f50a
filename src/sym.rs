use crate::ImportDescriptor;
use core::fmt;

/// Identity of a linkable entity.
///
/// Every deferred resolution is registered under one of these symbols, and
/// dependencies between resolutions are expressed as edges between symbols.
/// Two symbols are equal iff their variant and all fields are equal; the
/// derived hash is consistent with that equality.
///
/// The `Display` rendering is the canonical human-readable form used in
/// cycle diagnostics, e.g. `(import func printf from env into main)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sym {
    /// A function import of `module`, identified by its import descriptor.
    ImportFunction {
        /// Name of the importing module.
        module: String,
        /// The imported member.
        descriptor: ImportDescriptor,
    },
    /// A function exported by `module` under `name`.
    ExportFunction {
        /// Name of the exporting module.
        module: String,
        /// Name the function is exported under.
        name: String,
    },
    /// A call-site within a function body of `module`.
    Callsite {
        /// Name of the module containing the call-site.
        module: String,
        /// Bytecode offset of the block containing the call node.
        instruction_offset: u32,
        /// Offset of the call node in the block's control table.
        control_table_offset: u32,
    },
    /// The code entry of the local function `function_index` in `module`.
    CodeEntry {
        /// Name of the declaring module.
        module: String,
        /// Index of the function.
        function_index: u32,
    },
    /// A memory import of `module`, identified by its import descriptor.
    ImportMemory {
        /// Name of the importing module.
        module: String,
        /// The imported member.
        descriptor: ImportDescriptor,
    },
    /// A memory exported by `module` under `name`.
    ExportMemory {
        /// Name of the exporting module.
        module: String,
        /// Name the memory is exported under.
        name: String,
    },
    /// The data section `data_section_id` of `module`.
    Data {
        /// Name of the module declaring the data section.
        module: String,
        /// Index of the data section within the module.
        data_section_id: u32,
    },
}

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Sym::ImportFunction { module, descriptor } => write!(
                f,
                "(import func {} from {} into {})",
                descriptor.member_name(),
                descriptor.module_name(),
                module
            ),
            Sym::ExportFunction { module, name } => {
                write!(f, "(export func {} from {})", name, module)
            }
            Sym::Callsite {
                module,
                instruction_offset,
                ..
            } => write!(f, "(callsite at {} in {})", instruction_offset, module),
            Sym::CodeEntry {
                module,
                function_index,
            } => write!(f, "(code {} in {})", function_index, module),
            Sym::ImportMemory { module, descriptor } => write!(
                f,
                "(import memory {} from {} into {})",
                descriptor.member_name(),
                descriptor.module_name(),
                module
            ),
            Sym::ExportMemory { module, name } => {
                write!(f, "(export memory {} from {})", name, module)
            }
            Sym::Data {
                module,
                data_section_id,
            } => write!(f, "(data {} in {})", data_section_id, module),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Sym;
    use crate::ImportDescriptor;
    use std::collections::HashMap;

    #[test]
    fn canonical_renderings() {
        let import = Sym::ImportFunction {
            module: "main".into(),
            descriptor: ImportDescriptor::new("env", "printf"),
        };
        assert_eq!(import.to_string(), "(import func printf from env into main)");

        let export = Sym::ExportMemory {
            module: "env".into(),
            name: "memory".into(),
        };
        assert_eq!(export.to_string(), "(export memory memory from env)");

        let callsite = Sym::Callsite {
            module: "main".into(),
            instruction_offset: 42,
            control_table_offset: 7,
        };
        assert_eq!(callsite.to_string(), "(callsite at 42 in main)");

        let data = Sym::Data {
            module: "main".into(),
            data_section_id: 3,
        };
        assert_eq!(data.to_string(), "(data 3 in main)");
    }

    #[test]
    fn equality_compares_all_fields() {
        let a = Sym::Callsite {
            module: "main".into(),
            instruction_offset: 42,
            control_table_offset: 0,
        };
        let b = Sym::Callsite {
            module: "main".into(),
            instruction_offset: 42,
            control_table_offset: 1,
        };
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn hash_is_consistent_with_equality() {
        let mut map = HashMap::new();
        let sym = Sym::ExportFunction {
            module: "env".into(),
            name: "print".into(),
        };
        map.insert(sym.clone(), 1);
        map.insert(sym.clone(), 2);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&sym], 2);
    }
}
