use crate::global::GlobalStore;
use crate::module::ModuleRef;
use indexmap::IndexMap;
use std::cell::RefCell;

/// Process-wide registry of modules sharing one global-variable store.
///
/// Modules are keyed by their unique name; iteration is in registration
/// order, which determines the order start functions run in after a link.
/// A context is created once per embedding.
#[derive(Debug, Default)]
pub struct Context {
    modules: RefCell<IndexMap<String, ModuleRef>>,
    globals: GlobalStore,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Context {
        Context::default()
    }

    /// Registers `module` under its name. A module registered under the
    /// same name before is replaced.
    pub fn push_module(&self, module: ModuleRef) {
        self.modules
            .borrow_mut()
            .insert(module.name().to_string(), module);
    }

    /// Returns the module registered under `name`.
    pub fn module(&self, name: &str) -> Option<ModuleRef> {
        self.modules.borrow().get(name).cloned()
    }

    /// Returns all registered modules in registration order.
    ///
    /// The returned snapshot stays valid while callbacks (such as start
    /// functions) re-enter the context.
    pub fn modules(&self) -> Vec<ModuleRef> {
        self.modules.borrow().values().cloned().collect()
    }

    /// Returns the shared global-variable store.
    pub fn globals(&self) -> &GlobalStore {
        &self.globals
    }

    /// Returns the global value at `address` widened to an `i64`.
    pub fn load_as_int(&self, address: i32) -> i64 {
        self.globals.load_as_int(address)
    }
}

#[cfg(test)]
mod tests {
    use super::Context;
    use crate::ModuleInstance;

    #[test]
    fn modules_iterate_in_registration_order() {
        let context = Context::new();
        for name in ["zeta", "alpha", "mid"] {
            context.push_module(ModuleInstance::alloc(name));
        }
        let names: Vec<String> = context
            .modules()
            .iter()
            .map(|module| module.name().to_string())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn reregistration_replaces() {
        let context = Context::new();
        context.push_module(ModuleInstance::alloc("m"));
        let replacement = ModuleInstance::alloc("m");
        context.push_module(replacement.clone());
        assert_eq!(context.modules().len(), 1);
        replacement.set_linked();
        assert!(context.module("m").unwrap().is_linked());
    }
}
