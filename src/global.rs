use crate::{Mutability, Value, ValueType};
use std::cell::RefCell;

/// How an imported global variable was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalResolution {
    /// The global is declared by its own module.
    Declared,
    /// The global was imported and bound to the exporter's address.
    Imported,
    /// The global was imported but its exporter has not provided an address.
    UnresolvedImport,
}

impl GlobalResolution {
    /// Returns `true` if the global has a valid address in the store.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, GlobalResolution::UnresolvedImport)
    }
}

/// Per-index record of a module's global variable.
#[derive(Debug, Clone)]
pub struct GlobalEntry {
    value_type: ValueType,
    mutability: Mutability,
    resolution: GlobalResolution,
    address: i32,
    initial: Option<Value>,
}

impl GlobalEntry {
    pub(crate) fn declared(
        value_type: ValueType,
        mutability: Mutability,
        address: i32,
        initial: Value,
    ) -> GlobalEntry {
        GlobalEntry {
            value_type,
            mutability,
            resolution: GlobalResolution::Declared,
            address,
            initial: Some(initial),
        }
    }

    pub(crate) fn imported(
        value_type: ValueType,
        mutability: Mutability,
        resolution: GlobalResolution,
        address: i32,
    ) -> GlobalEntry {
        GlobalEntry {
            value_type,
            mutability,
            resolution,
            address,
            initial: None,
        }
    }

    /// Returns the value type of this global.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Returns the mutability modifier of this global.
    pub fn mutability(&self) -> Mutability {
        self.mutability
    }

    /// Returns how this global was resolved.
    pub fn resolution(&self) -> GlobalResolution {
        self.resolution
    }

    /// Returns the address of this global in the store, or `-1` while the
    /// import is unresolved.
    pub fn address(&self) -> i32 {
        self.address
    }

    /// Returns the declared initial value, or `None` for imported globals.
    pub fn initial(&self) -> Option<Value> {
        self.initial
    }
}

/// Context-wide store of global-variable values, addressed by the integer
/// address handed out at allocation.
#[derive(Debug, Default)]
pub struct GlobalStore {
    values: RefCell<Vec<Value>>,
}

impl GlobalStore {
    /// Creates an empty store.
    pub fn new() -> GlobalStore {
        GlobalStore::default()
    }

    /// Allocates a slot holding `initial` and returns its address.
    pub fn allocate(&self, initial: Value) -> i32 {
        let mut values = self.values.borrow_mut();
        values.push(initial);
        (values.len() - 1) as i32
    }

    /// Returns the value at `address`.
    ///
    /// # Panics
    ///
    /// Panics if `address` was not handed out by [`allocate`].
    ///
    /// [`allocate`]: #method.allocate
    pub fn load(&self, address: i32) -> Value {
        self.values.borrow()[address as usize]
    }

    /// Returns the value at `address` widened to an `i64`.
    pub fn load_as_int(&self, address: i32) -> i64 {
        self.load(address).as_int()
    }

    /// Overwrites the value at `address`.
    ///
    /// # Panics
    ///
    /// Panics if `address` was not handed out by [`allocate`].
    ///
    /// [`allocate`]: #method.allocate
    pub fn store(&self, address: i32, value: Value) {
        self.values.borrow_mut()[address as usize] = value;
    }

    /// Returns the number of allocated slots.
    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::GlobalStore;
    use crate::Value;

    #[test]
    fn allocate_load_store() {
        let store = GlobalStore::new();
        let a = store.allocate(Value::I32(11));
        let b = store.allocate(Value::I64(-7));
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(store.load(a), Value::I32(11));
        assert_eq!(store.load_as_int(b), -7);
        store.store(a, Value::I32(42));
        assert_eq!(store.load_as_int(a), 42);
    }
}
