use crate::func::FuncRef;
use crate::types::check_limits;
use crate::LinkerError;
use core::fmt;
use parity_wasm::elements::ResizableLimits;
use std::cell::RefCell;
use std::rc::Rc;

/// Reference to a table (see [`TableInstance`] for details).
///
/// This reference has a reference-counting semantics: a module importing a
/// table shares the instance with the exporting module.
///
/// [`TableInstance`]: struct.TableInstance.html
#[derive(Clone, Debug)]
pub struct TableRef(Rc<TableInstance>);

impl ::core::ops::Deref for TableRef {
    type Target = TableInstance;
    fn deref(&self) -> &TableInstance {
        &self.0
    }
}

/// Runtime representation of a table.
///
/// A table is an array of untyped function references, letting wasm code
/// call functions indirectly through a dynamic index. It is created with an
/// initial size and grown on demand, optionally bounded by a maximum size.
pub struct TableInstance {
    /// Table limits.
    limits: ResizableLimits,
    /// Table elements.
    buffer: RefCell<Vec<Option<FuncRef>>>,
}

impl fmt::Debug for TableInstance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TableInstance")
            .field("limits", &self.limits)
            .field("buffer.len", &self.buffer.borrow().len())
            .finish()
    }
}

impl TableInstance {
    /// Allocate a table instance with `initial` elements, optionally bounded
    /// by `maximum` elements. All elements start uninitialized.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `initial` is greater than `maximum`.
    pub fn alloc(initial: u32, maximum: Option<u32>) -> Result<TableRef, LinkerError> {
        let limits = ResizableLimits::new(initial, maximum);
        check_limits(&limits)?;
        Ok(TableRef(Rc::new(TableInstance {
            buffer: RefCell::new(vec![None; initial as usize]),
            limits,
        })))
    }

    /// Returns the size this table was created with.
    pub fn initial_size(&self) -> u32 {
        self.limits.initial()
    }

    /// Returns the maximum size this table can grow to, or `None` if the
    /// growth is unbounded.
    pub fn maximum(&self) -> Option<u32> {
        self.limits.maximum()
    }

    /// Returns the current size of the table.
    pub fn current_size(&self) -> u32 {
        self.buffer.borrow().len() as u32
    }

    /// Grows this table so that it holds at least `required` elements. Does
    /// nothing when the table is already large enough.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `required` exceeds the maximum size.
    pub fn ensure_size_at_least(&self, required: u32) -> Result<(), LinkerError> {
        if let Some(maximum) = self.maximum() {
            if required > maximum {
                return Err(LinkerError::new(format!(
                    "Trying to ensure a table size of {} elements when the maximum is {} elements.",
                    required, maximum
                )));
            }
        }
        let mut buffer = self.buffer.borrow_mut();
        if (buffer.len() as u32) < required {
            buffer.resize(required as usize, None);
        }
        Ok(())
    }

    /// Returns the element at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `offset` is out of bounds.
    pub fn get(&self, offset: u32) -> Result<Option<FuncRef>, LinkerError> {
        let buffer = self.buffer.borrow();
        let buffer_len = buffer.len();
        buffer.get(offset as usize).cloned().ok_or_else(|| {
            LinkerError::new(format!(
                "Trying to read the table element at index {} when there are only {} elements.",
                offset, buffer_len
            ))
        })
    }

    /// Sets the element at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `offset` is out of bounds.
    pub fn set(&self, offset: u32, value: Option<FuncRef>) -> Result<(), LinkerError> {
        let mut buffer = self.buffer.borrow_mut();
        let buffer_len = buffer.len();
        let element = buffer.get_mut(offset as usize).ok_or_else(|| {
            LinkerError::new(format!(
                "Trying to update the table element at index {} when there are only {} elements.",
                offset, buffer_len
            ))
        })?;
        *element = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::TableInstance;

    #[test]
    fn ensure_size_grows_once() {
        let table = TableInstance::alloc(1, Some(4)).unwrap();
        table.ensure_size_at_least(3).unwrap();
        assert_eq!(table.current_size(), 3);
        // Already large enough; size is unchanged.
        table.ensure_size_at_least(2).unwrap();
        assert_eq!(table.current_size(), 3);
    }

    #[test]
    fn ensure_size_respects_maximum() {
        let table = TableInstance::alloc(1, Some(2)).unwrap();
        assert!(table.ensure_size_at_least(3).is_err());
        assert_eq!(table.current_size(), 1);
    }

    #[test]
    fn alloc_rejects_initial_above_maximum() {
        assert!(TableInstance::alloc(3, Some(2)).is_err());
    }

    #[test]
    fn out_of_bounds_access() {
        let table = TableInstance::alloc(1, None).unwrap();
        assert!(table.get(0).unwrap().is_none());
        assert!(table.get(1).is_err());
        assert!(table.set(1, None).is_err());
    }
}
