use crate::types::check_limits;
use crate::LinkerError;
use core::fmt;
use memory_units::{Bytes, Pages, RoundUpTo};
use parity_wasm::elements::ResizableLimits;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Size of a page of [linear memory][`MemoryInstance`] - 64KiB.
///
/// The size of a memory is always a integer multiple of a page size.
///
/// [`MemoryInstance`]: struct.MemoryInstance.html
pub const LINEAR_MEMORY_PAGE_SIZE: Bytes = Bytes(65536);

/// Maximal number of pages.
const LINEAR_MEMORY_MAX_PAGES: Pages = Pages(65536);

/// Reference to a memory (see [`MemoryInstance`] for details).
///
/// This reference has a reference-counting semantics: a module importing a
/// memory holds the same instance as the exporting module, so writes through
/// either module are visible through the other.
///
/// [`MemoryInstance`]: struct.MemoryInstance.html
#[derive(Clone, Debug)]
pub struct MemoryRef(Rc<MemoryInstance>);

impl ::core::ops::Deref for MemoryRef {
    type Target = MemoryInstance;
    fn deref(&self) -> &MemoryInstance {
        &self.0
    }
}

/// Runtime representation of a linear memory.
///
/// A memory is a contiguous, mutable array of raw bytes, created with an
/// initial size and grown dynamically in whole pages. Growth can be limited
/// by an optional maximum size. The byte buffer is allocated lazily: pages
/// that were never written occupy no host memory.
pub struct MemoryInstance {
    /// Memory limits, in pages.
    limits: ResizableLimits,
    /// Linear memory buffer with lazy allocation.
    buffer: RefCell<Vec<u8>>,
    /// Logical size, in bytes.
    current_size: Cell<usize>,
}

impl fmt::Debug for MemoryInstance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MemoryInstance")
            .field("limits", &self.limits)
            .field("buffer.len", &self.buffer.borrow().len())
            .field("current_size", &self.current_size.get())
            .finish()
    }
}

impl MemoryInstance {
    /// Allocate a memory instance with `initial` pages, optionally bounded
    /// by `maximum` pages.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `initial` is greater than `maximum`, or either
    /// exceeds `65536` pages (4GiB).
    pub fn alloc(initial: Pages, maximum: Option<Pages>) -> Result<MemoryRef, LinkerError> {
        if initial > LINEAR_MEMORY_MAX_PAGES {
            return Err(LinkerError::new(format!(
                "initial memory size must be at most {} pages",
                LINEAR_MEMORY_MAX_PAGES.0
            )));
        }
        if let Some(maximum) = maximum {
            if maximum > LINEAR_MEMORY_MAX_PAGES {
                return Err(LinkerError::new(format!(
                    "maximum memory size must be at most {} pages",
                    LINEAR_MEMORY_MAX_PAGES.0
                )));
            }
        }
        let limits = ResizableLimits::new(initial.0 as u32, maximum.map(|p| p.0 as u32));
        check_limits(&limits)?;

        let initial_size: Bytes = initial.into();
        Ok(MemoryRef(Rc::new(MemoryInstance {
            limits,
            buffer: RefCell::new(Vec::new()),
            current_size: Cell::new(initial_size.0),
        })))
    }

    /// Returns the number of pages this memory was created with.
    pub fn initial(&self) -> Pages {
        Pages(self.limits.initial() as usize)
    }

    /// Returns the maximum number of pages this memory can grow to, or
    /// `None` if the growth is unbounded.
    pub fn maximum(&self) -> Option<Pages> {
        self.limits.maximum().map(|maximum| Pages(maximum as usize))
    }

    /// Returns the current size of this memory.
    pub fn current_size(&self) -> Pages {
        Bytes(self.current_size.get()).round_up_to()
    }

    /// Increases the size of this memory by `additional` pages. Returns the
    /// previous size.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the grown size would exceed the maximum.
    pub fn grow(&self, additional: Pages) -> Result<Pages, LinkerError> {
        let size_before_grow: Pages = self.current_size();

        if additional == Pages(0) {
            return Ok(size_before_grow);
        }

        let new_size: Pages = size_before_grow + additional;
        let maximum = self.maximum().unwrap_or(LINEAR_MEMORY_MAX_PAGES);
        if new_size > maximum {
            return Err(LinkerError::new(format!(
                "Trying to grow the memory by {} pages when there are already {} pages and the maximum is {} pages.",
                additional.0, size_before_grow.0, maximum.0
            )));
        }

        let new_buffer_length: Bytes = new_size.into();
        self.current_size.set(new_buffer_length.0);
        Ok(size_before_grow)
    }

    /// Checks that the byte range `[base, base + len)` lies within the
    /// current size of this memory.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the range is out of bounds.
    pub fn validate_address(&self, base: u32, len: u32) -> Result<(), LinkerError> {
        let end = base as u64 + len as u64;
        if end > self.current_size.get() as u64 {
            return Err(LinkerError::new(format!(
                "Attempting to access the region [{}..{}] in a memory of {} bytes.",
                base,
                end,
                self.current_size.get()
            )));
        }
        Ok(())
    }

    /// Copies `bytes` into this memory at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the written region is out of bounds.
    pub fn set(&self, offset: u32, bytes: &[u8]) -> Result<(), LinkerError> {
        self.validate_address(offset, bytes.len() as u32)?;
        let mut buffer = self.buffer.borrow_mut();
        let end = offset as usize + bytes.len();
        if buffer.len() < end {
            buffer.resize(end, 0);
        }
        buffer[offset as usize..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Copies `len` bytes out of this memory starting at `offset`.
    ///
    /// Bytes that were never written read as zero.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the read region is out of bounds.
    pub fn get(&self, offset: u32, len: usize) -> Result<Vec<u8>, LinkerError> {
        self.validate_address(offset, len as u32)?;
        let mut buffer = self.buffer.borrow_mut();
        let end = offset as usize + len;
        if buffer.len() < end {
            buffer.resize(end, 0);
        }
        Ok(buffer[offset as usize..end].to_vec())
    }

    /// Sets every byte of this memory to zero.
    pub fn erase(&self) {
        let size = self.current_size.get();
        *self.buffer.borrow_mut() = vec![0; size];
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryInstance, LINEAR_MEMORY_MAX_PAGES};
    use memory_units::Pages;

    #[test]
    fn alloc_rejects_initial_above_maximum() {
        assert!(MemoryInstance::alloc(Pages(2), Some(Pages(1))).is_err());
        assert!(MemoryInstance::alloc(Pages(1), Some(Pages(1))).is_ok());
    }

    #[test]
    fn alloc_rejects_oversized_memories() {
        let too_big = Pages(LINEAR_MEMORY_MAX_PAGES.0 + 1);
        assert!(MemoryInstance::alloc(too_big, None).is_err());
        assert!(MemoryInstance::alloc(Pages(0), Some(too_big)).is_err());
    }

    #[test]
    fn grow_is_bounded_by_maximum() {
        let memory = MemoryInstance::alloc(Pages(1), Some(Pages(2))).unwrap();
        assert_eq!(memory.grow(Pages(1)).unwrap(), Pages(1));
        assert_eq!(memory.current_size(), Pages(2));
        assert!(memory.grow(Pages(1)).is_err());
    }

    #[test]
    fn set_and_get_round_trip() {
        let memory = MemoryInstance::alloc(Pages(1), None).unwrap();
        memory.set(5, &[0xaa, 0xbb]).unwrap();
        assert_eq!(memory.get(5, 2).unwrap(), vec![0xaa, 0xbb]);
        // Untouched bytes read as zero.
        assert_eq!(memory.get(0, 2).unwrap(), vec![0, 0]);
    }

    #[test]
    fn validate_address_checks_bounds() {
        let memory = MemoryInstance::alloc(Pages(1), None).unwrap();
        assert!(memory.validate_address(65535, 1).is_ok());
        let err = memory.validate_address(65535, 2).unwrap_err();
        assert_eq!(
            err.message(),
            "Attempting to access the region [65535..65537] in a memory of 65536 bytes."
        );
    }

    #[test]
    fn erase_zeroes_every_byte() {
        let memory = MemoryInstance::alloc(Pages(1), None).unwrap();
        memory.set(0, &[1, 2, 3]).unwrap();
        memory.erase();
        assert_eq!(memory.get(0, 3).unwrap(), vec![0, 0, 0]);
    }
}
