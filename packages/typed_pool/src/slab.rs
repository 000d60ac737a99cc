use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::any::type_name;
use std::fmt;
use std::num::NonZero;
use std::ptr::NonNull;

use crate::{Error, Result};

/// One zero-initialized, contiguous, heap-allocated array of `capacity` items of type `T`.
///
/// The slab itself has no notion of which items are in use. It only owns the backing memory and
/// releases it when dropped. It never runs destructors of the items it contains. That is the
/// responsibility of the owning pool, which knows which items hold live values.
///
/// The memory is never moved, so pointers to items remain valid for as long as the slab lives.
pub(crate) struct Slab<T> {
    first_item_ptr: NonNull<T>,
    capacity: NonZero<usize>,
}

impl<T> Slab<T> {
    /// Allocates a new zero-filled slab.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    pub(crate) fn new(capacity: NonZero<usize>) -> Result<Self> {
        assert!(size_of::<T>() > 0, "Slab must have non-zero item size");

        let layout = Self::layout(capacity)?;

        // SAFETY: The layout is not zero-sized because both the capacity and the item size are
        // non-zero, as guarded above.
        let ptr = unsafe { alloc_zeroed(layout) };

        let Some(first_item_ptr) = NonNull::new(ptr.cast::<T>()) else {
            return Err(Error::OutOfMemory {
                bytes: layout.size(),
            });
        };

        Ok(Self {
            first_item_ptr,
            capacity,
        })
    }

    fn layout(capacity: NonZero<usize>) -> Result<Layout> {
        Layout::array::<T>(capacity.get()).map_err(|source| Error::SlabTooLarge {
            slab_capacity: capacity.get(),
            item_size: size_of::<T>(),
            source,
        })
    }

    #[must_use]
    pub(crate) fn capacity(&self) -> NonZero<usize> {
        self.capacity
    }

    /// Returns a pointer to the item at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[must_use]
    pub(crate) fn item_ptr(&self, index: usize) -> NonNull<T> {
        assert!(
            index < self.capacity.get(),
            "item {index} index out of bounds in slab of {}",
            type_name::<T>()
        );

        // SAFETY: Guarded by the bounds check above, so the pointer stays inside the allocation.
        unsafe { self.first_item_ptr.add(index) }
    }

    /// Whether `ptr` points at the start of one of the items in this slab.
    #[must_use]
    #[expect(
        clippy::integer_division,
        clippy::modulo_arithmetic,
        reason = "item size is a non-zero constant and we want exact item boundaries"
    )]
    pub(crate) fn contains(&self, ptr: NonNull<T>) -> bool {
        let start = self.first_item_ptr.as_ptr().addr();
        let addr = ptr.as_ptr().addr();

        let Some(offset) = addr.checked_sub(start) else {
            return false;
        };

        offset % size_of::<T>() == 0 && offset / size_of::<T>() < self.capacity.get()
    }
}

impl<T> Drop for Slab<T> {
    fn drop(&mut self) {
        let layout = Self::layout(self.capacity)
            .expect("layout was successfully calculated when the slab was allocated");

        // SAFETY: The pointer was returned by `alloc_zeroed()` with this very layout.
        unsafe {
            dealloc(self.first_item_ptr.as_ptr().cast(), layout);
        }
    }
}

impl<T> fmt::Debug for Slab<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slab")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("first_item_ptr", &self.first_item_ptr)
            .field("capacity", &self.capacity)
            .finish()
    }
}
