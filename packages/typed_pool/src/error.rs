use std::alloc::LayoutError;

use thiserror::Error;

/// Errors that can occur when a [`TypedPool`][crate::TypedPool] needs to allocate a new slab.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A slab of the configured capacity cannot be described as a memory layout because its
    /// total size would exceed `isize::MAX` bytes.
    #[error("a slab of {slab_capacity} items of {item_size} bytes each is too large to allocate")]
    SlabTooLarge {
        /// The configured number of items per slab.
        slab_capacity: usize,

        /// The size of a single item in bytes.
        item_size: usize,

        /// The underlying layout calculation failure.
        #[source]
        source: LayoutError,
    },

    /// The global allocator could not provide memory for a new slab.
    #[error("out of memory: failed to allocate a slab of {bytes} bytes")]
    OutOfMemory {
        /// The size of the slab allocation that failed.
        bytes: usize,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
