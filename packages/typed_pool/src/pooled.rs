use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::{Recyclable, TypedPool};

/// Exclusive handle to an item acquired from a [`TypedPool`].
///
/// The handle represents a loan of one item from the pool. It borrows the pool, so the pool
/// cannot be destroyed while the handle exists. It cannot be copied or cloned, so the item can
/// only be returned once, either explicitly via [`TypedPool::release()`] or implicitly by
/// dropping the handle.
///
/// Returning the item to the pool does not drop its value. The next user to acquire the same
/// item will observe whatever was left in it (except for the item's [`Link`][crate::Link]).
///
/// The handle makes no pinning promises. A recycled item keeps its value across users, so the
/// next user may move that value out through [`DerefMut`] even if a previous user relied on its
/// address. Box or otherwise heap-allocate anything that must stay pinned.
///
/// # Example
///
/// ```rust
/// use typed_pool::{Link, TypedPool, recyclable};
///
/// struct Buffer {
///     next: Link<Buffer>,
///     len: usize,
///     data: [u8; 256],
/// }
///
/// recyclable!(unsafe Buffer, next);
///
/// let pool = TypedPool::<Buffer>::default();
///
/// let mut buffer = pool.acquire()?;
/// buffer.data[..5].copy_from_slice(b"hello");
/// buffer.len = 5;
///
/// assert_eq!(&buffer.data[..buffer.len], b"hello");
///
/// // Returning the item consumes the handle.
/// pool.release(buffer);
/// # Ok::<(), typed_pool::Error>(())
/// ```
pub struct Pooled<'p, T: Recyclable> {
    pool: &'p TypedPool<T>,

    ptr: NonNull<T>,
}

impl<'p, T: Recyclable> Pooled<'p, T> {
    #[must_use]
    pub(crate) fn new(pool: &'p TypedPool<T>, ptr: NonNull<T>) -> Self {
        Self { pool, ptr }
    }

    pub(crate) fn pool(&self) -> &'p TypedPool<T> {
        self.pool
    }

    /// Returns a pointer to the item.
    ///
    /// The pointer remains valid for as long as the pool exists, even after the handle has been
    /// released, though at that point the item belongs to the pool again and may be handed out
    /// to another user. Comparing pointers is a convenient way to tell whether two handles refer
    /// to the same recycled item.
    ///
    /// # Example
    ///
    /// ```rust
    /// use typed_pool::{Link, TypedPool, recyclable};
    ///
    /// struct Node {
    ///     next: Link<Node>,
    /// }
    ///
    /// recyclable!(unsafe Node, next);
    ///
    /// let pool = TypedPool::<Node>::default();
    ///
    /// let node = pool.acquire()?;
    /// let node_ptr = node.ptr();
    /// pool.release(node);
    ///
    /// assert_eq!(pool.acquire()?.ptr(), node_ptr);
    /// # Ok::<(), typed_pool::Error>(())
    /// ```
    #[must_use]
    #[inline]
    pub fn ptr(&self) -> NonNull<T> {
        self.ptr
    }
}

impl<T: Recyclable> Deref for Pooled<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        // SAFETY: The handle has exclusive ownership of a valid item for as long as it exists.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: Recyclable> DerefMut for Pooled<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: The handle has exclusive ownership of a valid item for as long as it exists.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: Recyclable> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        self.pool.push_free(self.ptr);
    }
}

impl<T: Recyclable + fmt::Debug> fmt::Debug for Pooled<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("ptr", &self.ptr)
            .field("item", &**self)
            .finish()
    }
}
