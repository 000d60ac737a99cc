use std::marker::PhantomData;
use std::num::NonZero;

use crate::{DEFAULT_SLAB_CAPACITY, Recyclable, TypedPool};

/// Builder for creating an instance of [`TypedPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`TypedPool::default()`][1] is sufficient for most use
/// cases.
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use typed_pool::{Link, TypedPool, recyclable};
///
/// struct Message {
///     next: Link<Message>,
///     bytes: [u8; 64],
/// }
///
/// recyclable!(unsafe Message, next);
///
/// let pool = TypedPool::<Message>::builder()
///     .slab_capacity(nz!(1024))
///     .build();
///
/// assert_eq!(pool.slab_capacity().get(), 1024);
/// ```
///
/// [1]: TypedPool::default
#[must_use]
pub struct TypedPoolBuilder<T> {
    slab_capacity: NonZero<usize>,

    _item: PhantomData<T>,
}

impl<T> std::fmt::Debug for TypedPoolBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedPoolBuilder")
            .field(
                "item_type",
                &std::format_args!("{}", std::any::type_name::<T>()),
            )
            .field("slab_capacity", &self.slab_capacity)
            .finish()
    }
}

impl<T: Recyclable> TypedPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            slab_capacity: DEFAULT_SLAB_CAPACITY,
            _item: PhantomData,
        }
    }

    /// Sets the number of items the pool carves out of each slab it allocates.
    ///
    /// Larger slabs mean fewer allocations as the pool grows but more memory reserved up front.
    /// The pool only allocates a slab once both its freelist and its current slab are exhausted.
    ///
    /// # Examples
    ///
    /// ```
    /// use new_zealand::nz;
    /// use typed_pool::{Link, TypedPool, recyclable};
    ///
    /// struct Job {
    ///     next: Link<Job>,
    ///     id: u64,
    /// }
    ///
    /// recyclable!(unsafe Job, next);
    ///
    /// let pool = TypedPool::<Job>::builder().slab_capacity(nz!(16)).build();
    ///
    /// let job = pool.acquire().unwrap();
    /// assert_eq!(pool.capacity(), 16);
    /// # drop(job);
    /// ```
    pub fn slab_capacity(mut self, slab_capacity: NonZero<usize>) -> Self {
        self.slab_capacity = slab_capacity;
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// The pool starts empty; no memory is allocated until the first item is acquired.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    ///
    /// # Examples
    ///
    /// ```
    /// use typed_pool::{Link, TypedPool, recyclable};
    ///
    /// struct Job {
    ///     next: Link<Job>,
    /// }
    ///
    /// recyclable!(unsafe Job, next);
    ///
    /// let pool = TypedPool::<Job>::builder().build();
    /// assert_eq!(pool.slab_count(), 0);
    /// ```
    #[must_use]
    pub fn build(self) -> TypedPool<T> {
        TypedPool::new_inner(self.slab_capacity)
    }
}
