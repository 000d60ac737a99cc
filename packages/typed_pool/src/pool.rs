use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::num::NonZero;
use std::ptr::{self, NonNull};

use new_zealand::nz;
use tracing::{debug, warn};

use crate::{Pooled, Recyclable, Result, Slab, TypedPoolBuilder};

/// The number of items per slab used by [`TypedPool::default()`] and by a builder that was not
/// given an explicit slab capacity.
#[cfg(not(miri))]
pub const DEFAULT_SLAB_CAPACITY: NonZero<usize> = nz!(128);

/// The number of items per slab used by [`TypedPool::default()`] and by a builder that was not
/// given an explicit slab capacity.
// Under Miri, we use a smaller slab capacity because Miri test runtime scales by memory usage.
#[cfg(miri)]
pub const DEFAULT_SLAB_CAPACITY: NonZero<usize> = nz!(4);

/// A single-type object pool that recycles released items through an embedded freelist and
/// carves new items out of zero-initialized slabs.
///
/// Acquiring an item is served, in order of preference, by:
///
/// 1. The most recently released item, if any (the freelist is LIFO). Such an item keeps
///    whatever its previous user left in it. Only its [`Link`][crate::Link] is reset.
/// 2. The next never-used item of the current slab. Such an item is zero-filled.
/// 3. A newly allocated slab of [`slab_capacity()`][1] zero-filled items, from which the item is
///    then carved.
///
/// Acquired items are handed out as [`Pooled`] handles. Releasing a handle (explicitly via
/// [`release()`][2] or by dropping it) returns the item to the freelist without running its
/// destructor or freeing any memory.
///
/// # Ownership
///
/// The pool owns all slab memory and all items on the freelist. A [`Pooled`] handle is an
/// exclusive loan of one item that borrows the pool, so the pool cannot be destroyed while any
/// item is on loan, and a handle cannot be used after it has been released.
///
/// When the pool is destroyed, the values of all items on the freelist are dropped and every slab
/// is freed. Items that were never handed out are not dropped (they were never initialized by a
/// caller).
///
/// # Thread safety
///
/// The pool is single-threaded. It may be moved to another thread if `T` is [`Send`] but cannot
/// be shared between threads. Wrap it in a lock or use one pool per thread if multiple threads
/// need to acquire items.
///
/// # Example
///
/// ```rust
/// use new_zealand::nz;
/// use typed_pool::{Link, TypedPool, recyclable};
///
/// struct Request {
///     next: Link<Request>,
///     id: u64,
/// }
///
/// recyclable!(unsafe Request, next);
///
/// let pool = TypedPool::<Request>::new(nz!(64));
///
/// let mut request = pool.acquire()?;
/// assert_eq!(request.id, 0); // Fresh items are zero-filled.
/// request.id = 42;
///
/// pool.release(request);
///
/// // The released item is recycled and keeps its previous contents.
/// let request = pool.acquire()?;
/// assert_eq!(request.id, 42);
/// # Ok::<(), typed_pool::Error>(())
/// ```
///
/// [1]: Self::slab_capacity
/// [2]: Self::release
pub struct TypedPool<T: Recyclable> {
    state: RefCell<PoolState<T>>,

    slab_capacity: NonZero<usize>,
}

struct PoolState<T: Recyclable> {
    /// Every slab this pool has ever allocated. The last one is the current slab that fresh items
    /// are carved from. Older slabs are retained so their memory can be freed when the pool is
    /// destroyed, as items carved from them may still be on loan or on the freelist.
    slabs: Vec<Slab<T>>,

    /// How many items at the end of the current slab have never been handed out.
    remaining: usize,

    /// Head of the intrusive freelist of released items, linked via `Recyclable::link()`.
    free_head: Option<NonNull<T>>,

    /// Number of items on the freelist.
    recycled: usize,

    /// Number of items currently on loan via `Pooled` handles.
    in_use: usize,
}

impl<T: Recyclable> TypedPool<T> {
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[must_use]
    pub(crate) fn new_inner(slab_capacity: NonZero<usize>) -> Self {
        assert!(size_of::<T>() > 0, "TypedPool must have non-zero item size");

        Self {
            state: RefCell::new(PoolState {
                slabs: Vec::new(),
                remaining: 0,
                free_head: None,
                recycled: 0,
                in_use: 0,
            }),
            slab_capacity,
        }
    }

    /// Creates an empty pool that allocates `slab_capacity` items at a time.
    ///
    /// No memory is allocated until the first item is acquired.
    ///
    /// # Example
    ///
    /// ```rust
    /// use new_zealand::nz;
    /// use typed_pool::{Link, TypedPool, recyclable};
    ///
    /// struct Node {
    ///     next: Link<Node>,
    ///     value: u32,
    /// }
    ///
    /// recyclable!(unsafe Node, next);
    ///
    /// let pool = TypedPool::<Node>::new(nz!(32));
    ///
    /// assert_eq!(pool.slab_capacity().get(), 32);
    /// assert_eq!(pool.capacity(), 0);
    /// assert!(pool.is_empty());
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[must_use]
    pub fn new(slab_capacity: NonZero<usize>) -> Self {
        Self::builder().slab_capacity(slab_capacity).build()
    }

    /// Starts building a new [`TypedPool`].
    ///
    /// Use this when you want to customize the pool configuration beyond the defaults.
    ///
    /// # Example
    ///
    /// ```rust
    /// use new_zealand::nz;
    /// use typed_pool::{Link, TypedPool, recyclable};
    ///
    /// struct Node {
    ///     next: Link<Node>,
    /// }
    ///
    /// recyclable!(unsafe Node, next);
    ///
    /// let pool = TypedPool::<Node>::builder().slab_capacity(nz!(8)).build();
    /// assert_eq!(pool.slab_capacity().get(), 8);
    /// ```
    pub fn builder() -> TypedPoolBuilder<T> {
        TypedPoolBuilder::new()
    }

    /// Acquires an item from the pool, allocating a new slab if necessary.
    ///
    /// A recycled item (one that was previously released) is preferred over a fresh one. Fresh
    /// items are zero-filled; recycled items keep their previous contents except for their link,
    /// which is reset to "none" in both cases.
    ///
    /// # Errors
    ///
    /// Returns an error if a new slab is needed but cannot be allocated. The pool is left
    /// unchanged in that case.
    ///
    /// # Example
    ///
    /// ```rust
    /// use new_zealand::nz;
    /// use typed_pool::{Link, TypedPool, recyclable};
    ///
    /// struct Node {
    ///     next: Link<Node>,
    ///     value: u32,
    /// }
    ///
    /// recyclable!(unsafe Node, next);
    ///
    /// let pool = TypedPool::<Node>::new(nz!(2));
    ///
    /// let first = pool.acquire()?;
    /// let second = pool.acquire()?;
    /// assert_eq!(pool.slab_count(), 1);
    ///
    /// // The first slab is exhausted, so this allocates a second one.
    /// let third = pool.acquire()?;
    /// assert_eq!(pool.slab_count(), 2);
    /// assert_eq!(third.value, 0);
    /// # drop((first, second));
    /// # Ok::<(), typed_pool::Error>(())
    /// ```
    pub fn acquire(&self) -> Result<Pooled<'_, T>> {
        let item_ptr = self.state.borrow_mut().acquire(self.slab_capacity)?;

        Ok(Pooled::new(self, item_ptr))
    }

    /// Returns an item to the pool, making it available to the next [`acquire()`][1].
    ///
    /// The item's value is not dropped and no memory is freed. This is equivalent to dropping
    /// the handle, except that it verifies the handle came from this pool.
    ///
    /// # Panics
    ///
    /// Panics if the item was acquired from a different pool.
    ///
    /// # Example
    ///
    /// ```rust
    /// use new_zealand::nz;
    /// use typed_pool::{Link, TypedPool, recyclable};
    ///
    /// struct Node {
    ///     next: Link<Node>,
    /// }
    ///
    /// recyclable!(unsafe Node, next);
    ///
    /// let pool = TypedPool::<Node>::new(nz!(4));
    ///
    /// let a = pool.acquire()?;
    /// let b = pool.acquire()?;
    /// let (a_ptr, b_ptr) = (a.ptr(), b.ptr());
    ///
    /// pool.release(a);
    /// pool.release(b);
    ///
    /// // Items are recycled in LIFO order.
    /// assert_eq!(pool.acquire()?.ptr(), b_ptr);
    /// # Ok::<(), typed_pool::Error>(())
    /// ```
    ///
    /// [1]: Self::acquire
    pub fn release(&self, item: Pooled<'_, T>) {
        assert!(
            ptr::eq(self, item.pool()),
            "released an item of {} to a pool it was not acquired from",
            type_name::<T>()
        );

        drop(item);
    }

    /// Destroys the pool, dropping all recycled items and freeing all slab memory.
    ///
    /// This is equivalent to dropping the pool. The borrow checker guarantees that no item is on
    /// loan when this is called.
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
    /// pool.release(pool.acquire()?);
    ///
    /// pool.destroy();
    /// # Ok::<(), typed_pool::Error>(())
    /// ```
    pub fn destroy(self) {
        drop(self);
    }

    /// The number of items each slab holds.
    #[must_use]
    pub fn slab_capacity(&self) -> NonZero<usize> {
        self.slab_capacity
    }

    /// The number of slabs the pool has allocated so far.
    ///
    /// All slabs are retained until the pool is destroyed.
    #[must_use]
    pub fn slab_count(&self) -> usize {
        self.state.borrow().slabs.len()
    }

    /// The total number of items the allocated slabs can hold.
    ///
    /// This includes items on loan, items on the freelist and items not yet carved.
    ///
    /// # Example
    ///
    /// ```rust
    /// use new_zealand::nz;
    /// use typed_pool::{Link, TypedPool, recyclable};
    ///
    /// struct Node {
    ///     next: Link<Node>,
    /// }
    ///
    /// recyclable!(unsafe Node, next);
    ///
    /// let pool = TypedPool::<Node>::new(nz!(10));
    /// assert_eq!(pool.capacity(), 0);
    ///
    /// let node = pool.acquire()?;
    /// assert_eq!(pool.capacity(), 10);
    /// # drop(node);
    /// # Ok::<(), typed_pool::Error>(())
    /// ```
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slab_count()
            .checked_mul(self.slab_capacity.get())
            .expect("overflow here would mean the pool holds more items than virtual memory can fit")
    }

    /// The number of never-used items left in the current slab.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.state.borrow().remaining
    }

    /// The number of released items waiting on the freelist to be recycled.
    #[must_use]
    pub fn recycled(&self) -> usize {
        self.state.borrow().recycled
    }

    /// The number of items currently on loan.
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
    /// assert_eq!(pool.len(), 1);
    ///
    /// pool.release(node);
    /// assert_eq!(pool.len(), 0);
    /// assert_eq!(pool.recycled(), 1);
    /// # Ok::<(), typed_pool::Error>(())
    /// ```
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().in_use
    }

    /// Whether no items are currently on loan.
    ///
    /// An empty pool may still be holding slab memory and recycled items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pushes an item onto the freelist. Called when a `Pooled` handle is dropped.
    pub(crate) fn push_free(&self, item_ptr: NonNull<T>) {
        self.state.borrow_mut().push_free(item_ptr);
    }

    #[cfg(test)]
    pub(crate) fn integrity_check(&self) {
        self.state.borrow().integrity_check();
    }
}

impl<T: Recyclable> PoolState<T> {
    fn acquire(&mut self, slab_capacity: NonZero<usize>) -> Result<NonNull<T>> {
        let mut item_ptr = if let Some(head_ptr) = self.free_head {
            self.pop_free(head_ptr)
        } else {
            if self.remaining == 0 {
                self.grow(slab_capacity)?;
            }

            self.carve()
        };

        // SAFETY: The item is owned by the pool (either on the freelist or never handed out) and
        // no references to it exist. Its bytes are a valid `T` because it was either released by
        // a previous user or zero-filled, which `Recyclable` guarantees is valid.
        unsafe { item_ptr.as_mut() }.link().clear();

        self.in_use = self
            .in_use
            .checked_add(1)
            .expect("cannot have more items on loan than fit in virtual memory");

        Ok(item_ptr)
    }

    fn pop_free(&mut self, mut head_ptr: NonNull<T>) -> NonNull<T> {
        // SAFETY: Items on the freelist are owned by the pool and hold valid values.
        self.free_head = unsafe { head_ptr.as_mut() }.link().next();

        self.recycled = self
            .recycled
            .checked_sub(1)
            .expect("freelist was not empty so the recycled count must be non-zero");

        head_ptr
    }

    fn carve(&mut self) -> NonNull<T> {
        let slab = self
            .slabs
            .last()
            .expect("we just ensured there is a current slab with items remaining");

        let index = slab
            .capacity()
            .get()
            .checked_sub(self.remaining)
            .expect("remaining count can never exceed the slab capacity");

        self.remaining = self
            .remaining
            .checked_sub(1)
            .expect("we just ensured there are items remaining in the current slab");

        slab.item_ptr(index)
    }

    fn grow(&mut self, slab_capacity: NonZero<usize>) -> Result<()> {
        let slab = Slab::new(slab_capacity).inspect_err(|error| {
            warn!(
                item_type = type_name::<T>(),
                slab_capacity = slab_capacity.get(),
                %error,
                "failed to allocate slab"
            );
        })?;

        self.slabs.push(slab);
        self.remaining = slab_capacity.get();

        debug!(
            item_type = type_name::<T>(),
            slab_index = self.slabs.len().saturating_sub(1),
            slab_capacity = slab_capacity.get(),
            "allocated slab"
        );

        Ok(())
    }

    fn push_free(&mut self, mut item_ptr: NonNull<T>) {
        debug_assert!(
            self.owns(item_ptr),
            "released item does not belong to any slab of this pool"
        );

        // SAFETY: The item was on loan and its handle has been consumed, so we have exclusive
        // access to it again.
        unsafe { item_ptr.as_mut() }.link().set(self.free_head);
        self.free_head = Some(item_ptr);

        self.recycled = self
            .recycled
            .checked_add(1)
            .expect("cannot have more recycled items than fit in virtual memory");

        self.in_use = self
            .in_use
            .checked_sub(1)
            .expect("an item was on loan so the in-use count must be non-zero");
    }

    fn owns(&self, item_ptr: NonNull<T>) -> bool {
        self.slabs.iter().any(|slab| slab.contains(item_ptr))
    }

    /// Drops the values of all items on the freelist, returning how many there were.
    fn drop_recycled(&mut self) -> usize {
        let mut dropped: usize = 0;

        while let Some(mut item_ptr) = self.free_head {
            // SAFETY: Items on the freelist are owned by the pool and hold valid values.
            self.free_head = unsafe { item_ptr.as_mut() }.link().next();

            // SAFETY: The item holds a valid value that nobody else references and it is no
            // longer reachable from the freelist, so it will not be touched again.
            unsafe {
                item_ptr.drop_in_place();
            }

            dropped = dropped
                .checked_add(1)
                .expect("cannot have more recycled items than fit in virtual memory");
        }

        self.recycled = 0;
        dropped
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(any(test, debug_assertions))]
    fn integrity_check(&self) {
        use std::collections::HashSet;

        let mut seen = HashSet::new();
        let mut cursor = self.free_head;

        while let Some(mut item_ptr) = cursor {
            assert!(
                self.owns(item_ptr),
                "freelist item {item_ptr:?} is outside every slab in pool of {}",
                type_name::<T>()
            );

            assert!(
                seen.insert(item_ptr.as_ptr().addr()),
                "freelist item {item_ptr:?} appears twice in pool of {}",
                type_name::<T>()
            );

            // SAFETY: Items on the freelist are owned by the pool, hold valid values and are not
            // referenced by anyone else, so the pool may access them exclusively.
            cursor = unsafe { item_ptr.as_mut() }.link().next();
        }

        assert!(
            seen.len() == self.recycled,
            "recycled count {} does not match the {} items observed on the freelist in pool of {}",
            self.recycled,
            seen.len(),
            type_name::<T>()
        );

        if let Some(slab) = self.slabs.last() {
            assert!(
                self.remaining <= slab.capacity().get(),
                "remaining count {} exceeds slab capacity {} in pool of {}",
                self.remaining,
                slab.capacity(),
                type_name::<T>()
            );
        } else {
            assert!(
                self.remaining == 0 && self.in_use == 0 && self.recycled == 0,
                "pool of {} without slabs has non-zero counters",
                type_name::<T>()
            );
        }
    }
}

impl<T: Recyclable> Default for TypedPool<T> {
    /// Creates an empty pool with [`DEFAULT_SLAB_CAPACITY`].
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    fn default() -> Self {
        Self::builder().build()
    }
}

impl<T: Recyclable> Drop for TypedPool<T> {
    fn drop(&mut self) {
        let state = self.state.get_mut();

        #[cfg(debug_assertions)]
        state.integrity_check();

        let dropped = state.drop_recycled();

        debug!(
            item_type = type_name::<T>(),
            slabs = state.slabs.len(),
            dropped_recycled = dropped,
            leaked_in_use = state.in_use,
            "destroying pool"
        );

        // The slabs free their memory when the Vec is dropped right after this.
    }
}

impl<T: Recyclable> fmt::Debug for TypedPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();

        f.debug_struct(type_name::<Self>())
            .field("slab_capacity", &self.slab_capacity)
            .field("slab_count", &state.slabs.len())
            .field("remaining", &state.remaining)
            .field("recycled", &state.recycled)
            .field("in_use", &state.in_use)
            .finish_non_exhaustive()
    }
}

// SAFETY: The pool exclusively owns its slabs and the items on its freelist, which are only ever
// accessed through the pool itself. Moving the pool to another thread moves those `T` values with
// it, which is fine as long as `T` itself can be sent. The pool is not `Sync` (via `RefCell`).
unsafe impl<T: Recyclable + Send> Send for TypedPool<T> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::{Error, Link};

    #[derive(Debug)]
    struct Item {
        next: Link<Item>,
        a: u64,
        b: [u8; 16],
    }

    crate::recyclable!(unsafe Item, next);

    struct DropCounter {
        next: Link<DropCounter>,
        counter: Option<Rc<Cell<usize>>>,
    }

    crate::recyclable!(unsafe DropCounter, next);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            if let Some(counter) = &self.counter {
                counter.set(counter.get().checked_add(1).unwrap());
            }
        }
    }

    assert_impl_all!(TypedPool<Item>: Send, fmt::Debug, Default);
    assert_not_impl_any!(TypedPool<Item>: Sync);
    assert_not_impl_any!(TypedPool<DropCounter>: Send, Sync);

    fn is_zeroed(item: &Item) -> bool {
        item.a == 0 && item.b == [0; 16]
    }

    #[test]
    fn smoke_test() {
        let pool = TypedPool::<Item>::new(nz!(4));

        assert_eq!(pool.len(), 0);
        assert!(pool.is_empty());
        assert_eq!(pool.slab_count(), 0);

        let mut a = pool.acquire().unwrap();
        a.a = 1;
        let mut b = pool.acquire().unwrap();
        b.a = 2;

        assert_eq!(pool.len(), 2);
        assert!(!pool.is_empty());
        assert_eq!(pool.slab_count(), 1);
        assert_eq!(pool.remaining(), 2);

        pool.release(a);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.recycled(), 1);

        assert_eq!(b.a, 2);
        pool.release(b);

        pool.integrity_check();
    }

    #[test]
    fn empty_pool_allocates_nothing() {
        let pool = TypedPool::<Item>::new(nz!(4));

        assert_eq!(pool.slab_count(), 0);
        assert_eq!(pool.capacity(), 0);
        assert_eq!(pool.remaining(), 0);
        assert_eq!(pool.recycled(), 0);
    }

    #[test]
    fn destroy_without_acquire() {
        let pool = TypedPool::<Item>::new(nz!(4));

        pool.destroy();
    }

    #[test]
    fn fresh_items_are_zeroed() {
        let pool = TypedPool::<Item>::new(nz!(3));

        let items = (0..7).map(|_| pool.acquire().unwrap()).collect::<Vec<_>>();

        for item in &items {
            assert!(is_zeroed(item));
            assert!(item.next.is_none());
        }
    }

    #[test]
    fn recycled_item_has_cleared_link_and_keeps_contents() {
        let pool = TypedPool::<Item>::new(nz!(4));

        let mut first = pool.acquire().unwrap();
        first.a = 0xDEAD_BEEF;
        first.b = [7; 16];
        let first_ptr = first.ptr();

        let second = pool.acquire().unwrap();

        pool.release(first);
        // The freelist now links `second` to `first`.
        pool.release(second);

        let second_again = pool.acquire().unwrap();
        assert!(second_again.next.is_none());

        let first_again = pool.acquire().unwrap();
        assert_eq!(first_again.ptr(), first_ptr);
        assert!(first_again.next.is_none());
        assert_eq!(first_again.a, 0xDEAD_BEEF);
        assert_eq!(first_again.b, [7; 16]);
    }

    #[test]
    fn lifo_order() {
        let pool = TypedPool::<Item>::new(nz!(8));

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let (a_ptr, b_ptr) = (a.ptr(), b.ptr());

        pool.release(a);
        pool.release(b);

        let first = pool.acquire().unwrap();
        let second = pool.acquire().unwrap();

        assert_eq!(first.ptr(), b_ptr);
        assert_eq!(second.ptr(), a_ptr);
    }

    #[test]
    fn slab_growth_cadence() {
        const CAPACITY: usize = 3;

        let pool = TypedPool::<Item>::new(nz!(CAPACITY));
        let mut items = Vec::new();

        for n in 1..=(CAPACITY * 4) {
            let slabs_before = pool.slab_count();
            items.push(pool.acquire().unwrap());
            let slabs_after = pool.slab_count();

            // The (k * CAPACITY + 1)-th acquire triggers a new slab, nothing else does.
            let expect_growth = (n - 1) % CAPACITY == 0;
            assert_eq!(slabs_after - slabs_before, usize::from(expect_growth), "acquire #{n}");
        }

        assert_eq!(pool.slab_count(), 4);
        assert_eq!(pool.capacity(), CAPACITY * 4);
        assert_eq!(pool.remaining(), 0);
    }

    #[test]
    fn freelist_is_preferred_over_new_slab() {
        let pool = TypedPool::<Item>::new(nz!(2));

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_eq!(pool.remaining(), 0);

        let a_ptr = a.ptr();
        pool.release(a);

        let recycled = pool.acquire().unwrap();
        assert_eq!(recycled.ptr(), a_ptr);
        assert_eq!(pool.slab_count(), 1);

        drop(b);
    }

    #[test]
    fn freelist_is_preferred_over_carving() {
        let pool = TypedPool::<Item>::new(nz!(8));

        let a = pool.acquire().unwrap();
        let a_ptr = a.ptr();
        pool.release(a);

        let remaining_before = pool.remaining();
        let recycled = pool.acquire().unwrap();

        assert_eq!(recycled.ptr(), a_ptr);
        assert_eq!(pool.remaining(), remaining_before);
    }

    #[test]
    fn concrete_scenario() {
        let pool = TypedPool::<Item>::new(nz!(4));

        let e0 = pool.acquire().unwrap();
        let e1 = pool.acquire().unwrap();
        let e2 = pool.acquire().unwrap();
        let e3 = pool.acquire().unwrap();
        assert_eq!(pool.slab_count(), 1);

        let e4 = pool.acquire().unwrap();
        assert_eq!(pool.slab_count(), 2);

        for item in [&e0, &e1, &e2, &e3, &e4] {
            assert!(is_zeroed(item));
        }

        let (e0_ptr, e2_ptr) = (e0.ptr(), e2.ptr());

        pool.release(e2);
        pool.release(e0);

        let next = pool.acquire().unwrap();
        let after = pool.acquire().unwrap();

        assert_eq!(next.ptr(), e0_ptr);
        assert_eq!(after.ptr(), e2_ptr);
        assert_eq!(pool.slab_count(), 2);

        drop((e1, e3, e4));
    }

    #[test]
    fn dropping_handle_releases_item() {
        let pool = TypedPool::<Item>::new(nz!(4));

        let item = pool.acquire().unwrap();
        let item_ptr = item.ptr();
        drop(item);

        assert_eq!(pool.len(), 0);
        assert_eq!(pool.recycled(), 1);
        assert_eq!(pool.acquire().unwrap().ptr(), item_ptr);
    }

    #[test]
    #[should_panic]
    fn release_to_foreign_pool_panics() {
        let pool_a = TypedPool::<Item>::new(nz!(4));
        let pool_b = TypedPool::<Item>::new(nz!(4));

        let item = pool_a.acquire().unwrap();
        pool_b.release(item);
    }

    #[test]
    fn too_large_slab_is_error() {
        let pool = TypedPool::<Item>::new(nz!(usize::MAX));

        let result = pool.acquire();
        assert!(matches!(result, Err(Error::SlabTooLarge { .. })));
        drop(result);

        assert_eq!(pool.slab_count(), 0);
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.remaining(), 0);
    }

    #[test]
    #[cfg_attr(miri, ignore)] // Miri aborts on allocation requests this large.
    fn failed_slab_allocation_is_out_of_memory() {
        let slab_capacity = usize::try_from(isize::MAX).unwrap() / size_of::<Item>();
        let pool = TypedPool::<Item>::new(NonZero::new(slab_capacity).unwrap());

        let result = pool.acquire();
        assert!(matches!(result, Err(Error::OutOfMemory { .. })));
        drop(result);

        assert_eq!(pool.slab_count(), 0);
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.remaining(), 0);

        // The pool remains usable after a failed growth.
        pool.integrity_check();
    }

    #[test]
    fn destroy_drops_recycled_items_once() {
        let drops = Rc::new(Cell::new(0));
        let pool = TypedPool::<DropCounter>::new(nz!(2));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let mut item = pool.acquire().unwrap();
            item.counter = Some(Rc::clone(&drops));
            handles.push(item);
        }

        for item in handles {
            pool.release(item);
        }

        // Releasing does not drop values.
        assert_eq!(drops.get(), 0);

        pool.destroy();
        assert_eq!(drops.get(), 5);
    }

    #[test]
    fn destroy_skips_never_acquired_items() {
        let drops = Rc::new(Cell::new(0));
        let pool = TypedPool::<DropCounter>::new(nz!(8));

        let mut item = pool.acquire().unwrap();
        item.counter = Some(Rc::clone(&drops));
        pool.release(item);

        drop(pool);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn forgotten_handle_is_leaked_not_dropped() {
        let drops = Rc::new(Cell::new(0));
        let pool = TypedPool::<DropCounter>::new(nz!(2));

        let mut item = pool.acquire().unwrap();
        item.counter = Some(Rc::clone(&drops));
        std::mem::forget(item);

        assert_eq!(pool.len(), 1);
        drop(pool);

        assert_eq!(drops.get(), 0);
    }

    #[test]
    fn integrity_holds_through_churn() {
        let pool = TypedPool::<Item>::new(nz!(3));
        let mut held = Vec::new();

        for round in 0..10_u64 {
            for _ in 0..4 {
                let mut item = pool.acquire().unwrap();
                item.a = round;
                held.push(item);
            }

            // Release every other item to interleave freelist and slab usage.
            let mut index = 0;
            held.retain(|_| {
                index += 1;
                index % 2 == 0
            });

            pool.integrity_check();
        }

        assert_eq!(pool.len(), held.len());
        assert_eq!(pool.len() + pool.recycled() + pool.remaining(), pool.capacity());
    }

    #[test]
    fn debug_output_mentions_counters() {
        let pool = TypedPool::<Item>::new(nz!(4));
        let item = pool.acquire().unwrap();

        let output = format!("{pool:?}");
        assert!(output.contains("slab_count: 1"));
        assert!(output.contains("in_use: 1"));

        drop(item);
    }

    #[test]
    fn default_uses_default_slab_capacity() {
        let pool = TypedPool::<Item>::default();

        assert_eq!(pool.slab_capacity(), DEFAULT_SLAB_CAPACITY);
    }

    #[test]
    fn moves_to_another_thread() {
        let pool = TypedPool::<Item>::new(nz!(4));
        drop(pool.acquire().unwrap());

        let recycled = std::thread::spawn(move || pool.recycled()).join().unwrap();
        assert_eq!(recycled, 1);
    }
}
