use std::fmt;
use std::ptr::NonNull;

/// The freelist link that every item stored in a [`TypedPool`][crate::TypedPool] embeds.
///
/// The pool threads released items into a singly linked chain through this field. While an item
/// is on loan to a caller, the content of its link is meaningless and the caller should not rely
/// on it. When the pool hands out an item, the link is always reset to the "none" state.
///
/// The all-zero bit pattern of a `Link` is the "none" state, which is what makes zero-initialized
/// slab memory immediately usable as fresh items.
///
/// # Example
///
/// ```rust
/// use typed_pool::{Link, TypedPool, recyclable};
///
/// #[derive(Debug, Default)]
/// struct Packet {
///     next: Link<Packet>,
///     len: usize,
/// }
///
/// recyclable!(unsafe Packet, next);
///
/// let pool = TypedPool::<Packet>::default();
/// let packet = pool.acquire().unwrap();
/// assert!(packet.next.is_none());
/// ```
#[repr(transparent)]
pub struct Link<T> {
    next: Option<NonNull<T>>,
}

impl<T> Link<T> {
    /// Creates a link in the "none" state.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: None }
    }

    /// Whether the link points to nothing.
    ///
    /// This is always `true` for an item that was just acquired from a pool.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.next.is_none()
    }

    pub(crate) const fn next(&self) -> Option<NonNull<T>> {
        self.next
    }

    pub(crate) fn set(&mut self, next: Option<NonNull<T>>) {
        self.next = next;
    }

    pub(crate) fn clear(&mut self) {
        self.next = None;
    }
}

impl<T> Default for Link<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Link<T> {
    /// Cloning an item does not clone its position in a freelist, so the clone is always "none".
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("next", &self.next)
            .finish()
    }
}

// SAFETY: A link is an opaque address. It is only ever dereferenced by the pool that owns the
// item containing it, under the pool's own thread-safety rules.
unsafe impl<T> Send for Link<T> {}

// SAFETY: See above, shared access to a link only permits inspecting whether it is "none".
unsafe impl<T> Sync for Link<T> {}

/// An item type that can be stored in a [`TypedPool`][crate::TypedPool].
///
/// The pool carves fresh items out of zero-initialized memory and keeps released items in a
/// freelist threaded through a [`Link`] field embedded in the item itself.
///
/// Most implementations are generated via the [`recyclable!`][crate::recyclable] macro, which
/// only needs the name of the link field.
///
/// # Safety
///
/// Implementors must guarantee that:
///
/// * The all-zero bit pattern is a valid value of `Self`. Fresh items are handed out as
///   zero-filled memory without ever running a constructor.
/// * [`link()`][Self::link] always returns a reference to the same field, stored inline in
///   `self`, and has no side effects.
///
/// # Example
///
/// ```rust
/// use typed_pool::{Link, Recyclable, TypedPool};
///
/// struct Node<V> {
///     link: Link<Node<V>>,
///     value: Option<Box<V>>,
/// }
///
/// // SAFETY: A zeroed `Link` is "none" and a zeroed `Option<Box<_>>` is `None`.
/// unsafe impl<V> Recyclable for Node<V> {
///     fn link(&mut self) -> &mut Link<Self> {
///         &mut self.link
///     }
/// }
///
/// let pool = TypedPool::<Node<u32>>::default();
/// let node = pool.acquire().unwrap();
/// assert!(node.value.is_none());
/// ```
pub unsafe trait Recyclable: Sized {
    /// Returns the link field the pool uses to chain this item into its freelist.
    fn link(&mut self) -> &mut Link<Self>;
}

/// Implements [`Recyclable`] for a type by naming its [`Link`] field.
///
/// The `unsafe` keyword in the invocation is mandatory. By writing it, you assert that the
/// all-zero bit pattern is a valid value of the type (e.g. it contains only integers, `bool`,
/// `Option<Box<_>>`, [`Link`] and similar fields).
///
/// For generic item types, implement [`Recyclable`] by hand.
///
/// # Example
///
/// ```rust
/// use typed_pool::{Link, recyclable};
///
/// struct Connection {
///     next_free: Link<Connection>,
///     id: u64,
///     open: bool,
/// }
///
/// recyclable!(unsafe Connection, next_free);
/// ```
#[macro_export]
macro_rules! recyclable {
    (unsafe $item:ty, $field:ident) => {
        // SAFETY: The invoker asserted that the all-zero bit pattern is a valid value of the
        // type, and the named field is stored inline in the item.
        unsafe impl $crate::Recyclable for $item {
            fn link(&mut self) -> &mut $crate::Link<Self> {
                &mut self.$field
            }
        }
    };
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::mem::MaybeUninit;

    use static_assertions::{assert_eq_size, assert_impl_all};

    use super::*;

    struct Item {
        next: Link<Item>,
        value: u32,
    }

    crate::recyclable!(unsafe Item, next);

    assert_impl_all!(Link<Item>: Send, Sync, Default, Clone, fmt::Debug);
    assert_eq_size!(Link<Item>, *const Item);

    #[test]
    fn new_is_none() {
        assert!(Link::<Item>::new().is_none());
        assert!(Link::<Item>::default().is_none());
    }

    #[test]
    fn zeroed_is_none() {
        // SAFETY: Option<NonNull<T>> guarantees that the all-zero pattern is `None`.
        let link: Link<Item> = unsafe { MaybeUninit::zeroed().assume_init() };
        assert!(link.is_none());
    }

    #[test]
    fn set_and_clear() {
        let mut target = Item {
            next: Link::new(),
            value: 5,
        };
        let target_ptr = NonNull::from(&mut target);

        let mut link = Link::<Item>::new();
        link.set(Some(target_ptr));
        assert!(!link.is_none());
        assert_eq!(link.next(), Some(target_ptr));

        link.clear();
        assert!(link.is_none());
        assert_eq!(target.value, 5);
    }

    #[test]
    fn clone_is_unlinked() {
        let mut target = Item {
            next: Link::new(),
            value: 0,
        };

        let mut link = Link::<Item>::new();
        link.set(Some(NonNull::from(&mut target)));

        let cloned = link.clone();
        assert!(cloned.is_none());
        assert!(!link.is_none());
    }

    #[test]
    fn macro_accessor_targets_named_field() {
        let mut item = Item {
            next: Link::new(),
            value: 7,
        };

        let field_addr = (&raw const item.next).addr();
        let accessor_addr = (&raw const *item.link()).addr();
        assert_eq!(field_addr, accessor_addr);
        assert_eq!(item.value, 7);
    }
}
