#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A single-type object pool that recycles released items through an intrusive freelist and
//! carves new items out of zero-initialized slabs.
//!
//! This package provides [`TypedPool`], which avoids a heap allocation per object for hot
//! object types by reusing memory. Each item type embeds a [`Link`] field that the pool uses to
//! chain released items together, so keeping track of free items costs no extra memory.
//!
//! This is part of the [Folo project](https://github.com/folo-rs/folo) that provides mechanisms
//! for high-performance hardware-aware programming in Rust.
//!
//! # Item lifecycle
//!
//! Every item in a pool is in exactly one of three states:
//!
//! * **Carved-unused** - part of an allocated slab but never handed out. Such items are
//!   zero-filled because slabs are allocated zero-initialized.
//! * **In use** - on loan to a caller via a [`Pooled`] handle.
//! * **Free** - released back to the pool and waiting on the freelist to be recycled. Such items
//!   keep whatever their previous user left in them.
//!
//! [`TypedPool::acquire()`] prefers free items (most recently released first), then carves the
//! next item from the current slab, and only allocates a new slab once both are exhausted.
//!
//! # Item requirements
//!
//! The item type must implement the unsafe [`Recyclable`] trait, which promises that the all-zero
//! bit pattern is a valid value of the type and identifies its [`Link`] field. The
//! [`recyclable!`] macro implements it for you given the name of the link field.
//!
//! # Example
//!
//! ```rust
//! use new_zealand::nz;
//! use typed_pool::{Link, TypedPool, recyclable};
//!
//! struct Particle {
//!     next: Link<Particle>,
//!     position: [f32; 3],
//!     alive: bool,
//! }
//!
//! recyclable!(unsafe Particle, next);
//!
//! let pool = TypedPool::<Particle>::new(nz!(256));
//!
//! let mut particle = pool.acquire()?;
//! assert!(!particle.alive); // Fresh items are zero-filled.
//!
//! particle.position = [1.0, 2.0, 3.0];
//! particle.alive = true;
//!
//! // Releasing the particle returns it to the pool for reuse. Dropping the handle does the same.
//! pool.release(particle);
//!
//! // The next acquire recycles the same memory, contents included.
//! let particle = pool.acquire()?;
//! assert!(particle.alive);
//! # Ok::<(), typed_pool::Error>(())
//! ```
//!
//! # Thread safety
//!
//! The pool is single-threaded. It can be moved between threads if the item type is [`Send`]
//! but cannot be shared without external synchronization.

mod builder;
mod error;
mod link;
mod pool;
mod pooled;
mod slab;

pub use builder::*;
pub use error::Error;
pub(crate) use error::Result;
pub use link::*;
pub use pool::*;
pub use pooled::*;
pub(crate) use slab::*;
