//! Basic usage of the `typed_pool` crate:
//!
//! * Declaring a recyclable item type.
//! * Acquiring items.
//! * Releasing items and observing how they get recycled.
//! * Inspecting the pool as it grows.

use new_zealand::nz;
use typed_pool::{Link, TypedPool, recyclable};

struct Order {
    next: Link<Order>,
    id: u64,
    quantity: u32,
}

recyclable!(unsafe Order, next);

fn main() -> Result<(), typed_pool::Error> {
    let pool = TypedPool::<Order>::new(nz!(4));

    // A fresh pool has not allocated anything yet.
    println!("Slabs before first acquire: {}", pool.slab_count());

    let mut first = pool.acquire()?;
    first.id = 1;
    first.quantity = 10;

    let mut second = pool.acquire()?;
    second.id = 2;
    second.quantity = 20;

    println!(
        "Pool has {} items on loan, capacity {} across {} slab(s)",
        pool.len(),
        pool.capacity(),
        pool.slab_count()
    );

    // Releasing an item does not drop its value. The next acquire gets it back as-is.
    pool.release(first);

    let recycled = pool.acquire()?;
    println!(
        "Recycled order #{} with quantity {}",
        recycled.id, recycled.quantity
    );

    // Dropping a handle is the same as releasing it.
    drop(second);
    drop(recycled);

    println!(
        "After releasing everything: {} on loan, {} waiting to be recycled",
        pool.len(),
        pool.recycled()
    );

    // Grow past the first slab.
    let orders = (0..6).map(|_| pool.acquire()).collect::<Result<Vec<_>, _>>()?;

    println!(
        "Holding {} orders needs {} slab(s) with {} never-used item(s) left over",
        orders.len(),
        pool.slab_count(),
        pool.remaining()
    );

    drop(orders);
    pool.destroy();

    Ok(())
}
