//! Example that demonstrates the exact usage shown in the README.md file.

use new_zealand::nz;
use typed_pool::{Link, TypedPool, recyclable};

struct Particle {
    next: Link<Particle>,
    position: [f32; 3],
    alive: bool,
}

recyclable!(unsafe Particle, next);

fn main() -> Result<(), typed_pool::Error> {
    let pool = TypedPool::<Particle>::new(nz!(256));

    let mut particle = pool.acquire()?;
    assert!(!particle.alive); // Fresh items are zero-filled.

    particle.position = [1.0, 2.0, 3.0];
    particle.alive = true;

    // Releasing the particle returns it to the pool for reuse. Dropping the handle does the same.
    pool.release(particle);

    // The next acquire recycles the same memory, contents included.
    let particle = pool.acquire()?;
    println!(
        "Recycled particle at {:?}, alive: {}",
        particle.position, particle.alive
    );

    Ok(())
}
