mod atomics;

pub use atomics::AtomicAccum;

/// Work-items per work group. Reduction kernels partition their input
/// into groups of this size, with a final partial group covering the
/// remainder.
pub const WORK_GROUP_SIZE: usize = 1024;
