use rand::distributions::Distribution;

use crate::dtypes::Unit;

use super::Error;

/// The device axis of a tensor: where (besides host memory) its elements
/// live, and how bytes move between the two memory spaces.
///
/// Every tensor always owns a host mirror (`Vec<E>` inside its shared
/// buffer). A device with [Storage::HAS_ACCELERATOR] additionally owns an
/// accelerator mirror of type [Storage::Vec], and its tensors carry a
/// layout descriptor that must describe the current shape whenever a
/// kernel runs. The two mirrors are never kept consistent automatically;
/// callers sequence explicit copies.
pub trait Storage<E: Unit>: 'static + Clone + std::fmt::Debug + Default {
    /// Accelerator-side allocation handle. `()` when the device target
    /// has no accelerator memory space.
    type Vec: 'static + std::fmt::Debug + Send + Sync;

    /// Whether tensors on this device carry an accelerator mirror and a
    /// layout descriptor.
    const HAS_ACCELERATOR: bool;

    /// Allocates the accelerator mirror for `len` elements, zero-filled.
    /// All-or-nothing: on error nothing is left allocated.
    fn try_alloc_len(&self, len: usize) -> Result<Self::Vec, Error>;

    /// Synchronous bulk copy from host to accelerator. No-op without an
    /// accelerator mirror.
    fn try_copy_to_accel(&self, src: &[E], dst: &mut Self::Vec) -> Result<(), Error>;

    /// Synchronous bulk copy from accelerator to host. No-op without an
    /// accelerator mirror.
    fn try_copy_from_accel(&self, src: &Self::Vec, dst: &mut [E]) -> Result<(), Error>;

    /// Fills host-side storage from the device's seeded random source.
    fn try_fill_with_distr<D: Distribution<E>>(
        &self,
        dst: &mut [E],
        distr: D,
    ) -> Result<(), Error>;
}

/// Access to a device's random source without committing to an element
/// type.
pub trait RandomU64 {
    /// Generates a random u64 number.
    fn random_u64(&self) -> u64;
}
