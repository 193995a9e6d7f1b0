use rand::distributions::Distribution;
use std::sync::Arc;

use cudarc::driver::{CudaDevice, CudaSlice, LaunchConfig};

use crate::dtypes::Unit;
use crate::tensor::cpu::Cpu;
use crate::tensor::storage_traits::{RandomU64, Storage};
use crate::tensor::Error;

/// A Cuda device that enables constructing tensors with an accelerator
/// mirror & running GPU kernels.
///
/// Tensors on this target are dual-resident: every buffer owns a host
/// `Vec` and a device allocation, synchronized only by the explicit copy
/// operations. Host-side work (randomize, element access) is delegated to
/// the wrapped [Cpu].
#[derive(Clone, Debug)]
pub struct Cuda {
    pub(crate) cpu: Cpu,
    pub(crate) dev: Arc<CudaDevice>,
}

impl Default for Cuda {
    fn default() -> Self {
        Self::seed_from_u64(0)
    }
}

impl Cuda {
    /// Constructs rng with the given seed.
    pub fn seed_from_u64(seed: u64) -> Self {
        Self::try_seed_from_u64(seed).unwrap()
    }

    /// Constructs rng with the given seed.
    pub fn try_seed_from_u64(seed: u64) -> Result<Self, Error> {
        Self::try_build(0, seed)
    }

    /// Constructs with the given seed & device ordinal.
    pub fn try_build(ordinal: usize, seed: u64) -> Result<Self, Error> {
        let cpu = Cpu::seed_from_u64(seed);
        let dev = CudaDevice::new(ordinal)?;
        Ok(Self { cpu, dev })
    }

    /// Blocks until all queued work on the device completes.
    pub fn try_synchronize(&self) -> Result<(), Error> {
        self.dev.synchronize().map_err(Error::from)
    }
}

/// One work-group per `NUM_THREADS` work-items, with a final partial
/// group covering the remainder.
pub(crate) fn launch_cfg<const NUM_THREADS: u32>(n: u32) -> LaunchConfig {
    let num_blocks = (n + NUM_THREADS - 1) / NUM_THREADS;
    LaunchConfig {
        grid_dim: (num_blocks, 1, 1),
        block_dim: (NUM_THREADS, 1, 1),
        shared_mem_bytes: 0,
    }
}

impl RandomU64 for Cuda {
    fn random_u64(&self) -> u64 {
        self.cpu.random_u64()
    }
}

impl<E: Unit> Storage<E> for Cuda {
    type Vec = CudaSlice<E>;

    const HAS_ACCELERATOR: bool = true;

    fn try_alloc_len(&self, len: usize) -> Result<Self::Vec, Error> {
        self.dev.alloc_zeros::<E>(len).map_err(Error::from)
    }

    fn try_copy_to_accel(&self, src: &[E], dst: &mut Self::Vec) -> Result<(), Error> {
        self.dev.htod_sync_copy_into(src, dst).map_err(Error::from)
    }

    fn try_copy_from_accel(&self, src: &Self::Vec, dst: &mut [E]) -> Result<(), Error> {
        self.dev.dtoh_sync_copy_into(src, dst).map_err(Error::from)
    }

    fn try_fill_with_distr<D: Distribution<E>>(
        &self,
        dst: &mut [E],
        distr: D,
    ) -> Result<(), Error> {
        self.cpu.try_fill_with_distr(dst, distr)
    }
}
