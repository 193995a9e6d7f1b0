use rand::{distributions::Distribution, rngs::StdRng, Rng, SeedableRng};
use std::sync::{Arc, Mutex};

use crate::dtypes::Unit;
use crate::tensor::storage_traits::{RandomU64, Storage};
use crate::tensor::Error;

/// The host device. Tensors on this target keep a single (host) mirror;
/// the dual-residency copy operations are no-ops.
#[derive(Clone, Debug)]
pub struct Cpu {
    pub(crate) rng: Arc<Mutex<StdRng>>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::seed_from_u64(0)
    }
}

impl Cpu {
    /// Constructs rng with the given seed.
    pub fn seed_from_u64(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }
}

impl RandomU64 for Cpu {
    fn random_u64(&self) -> u64 {
        self.rng.lock().unwrap().gen()
    }
}

impl<E: Unit> Storage<E> for Cpu {
    type Vec = ();

    const HAS_ACCELERATOR: bool = false;

    fn try_alloc_len(&self, _len: usize) -> Result<Self::Vec, Error> {
        Ok(())
    }

    fn try_copy_to_accel(&self, _src: &[E], _dst: &mut Self::Vec) -> Result<(), Error> {
        Ok(())
    }

    fn try_copy_from_accel(&self, _src: &Self::Vec, _dst: &mut [E]) -> Result<(), Error> {
        Ok(())
    }

    fn try_fill_with_distr<D: Distribution<E>>(
        &self,
        dst: &mut [E],
        distr: D,
    ) -> Result<(), Error> {
        let mut rng = self.rng.lock().unwrap();
        for e in dst.iter_mut() {
            *e = rng.sample(&distr);
        }
        Ok(())
    }
}
