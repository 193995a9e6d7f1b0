use num_traits::Float;
use rayon::prelude::*;

use crate::dtypes::Dtype;
use crate::tensor::{Cpu, Error, Residency, Tensor};
use crate::tensor_ops::utilities::{AtomicAccum, WORK_GROUP_SIZE};

use super::CrossEntropyCostKernel;

impl<E: Dtype + Float + AtomicAccum> CrossEntropyCostKernel<E> for Cpu {
    fn cross_entropy_cost(
        &self,
        input: &Tensor<E, Self>,
        label: &Tensor<E, Self>,
        cost: &mut Tensor<E, Self>,
        vector_size: usize,
        batch_size: usize,
    ) -> Result<(), Error> {
        let inp = input.data.read();
        let lab = label.data.read();
        let mut out = cost.data.write();
        if inp.residency == Residency::Unallocated
            || lab.residency == Residency::Unallocated
            || out.residency == Residency::Unallocated
        {
            return Err(Error::Unallocated);
        }

        let input_items = inp.host.as_slice();
        let label_items = lab.host.as_slice();

        // One atomic slot per batch element, zeroed up front. Work groups
        // straddling a batch boundary accumulate into the same slot, which
        // is why the adds must be atomic.
        let slots: Vec<E::Atomic> = (0..batch_size).map(|_| E::atomic_zero()).collect();
        input_items
            .par_chunks(WORK_GROUP_SIZE)
            .zip(label_items.par_chunks(WORK_GROUP_SIZE))
            .enumerate()
            .for_each(|(group, (xs, ys))| {
                let base = group * WORK_GROUP_SIZE;
                for (i, (&x, &y)) in xs.iter().zip(ys).enumerate() {
                    let batch_id = (base + i) / vector_size;
                    let term = -(y * x.ln()) - (E::one() - y) * (E::one() - x).ln();
                    E::atomic_add(&slots[batch_id], term);
                }
            });

        for (slot, c) in slots.iter().zip(out.host.iter_mut()) {
            *c = E::atomic_load(slot);
        }
        Ok(())
    }
}
