use num_traits::Float;
use rayon::prelude::*;

use crate::dtypes::Dtype;
use crate::tensor::{Cpu, Error, Residency, Tensor};
use crate::tensor_ops::utilities::WORK_GROUP_SIZE;

use super::SoftmaxLogLossKernel;

impl<E: Dtype + Float> SoftmaxLogLossKernel<E> for Cpu {
    fn softmax_log_loss(
        &self,
        prob: &Tensor<E, Self>,
        label: &Tensor<u32, Self>,
        cost: &mut Tensor<E, Self>,
        vector_size: usize,
        _batch_size: usize,
    ) -> Result<(), Error> {
        let probs = prob.data.read();
        let labels = label.data.read();
        let mut out = cost.data.write();
        if probs.residency == Residency::Unallocated
            || labels.residency == Residency::Unallocated
            || out.residency == Residency::Unallocated
        {
            return Err(Error::Unallocated);
        }

        let prob_items = probs.host.as_slice();
        let label_items = labels.host.as_slice();

        // One work-item per batch element; no slot is shared, so no
        // atomics are needed in this reduction.
        out.host
            .par_chunks_mut(WORK_GROUP_SIZE)
            .enumerate()
            .for_each(|(group, costs)| {
                let base = group * WORK_GROUP_SIZE;
                for (i, c) in costs.iter_mut().enumerate() {
                    let batch_id = base + i;
                    let class = label_items[batch_id] as usize;
                    debug_assert!(class < vector_size);
                    *c = -(prob_items[batch_id * vector_size + class].ln());
                }
            });
        Ok(())
    }

    fn softmax_log_loss_grad(
        &self,
        prob: &Tensor<E, Self>,
        label: &Tensor<u32, Self>,
        input_grad: &mut Tensor<E, Self>,
        vector_size: usize,
        _batch_size: usize,
    ) -> Result<(), Error> {
        let probs = prob.data.read();
        let labels = label.data.read();
        let mut out = input_grad.data.write();
        if probs.residency == Residency::Unallocated
            || labels.residency == Residency::Unallocated
            || out.residency == Residency::Unallocated
        {
            return Err(Error::Unallocated);
        }

        let prob_items = probs.host.as_slice();
        let label_items = labels.host.as_slice();

        out.host
            .par_chunks_mut(WORK_GROUP_SIZE)
            .enumerate()
            .for_each(|(group, grads)| {
                let base = group * WORK_GROUP_SIZE;
                for (i, g) in grads.iter_mut().enumerate() {
                    let p = base + i;
                    let batch_id = p / vector_size;
                    let within_id = p % vector_size;
                    let indicator = if within_id == label_items[batch_id] as usize {
                        E::one()
                    } else {
                        E::zero()
                    };
                    *g = prob_items[p] - indicator;
                }
            });
        Ok(())
    }
}
