mod cpu_kernel;
#[cfg(feature = "cuda")]
mod cuda_kernel;

use num_traits::Float;

use crate::dtypes::Dtype;
use crate::tensor::{Error, Storage, Tensor};

pub trait CrossEntropyCostKernel<E: Dtype + Float>: Storage<E> {
    fn cross_entropy_cost(
        &self,
        input: &Tensor<E, Self>,
        label: &Tensor<E, Self>,
        cost: &mut Tensor<E, Self>,
        vector_size: usize,
        batch_size: usize,
    ) -> Result<(), Error>;
}

/// Binary cross-entropy cost, reduced per batch element.
///
/// `input` and `label` are equal-shaped `(vector_size, …batch)` tensors
/// (first extent fastest-varying, remaining extents the batch); `cost`
/// holds one scalar per batch element. Every flat position contributes
/// `-label*ln(input) - (1-label)*ln(1-input)` to its batch element's
/// slot, accumulated with a race-free atomic add across the work groups
/// that share it. Summation order is only deterministic up to parallel
/// scheduling, so results may differ across runs in the last bits.
///
/// Preconditions (documented, not enforced): `input` lies strictly
/// inside `(0, 1)`; values outside produce infinities/NaNs; on
/// accelerator targets all three tensors must already be device
/// resident.
pub fn try_cross_entropy_cost<E: Dtype + Float, D: CrossEntropyCostKernel<E>>(
    input: &Tensor<E, D>,
    label: &Tensor<E, D>,
    cost: &mut Tensor<E, D>,
) -> Result<(), Error> {
    if input.shape() != label.shape() {
        return Err(Error::ShapeMismatch {
            expected: input.shape().size(),
            found: label.shape().size(),
        });
    }
    if input.shape().dimension() == 0 || input.shape().size() == 0 {
        return Err(Error::WrongNumElements);
    }
    let vector_size = input.shape()[0];
    let batch_size = input.shape().size() / vector_size;
    if cost.shape().size() != batch_size {
        return Err(Error::ShapeMismatch {
            expected: batch_size,
            found: cost.shape().size(),
        });
    }
    if cost.buffer().aliases(input.buffer()) || cost.buffer().aliases(label.buffer()) {
        return Err(Error::BufferAliased);
    }
    let device = input.device().clone();
    device.cross_entropy_cost(input, label, cost, vector_size, batch_size)
}

/// Panicking version of [try_cross_entropy_cost].
pub fn cross_entropy_cost<E: Dtype + Float, D: CrossEntropyCostKernel<E>>(
    input: &Tensor<E, D>,
    label: &Tensor<E, D>,
    cost: &mut Tensor<E, D>,
) {
    try_cross_entropy_cost(input, label, cost).unwrap()
}
