mod cpu_kernel;
#[cfg(feature = "cuda")]
mod cuda_kernel;

use num_traits::Float;

use crate::dtypes::Dtype;
use crate::tensor::{Error, Storage, Tensor};

pub trait SoftmaxLogLossKernel<E: Dtype + Float>: Storage<E> + Storage<u32> {
    fn softmax_log_loss(
        &self,
        prob: &Tensor<E, Self>,
        label: &Tensor<u32, Self>,
        cost: &mut Tensor<E, Self>,
        vector_size: usize,
        batch_size: usize,
    ) -> Result<(), Error>;

    fn softmax_log_loss_grad(
        &self,
        prob: &Tensor<E, Self>,
        label: &Tensor<u32, Self>,
        input_grad: &mut Tensor<E, Self>,
        vector_size: usize,
        batch_size: usize,
    ) -> Result<(), Error>;
}

fn validate<E: Dtype + Float, D: SoftmaxLogLossKernel<E>>(
    prob: &Tensor<E, D>,
    label: &Tensor<u32, D>,
) -> Result<(usize, usize), Error> {
    if prob.shape().dimension() == 0 || prob.shape().size() == 0 {
        return Err(Error::WrongNumElements);
    }
    let vector_size = prob.shape()[0];
    let batch_size = prob.shape().size() / vector_size;
    if label.shape().size() != batch_size {
        return Err(Error::ShapeMismatch {
            expected: batch_size,
            found: label.shape().size(),
        });
    }
    Ok((vector_size, batch_size))
}

/// Multi-class log loss over softmax probabilities, one scalar per batch
/// element: `cost[b] = -ln(prob[b*V + label[b]])`, where `label` holds
/// one class index per batch element.
///
/// Preconditions (documented, not enforced): `prob` rows are softmax
/// outputs (strictly positive), every label index is `< vector_size`,
/// and on accelerator targets all tensors are already device resident.
pub fn try_softmax_log_loss<E: Dtype + Float, D: SoftmaxLogLossKernel<E>>(
    prob: &Tensor<E, D>,
    label: &Tensor<u32, D>,
    cost: &mut Tensor<E, D>,
) -> Result<(), Error> {
    let (vector_size, batch_size) = validate(prob, label)?;
    if cost.shape().size() != batch_size {
        return Err(Error::ShapeMismatch {
            expected: batch_size,
            found: cost.shape().size(),
        });
    }
    if cost.buffer().aliases(prob.buffer()) {
        return Err(Error::BufferAliased);
    }
    let device = prob.device().clone();
    device.softmax_log_loss(prob, label, cost, vector_size, batch_size)
}

/// Derivative of [try_softmax_log_loss] with respect to the softmax
/// inputs: `input_grad[p] = prob[p] - 1` at each batch element's labeled
/// class, `prob[p]` everywhere else.
pub fn try_softmax_log_loss_grad<E: Dtype + Float, D: SoftmaxLogLossKernel<E>>(
    prob: &Tensor<E, D>,
    label: &Tensor<u32, D>,
    input_grad: &mut Tensor<E, D>,
) -> Result<(), Error> {
    let (vector_size, batch_size) = validate(prob, label)?;
    if input_grad.shape().size() != prob.shape().size() {
        return Err(Error::ShapeMismatch {
            expected: prob.shape().size(),
            found: input_grad.shape().size(),
        });
    }
    if input_grad.buffer().aliases(prob.buffer()) {
        return Err(Error::BufferAliased);
    }
    let device = prob.device().clone();
    device.softmax_log_loss_grad(prob, label, input_grad, vector_size, batch_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    #[test]
    fn test_log_loss_picks_labeled_class() {
        let dev: TestDevice = Default::default();
        let mut prob = Tensor::<TestDtype, _>::new(&dev, [3, 2]);
        let mut label = Tensor::<u32, _>::new(&dev, [2]);
        let mut cost = Tensor::<TestDtype, _>::new(&dev, [2]);
        prob.try_init_with(&[0.7, 0.2, 0.1, 0.25, 0.25, 0.5]).unwrap();
        label.try_init_with(&[0, 2]).unwrap();
        cost.try_init().unwrap();

        try_softmax_log_loss(&prob, &label, &mut cost).unwrap();
        cost.try_copy_from_device_to_host().unwrap();

        assert_close_to_literal!(cost, [-(0.7f64.ln()), -(0.5f64.ln())]);
    }

    #[test]
    fn test_log_loss_grad_subtracts_one_hot() {
        let dev: TestDevice = Default::default();
        let mut prob = Tensor::<TestDtype, _>::new(&dev, [3, 2]);
        let mut label = Tensor::<u32, _>::new(&dev, [2]);
        let mut grad = Tensor::<TestDtype, _>::new(&dev, [3, 2]);
        prob.try_init_with(&[0.7, 0.2, 0.1, 0.25, 0.25, 0.5]).unwrap();
        label.try_init_with(&[0, 2]).unwrap();
        grad.try_init().unwrap();

        try_softmax_log_loss_grad(&prob, &label, &mut grad).unwrap();
        grad.try_copy_from_device_to_host().unwrap();

        assert_close_to_literal!(grad, [-0.3, 0.2, 0.1, 0.25, 0.25, -0.5]);
    }

    #[test]
    fn test_log_loss_spans_multiple_work_groups() {
        let dev: TestDevice = Default::default();
        let (v, b) = (4usize, 2000usize);
        let mut prob = Tensor::<f64, _>::new(&dev, [v, b]);
        let mut label = Tensor::<u32, _>::new(&dev, [b]);
        let mut cost = Tensor::<f64, _>::new(&dev, [b]);
        prob.try_init_with(&vec![0.25; v * b]).unwrap();
        let labels: Vec<u32> = (0..b as u32).map(|i| i % v as u32).collect();
        label.try_init_with(&labels).unwrap();
        cost.try_init().unwrap();

        try_softmax_log_loss(&prob, &label, &mut cost).unwrap();
        cost.try_copy_from_device_to_host().unwrap();

        let expected = -(0.25f64.ln());
        for c in cost.try_as_vec().unwrap() {
            assert!((c - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_log_loss_rejects_wrong_label_count() {
        let dev: TestDevice = Default::default();
        let mut prob = Tensor::<TestDtype, _>::new(&dev, [3, 2]);
        let mut label = Tensor::<u32, _>::new(&dev, [3]);
        let mut cost = Tensor::<TestDtype, _>::new(&dev, [2]);
        prob.try_init().unwrap();
        label.try_init().unwrap();
        cost.try_init().unwrap();
        assert!(matches!(
            try_softmax_log_loss(&prob, &label, &mut cost),
            Err(Error::ShapeMismatch {
                expected: 2,
                found: 3
            })
        ));
    }
}
