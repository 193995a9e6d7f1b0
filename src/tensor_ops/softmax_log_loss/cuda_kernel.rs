use cudarc::driver::LaunchAsync;
use cudarc::types::CudaTypeName;
use num_traits::Float;

use crate::dtypes::Dtype;
use crate::tensor::{launch_cfg, Cuda, Error, Residency, Tensor};
use crate::tensor_ops::utilities::WORK_GROUP_SIZE;

use super::SoftmaxLogLossKernel;

const KERNEL: &str = r#"
extern "C" __global__ void fwd(
    const $T *prob,
    const unsigned int *label,
    $T *cost,
    const size_t vector_size,
    const size_t batch_size
) {
    unsigned int b = blockIdx.x * blockDim.x + threadIdx.x;
    if (b < batch_size) {
        cost[b] = -log(prob[(size_t)b * vector_size + label[b]]);
    }
}

extern "C" __global__ void bwd(
    const $T *prob,
    const unsigned int *label,
    $T *input_grad,
    const size_t vector_size,
    const size_t numel
) {
    unsigned int i = blockIdx.x * blockDim.x + threadIdx.x;
    if (i < numel) {
        size_t batch_id = i / vector_size;
        size_t within_id = i % vector_size;
        input_grad[i] = prob[i] - (within_id == label[batch_id] ? ($T)1.0 : ($T)0.0);
    }
}
"#;

impl Cuda {
    fn load_softmax_log_loss<E: CudaTypeName>(&self) -> Result<String, Error> {
        let module = std::format!("softmax_log_loss_{}", E::NAME);
        if !self.dev.has_func(&module, "fwd") {
            tracing::debug!(module = %module, "compiling log loss kernels");
            let ptx = cudarc::nvrtc::compile_ptx(KERNEL.replace("$T", E::NAME))?;
            self.dev.load_ptx(ptx, &module, &["fwd", "bwd"])?;
        }
        Ok(module)
    }
}

impl<E: Dtype + Float + CudaTypeName> SoftmaxLogLossKernel<E> for Cuda {
    fn softmax_log_loss(
        &self,
        prob: &Tensor<E, Self>,
        label: &Tensor<u32, Self>,
        cost: &mut Tensor<E, Self>,
        vector_size: usize,
        batch_size: usize,
    ) -> Result<(), Error> {
        let module = self.load_softmax_log_loss::<E>()?;

        let probs = prob.data.read();
        let labels = label.data.read();
        let mut out = cost.data.write();
        let prob_slice = probs.accel.as_ref().ok_or(Error::Unallocated)?;
        let label_slice = labels.accel.as_ref().ok_or(Error::Unallocated)?;
        let out_slice = out.accel.as_mut().ok_or(Error::Unallocated)?;

        let fwd = self.dev.get_func(&module, "fwd").unwrap();
        let cfg = launch_cfg::<{ WORK_GROUP_SIZE as u32 }>(batch_size as u32);
        unsafe {
            fwd.launch(
                cfg,
                (prob_slice, label_slice, &mut *out_slice, vector_size, batch_size),
            )
        }?;

        out.residency = Residency::BothDiverged;
        Ok(())
    }

    fn softmax_log_loss_grad(
        &self,
        prob: &Tensor<E, Self>,
        label: &Tensor<u32, Self>,
        input_grad: &mut Tensor<E, Self>,
        vector_size: usize,
        batch_size: usize,
    ) -> Result<(), Error> {
        let module = self.load_softmax_log_loss::<E>()?;

        let numel = vector_size * batch_size;
        let probs = prob.data.read();
        let labels = label.data.read();
        let mut out = input_grad.data.write();
        let prob_slice = probs.accel.as_ref().ok_or(Error::Unallocated)?;
        let label_slice = labels.accel.as_ref().ok_or(Error::Unallocated)?;
        let out_slice = out.accel.as_mut().ok_or(Error::Unallocated)?;

        let bwd = self.dev.get_func(&module, "bwd").unwrap();
        let cfg = launch_cfg::<{ WORK_GROUP_SIZE as u32 }>(numel as u32);
        unsafe {
            bwd.launch(
                cfg,
                (prob_slice, label_slice, &mut *out_slice, vector_size, numel),
            )
        }?;

        out.residency = Residency::BothDiverged;
        Ok(())
    }
}
