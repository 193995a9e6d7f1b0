use cudarc::driver::LaunchAsync;
use cudarc::types::CudaTypeName;
use num_traits::Float;

use crate::dtypes::Dtype;
use crate::tensor::{launch_cfg, Cuda, Error, Residency, Tensor};
use crate::tensor_ops::utilities::WORK_GROUP_SIZE;

use super::CrossEntropyCostKernel;

const KERNEL: &str = r#"
extern "C" __global__ void fwd(
    const $T *input,
    const $T *label,
    $T *cost,
    const size_t vector_size,
    const size_t numel
) {
    unsigned int i = blockIdx.x * blockDim.x + threadIdx.x;
    if (i < numel) {
        size_t batch_id = i / vector_size;
        $T x = input[i];
        $T y = label[i];
        atomicAdd(cost + batch_id, -y * log(x) - (($T)1.0 - y) * log(($T)1.0 - x));
    }
}
"#;

impl<E: Dtype + Float + CudaTypeName> CrossEntropyCostKernel<E> for Cuda {
    fn cross_entropy_cost(
        &self,
        input: &Tensor<E, Self>,
        label: &Tensor<E, Self>,
        cost: &mut Tensor<E, Self>,
        vector_size: usize,
        batch_size: usize,
    ) -> Result<(), Error> {
        let module = std::format!("cross_entropy_cost_{}", E::NAME);
        if !self.dev.has_func(&module, "fwd") {
            tracing::debug!(module = %module, "compiling cost kernel");
            let ptx = cudarc::nvrtc::compile_ptx(KERNEL.replace("$T", E::NAME))?;
            self.dev.load_ptx(ptx, &module, &["fwd"])?;
        }

        let numel = vector_size * batch_size;
        let inp = input.data.read();
        let lab = label.data.read();
        let mut out = cost.data.write();
        let inp_slice = inp.accel.as_ref().ok_or(Error::Unallocated)?;
        let lab_slice = lab.accel.as_ref().ok_or(Error::Unallocated)?;
        let out_slice = out.accel.as_mut().ok_or(Error::Unallocated)?;

        self.dev.memset_zeros(out_slice)?;

        let fwd = self.dev.get_func(&module, "fwd").unwrap();
        let cfg = launch_cfg::<{ WORK_GROUP_SIZE as u32 }>(numel as u32);
        unsafe { fwd.launch(cfg, (inp_slice, lab_slice, &mut *out_slice, vector_size, numel)) }?;

        out.residency = Residency::BothDiverged;
        Ok(())
    }
}
