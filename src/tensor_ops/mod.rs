//! Loss reduction kernels. Each op is a directory with the device-generic
//! entry point and kernel trait in `mod.rs` and one kernel file per
//! device.

mod cross_entropy_cost;
mod softmax_log_loss;
pub(crate) mod utilities;

pub use cross_entropy_cost::{cross_entropy_cost, try_cross_entropy_cost, CrossEntropyCostKernel};
pub use softmax_log_loss::{
    try_softmax_log_loss, try_softmax_log_loss_grad, SoftmaxLogLossKernel,
};
pub use utilities::{AtomicAccum, WORK_GROUP_SIZE};
