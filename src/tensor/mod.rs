//! Tensors, their shared dual-resident storage, and the devices that
//! back them.
//!
//! A [Tensor] couples a [crate::shapes::Shape], a name, and a
//! [SharedBuffer]. Storage is reference-counted: cloning a tensor aliases
//! its buffer rather than copying bytes. On accelerator targets
//! (`Cuda`), every buffer is mirrored in host and device memory and the
//! mirrors are synchronized **only** by the explicit copy operations;
//! staleness between them is the caller's responsibility, made visible
//! through [Residency].

pub(crate) mod buffer;
mod cpu;
#[cfg(feature = "cuda")]
mod cuda;
mod error;
pub(crate) mod storage_traits;
#[allow(clippy::module_inception)]
mod tensor;

pub use buffer::{Residency, SharedBuffer};
pub use cpu::Cpu;
#[cfg(feature = "cuda")]
pub use cuda::Cuda;
#[cfg(feature = "cuda")]
pub(crate) use cuda::launch_cfg;
pub use error::Error;
pub use storage_traits::{RandomU64, Storage};
pub use tensor::Tensor;
