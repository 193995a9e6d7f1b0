mod device;

pub(crate) use device::launch_cfg;
pub use device::Cuda;
