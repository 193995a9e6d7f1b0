/// Represents a number of different errors that can occur from creating
/// tensors or launching tensor operations. This encompasses both Cpu and
/// CUDA errors.
#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Device is out of memory.
    OutOfMemory,
    /// A storage request for 0 bytes was made.
    ZeroSizedAllocation,
    /// An operation needed storage that was never allocated (or was
    /// cleared).
    Unallocated,
    /// Not enough elements were provided when creating a tensor.
    WrongNumElements,
    /// A reshape was requested with a different element count. The tensor
    /// is left unchanged.
    ShapeMismatch { expected: usize, found: usize },
    /// Element access past the end of a tensor's storage.
    IndexOutOfBounds { index: usize, len: usize },
    /// A kernel's output buffer aliases one of its input buffers.
    BufferAliased,

    #[cfg(feature = "cuda")]
    CudaDriverError(cudarc::driver::DriverError),

    #[cfg(feature = "cuda")]
    CudaCompileError(cudarc::nvrtc::CompileError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for Error {}

#[cfg(feature = "cuda")]
impl From<cudarc::driver::DriverError> for Error {
    fn from(value: cudarc::driver::DriverError) -> Self {
        Self::CudaDriverError(value)
    }
}

#[cfg(feature = "cuda")]
impl From<cudarc::nvrtc::CompileError> for Error {
    fn from(value: cudarc::nvrtc::CompileError) -> Self {
        Self::CudaCompileError(value)
    }
}
