use super::Shape;

/// Accelerator tensor descriptors require at least this many dimensions.
pub const MIN_DESCRIPTOR_DIMS: usize = 4;

/// Accelerator-side layout metadata for one tensor: padded dimension
/// extents and strides, stored slowest-varying first (the convention the
/// accelerator descriptor APIs expect, reversed relative to [Shape]'s
/// `d0`-fastest order).
///
/// A descriptor is only meaningful for the shape it was computed from; a
/// stale descriptor produces silently wrong kernel results, so tensors
/// recompute theirs on every shape mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorDescriptor {
    extents: Vec<usize>,
    strides: Vec<usize>,
}

impl TensorDescriptor {
    /// Padded extents, slowest-varying dimension first.
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// Strides matching [TensorDescriptor::extents] slot for slot.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Number of padded dimensions, always `>= MIN_DESCRIPTOR_DIMS`.
    pub fn dimension(&self) -> usize {
        self.extents.len()
    }
}

/// Builds the layout descriptor for `shape`.
///
/// Given `n` logical extents `d0..d(n-1)` with `d0` fastest-varying, the
/// descriptor has `max(n, 4)` slots. Real dimensions get row-major
/// strides (fastest dimension at stride 1); the padding slots beyond `n`
/// are degenerate: extent 1, stride equal to the stride of the slowest
/// real dimension. Everything is stored in reversed dimension order.
///
/// A shape with no dimensions yields the all-ones descriptor.
///
/// ```rust
/// # use dualtensor::prelude::*;
/// let desc = compute_descriptor(&Shape::from([2, 3]));
/// assert_eq!(desc.extents(), &[1, 1, 3, 2]);
/// assert_eq!(desc.strides(), &[2, 2, 2, 1]);
/// ```
pub fn compute_descriptor(shape: &Shape) -> TensorDescriptor {
    let n = shape.dimension();
    let padded = n.max(MIN_DESCRIPTOR_DIMS);

    let mut extents = vec![1usize; padded];
    let mut strides = vec![1usize; padded];

    let mut stride = 1;
    for i in 0..n {
        extents[padded - 1 - i] = shape[i];
        strides[padded - 1 - i] = stride;
        stride *= shape[i];
    }
    // Padding slots are degenerate: they reuse the stride of the slowest
    // real dimension and contribute no additional striding.
    if n > 0 {
        let pad_stride = strides[padded - n];
        for slot in strides.iter_mut().take(padded - n) {
            *slot = pad_stride;
        }
    }

    TensorDescriptor { extents, strides }
}
