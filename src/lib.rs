//! # dualtensor
//!
//! The memory & compute substrate of a small training framework: a
//! device-abstracted tensor backed by a reference-counted dual-resident
//! buffer, the shape-to-descriptor machinery, parallel loss
//! reduction kernels, and a numerical gradient-check oracle.
//!
//! # Tensors, buffers, devices
//!
//! *See [tensor] for more information.*
//!
//! A [`tensor::Tensor`] is a [`shapes::Shape`], a name, and a
//! [`tensor::SharedBuffer`] of elements. Buffers are reference-counted:
//! cloning a tensor aliases its storage, and the bytes live until the
//! last owner drops or clears. On accelerator targets every buffer is
//! mirrored in host and device memory; the mirrors are synchronized only
//! by explicit copies, and [`tensor::Residency`] makes their divergence
//! observable. The device is a type parameter ([`tensor::Cpu`] always,
//! `Cuda` behind the `cuda` feature), not a runtime hierarchy.
//!
//! ```rust
//! use dualtensor::prelude::*;
//!
//! let dev: Cpu = Default::default();
//! let mut input = Tensor::<f32, _>::with_name(&dev, [2, 3], "predictions");
//! input.try_init_with(&[0.9, 0.1, 0.8, 0.2, 0.6, 0.4]).unwrap();
//! input.try_copy_from_host_to_device().unwrap();
//! assert_eq!(input.get(2).unwrap(), 0.8);
//! ```
//!
//! # Loss kernels
//!
//! *See [tensor_ops] for more information.*
//!
//! [`tensor_ops::try_cross_entropy_cost`] reduces elementwise binary
//! cross-entropy into one scalar per batch element;
//! [`tensor_ops::try_softmax_log_loss`] and
//! [`tensor_ops::try_softmax_log_loss_grad`] are the label-index
//! sibling pair. All kernels partition work into fixed-size work groups
//! and reduce shared output slots with atomic adds.
//!
//! # Gradient checking
//!
//! *See [gradient_check] for more information.*
//!
//! [`gradient_check::gradient_check`] validates any analytic gradient
//! function against central-difference estimates, reporting every
//! mismatching coordinate.

pub mod dtypes;
pub mod gradient_check;
pub mod shapes;
pub mod tensor;
pub mod tensor_ops;

/// Contains subset of all public exports.
pub mod prelude {
    pub use crate::gradient_check::*;
    pub use crate::shapes::*;
    pub use crate::tensor::*;
    pub use crate::tensor_ops::*;
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::distributions::Distribution;

    use crate::dtypes::Unit;
    use crate::tensor::{Cpu, Error, Storage};

    #[cfg(not(feature = "cuda"))]
    pub type TestDevice = crate::tensor::Cpu;

    #[cfg(feature = "cuda")]
    pub type TestDevice = crate::tensor::Cuda;

    #[cfg(not(feature = "test-f64"))]
    pub type TestDtype = f32;

    #[cfg(feature = "test-f64")]
    pub type TestDtype = f64;

    /// An accelerator target emulated in host memory: the device mirror
    /// is a second `Vec`. Lets the dual-residency and descriptor
    /// machinery run (and fail loudly) in plain CPU tests.
    #[derive(Clone, Debug, Default)]
    pub struct EmulatedAccel {
        cpu: Cpu,
    }

    impl<E: Unit> Storage<E> for EmulatedAccel {
        type Vec = std::vec::Vec<E>;

        const HAS_ACCELERATOR: bool = true;

        fn try_alloc_len(&self, len: usize) -> Result<Self::Vec, Error> {
            Ok(vec![E::default(); len])
        }

        fn try_copy_to_accel(&self, src: &[E], dst: &mut Self::Vec) -> Result<(), Error> {
            dst.copy_from_slice(src);
            Ok(())
        }

        fn try_copy_from_accel(&self, src: &Self::Vec, dst: &mut [E]) -> Result<(), Error> {
            dst.copy_from_slice(src);
            Ok(())
        }

        fn try_fill_with_distr<D: Distribution<E>>(
            &self,
            dst: &mut [E],
            distr: D,
        ) -> Result<(), Error> {
            self.cpu.try_fill_with_distr(dst, distr)
        }
    }

    pub trait AssertClose {
        type Elem: std::fmt::Display + std::fmt::Debug + Copy;
        const DEFAULT_TOLERANCE: Self::Elem;
        fn get_default_tol(&self) -> Self::Elem {
            Self::DEFAULT_TOLERANCE
        }
        fn get_far_pair(
            &self,
            rhs: &Self,
            tolerance: Self::Elem,
        ) -> Option<(Self::Elem, Self::Elem)>;
        fn assert_close(&self, rhs: &Self, tolerance: Self::Elem)
        where
            Self: std::fmt::Debug,
        {
            if let Some((l, r)) = self.get_far_pair(rhs, tolerance) {
                panic!("lhs != rhs | {l} != {r}\n\n{self:?}\n\n{rhs:?}");
            }
        }
    }

    impl AssertClose for f32 {
        type Elem = f32;
        const DEFAULT_TOLERANCE: Self::Elem = 1e-6;
        fn get_far_pair(&self, rhs: &Self, tolerance: f32) -> Option<(f32, f32)> {
            if (self - rhs).abs() > tolerance {
                Some((*self, *rhs))
            } else {
                None
            }
        }
    }

    impl AssertClose for f64 {
        type Elem = f64;
        const DEFAULT_TOLERANCE: Self::Elem = 1e-6;
        fn get_far_pair(&self, rhs: &Self, tolerance: f64) -> Option<(f64, f64)> {
            if (self - rhs).abs() > tolerance {
                Some((*self, *rhs))
            } else {
                None
            }
        }
    }

    impl<T: AssertClose> AssertClose for Vec<T> {
        type Elem = T::Elem;
        const DEFAULT_TOLERANCE: Self::Elem = T::DEFAULT_TOLERANCE;
        fn get_far_pair(
            &self,
            rhs: &Self,
            tolerance: Self::Elem,
        ) -> Option<(Self::Elem, Self::Elem)> {
            assert_eq!(self.len(), rhs.len());
            for (l, r) in self.iter().zip(rhs.iter()) {
                if let Some(pair) = l.get_far_pair(r, tolerance) {
                    return Some(pair);
                }
            }
            None
        }
    }

    macro_rules! assert_close_to_literal {
        ($Lhs:expr, $Rhs:expr) => {{
            let lhs = $Lhs.try_as_vec().unwrap();
            let rhs: Vec<_> = $Rhs
                .iter()
                .map(|&x| num_traits::FromPrimitive::from_f64(x).unwrap())
                .collect();
            let tol = AssertClose::get_default_tol(&lhs);
            AssertClose::assert_close(&lhs, &rhs, tol);
        }};
        ($Lhs:expr, $Rhs:expr, $Tolerance:expr) => {{
            let lhs = $Lhs.try_as_vec().unwrap();
            let rhs: Vec<_> = $Rhs
                .iter()
                .map(|&x| num_traits::FromPrimitive::from_f64(x).unwrap())
                .collect();
            AssertClose::assert_close(
                &lhs,
                &rhs,
                num_traits::FromPrimitive::from_f64($Tolerance).unwrap(),
            );
        }};
    }
    pub(crate) use assert_close_to_literal;
}
