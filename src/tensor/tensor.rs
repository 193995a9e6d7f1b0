use rand::distributions::{Distribution, Standard};

use crate::dtypes::Unit;
use crate::shapes::{compute_descriptor, Shape, TensorDescriptor};

use super::{buffer::SharedBuffer, cpu::Cpu, storage_traits::Storage, Error};

/// A tensor: a [Shape], a display name, and a [SharedBuffer] of
/// elements, plus (on accelerator targets) the layout descriptor the
/// accelerator kernels need to interpret the raw storage.
///
/// Construction does not allocate; call [Tensor::try_init] or
/// [Tensor::try_init_with] first. Cloning aliases the storage (see
/// [SharedBuffer]), so clones are lightweight views of the same bytes.
///
/// The two mirrors of a dual-resident tensor are never synchronized
/// automatically: host writes must be followed by
/// [Tensor::try_copy_from_host_to_device] before a kernel reads the
/// tensor, and kernel writes by [Tensor::try_copy_from_device_to_host]
/// before host code reads them.
///
/// ```rust
/// # use dualtensor::prelude::*;
/// let dev: Cpu = Default::default();
/// let mut t = Tensor::<f32, _>::new(&dev, [3, 2]);
/// t.try_init_with(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
/// assert_eq!(t.get(4).unwrap(), 5.0);
/// ```
#[derive(Debug)]
pub struct Tensor<E: Unit, D: Storage<E> = Cpu> {
    pub(crate) shape: Shape,
    pub(crate) name: String,
    pub(crate) data: SharedBuffer<E, D>,
    pub(crate) descriptor: Option<TensorDescriptor>,
    pub(crate) device: D,
}

impl<E: Unit, D: Storage<E>> Clone for Tensor<E, D> {
    /// Aliases the source's storage; the clone gets its own freshly
    /// computed descriptor.
    fn clone(&self) -> Self {
        Self {
            shape: self.shape.clone(),
            name: self.name.clone(),
            data: self.data.clone(),
            descriptor: D::HAS_ACCELERATOR.then(|| compute_descriptor(&self.shape)),
            device: self.device.clone(),
        }
    }
}

impl<E: Unit, D: Storage<E>> Tensor<E, D> {
    /// A tensor named `"no_name"`. Storage allocation is deferred to
    /// [Tensor::try_init].
    pub fn new(device: &D, shape: impl Into<Shape>) -> Self {
        Self::with_name(device, shape, "no_name")
    }

    pub fn with_name(device: &D, shape: impl Into<Shape>, name: impl Into<String>) -> Self {
        let shape = shape.into();
        Self {
            descriptor: D::HAS_ACCELERATOR.then(|| compute_descriptor(&shape)),
            shape,
            name: name.into(),
            data: SharedBuffer::new(device.clone()),
            device: device.clone(),
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// The layout descriptor, present only on accelerator targets. Always
    /// describes the current shape.
    pub fn descriptor(&self) -> Option<&TensorDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn buffer(&self) -> &SharedBuffer<E, D> {
        &self.data
    }

    pub fn size_in_bytes(&self) -> usize {
        self.data.size_in_bytes()
    }

    /// Allocates storage for `shape().size()` elements in every memory
    /// space the device target requires, zero-filled. Re-initializing
    /// releases the prior allocation first. Errors on empty shapes and
    /// allocation failure.
    pub fn try_init(&mut self) -> Result<(), Error> {
        self.data.try_alloc(self.shape.size())?;
        self.sync_descriptor();
        Ok(())
    }

    /// [Tensor::try_init], then copies `min(values.len(), size)` elements
    /// into host storage and pushes them to the accelerator mirror.
    ///
    /// A length mismatch is not an error: extra values are discarded and
    /// a shortfall leaves the remaining elements zeroed. Both cases log a
    /// warning.
    pub fn try_init_with(&mut self, values: &[E]) -> Result<(), Error> {
        self.try_init()?;
        let size = self.shape.size();
        if values.len() != size {
            tracing::warn!(
                tensor = %self.name,
                expected = size,
                provided = values.len(),
                "init value count does not match tensor size"
            );
        }
        let n = values.len().min(size);
        self.data.with_host_mut(|host| host[..n].copy_from_slice(&values[..n]))?;
        self.data.try_copy_from_host_to_device()
    }

    /// Overwrites every host element with a sample from the device's
    /// seeded uniform source, then pushes to the accelerator mirror.
    pub fn try_randomize(&mut self) -> Result<(), Error>
    where
        Standard: Distribution<E>,
    {
        self.try_randomize_with(Standard)
    }

    /// [Tensor::try_randomize] with an arbitrary distribution.
    pub fn try_randomize_with<Dist: Distribution<E>>(&mut self, distr: Dist) -> Result<(), Error> {
        let device = self.device.clone();
        self.data
            .with_host_mut(|host| device.try_fill_with_distr(host, distr))??;
        self.data.try_copy_from_host_to_device()
    }

    /// Replaces the shape with `new_shape` iff the element counts match;
    /// otherwise the tensor is left unchanged. On success the layout
    /// descriptor is recomputed.
    pub fn try_reshape(&mut self, new_shape: impl Into<Shape>) -> Result<(), Error> {
        let new_shape = new_shape.into();
        if new_shape.size() != self.shape.size() {
            return Err(Error::ShapeMismatch {
                expected: self.shape.size(),
                found: new_shape.size(),
            });
        }
        self.shape = new_shape;
        self.sync_descriptor();
        Ok(())
    }

    /// Reads the host-resident element at flat index `index`.
    pub fn get(&self, index: usize) -> Result<E, Error> {
        self.data.with_host(|host| {
            host.get(index).copied().ok_or(Error::IndexOutOfBounds {
                index,
                len: host.len(),
            })
        })?
    }

    /// Writes the host-resident element at flat index `index`, marking
    /// the mirrors diverged on accelerator targets. The caller must push
    /// before the next kernel reads this tensor.
    pub fn set(&mut self, index: usize, value: E) -> Result<(), Error> {
        let len = self.data.len();
        if index >= len {
            return Err(Error::IndexOutOfBounds { index, len });
        }
        self.data.with_host_mut(|host| host[index] = value)
    }

    /// Copies the host mirror into a fresh `Vec`.
    pub fn try_as_vec(&self) -> Result<Vec<E>, Error> {
        self.data.with_host(|host| host.to_vec())
    }

    /// Synchronous push of the host mirror to the accelerator mirror.
    /// No-op on host-only targets.
    pub fn try_copy_from_host_to_device(&self) -> Result<(), Error> {
        self.data.try_copy_from_host_to_device()
    }

    /// Synchronous pull of the accelerator mirror into the host mirror.
    /// No-op on host-only targets.
    pub fn try_copy_from_device_to_host(&self) -> Result<(), Error> {
        self.data.try_copy_from_device_to_host()
    }

    /// Detaches this tensor from the shared storage. The tensor keeps its
    /// shape but is uninitialized until the next `init`; aliases keep the
    /// storage alive.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    fn sync_descriptor(&mut self) {
        if D::HAS_ACCELERATOR {
            self.descriptor = Some(compute_descriptor(&self.shape));
        }
    }
}

impl<E: Unit, D: Storage<E>> Tensor<E, D> {
    pub fn init(&mut self) {
        self.try_init().unwrap()
    }

    pub fn init_with(&mut self, values: &[E]) {
        self.try_init_with(values).unwrap()
    }

    pub fn randomize(&mut self)
    where
        Standard: Distribution<E>,
    {
        self.try_randomize().unwrap()
    }

    pub fn reshape(&mut self, new_shape: impl Into<Shape>) {
        self.try_reshape(new_shape).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::buffer::Residency;
    use crate::tests::EmulatedAccel;

    #[test]
    fn test_init_fails_on_empty_shape() {
        let dev: Cpu = Default::default();
        let mut t = Tensor::<f32, _>::new(&dev, Shape::default());
        assert!(matches!(t.try_init(), Err(Error::ZeroSizedAllocation)));
        let mut t = Tensor::<f32, _>::new(&dev, [4, 0]);
        assert!(matches!(t.try_init(), Err(Error::ZeroSizedAllocation)));
    }

    #[test]
    fn test_init_with_reads_back_prefix() {
        let dev: Cpu = Default::default();
        let mut t = Tensor::<f32, _>::new(&dev, [2, 3]);
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        t.try_init_with(&values).unwrap();
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(t.get(i).unwrap(), v);
        }
    }

    #[test]
    fn test_init_with_truncates_extra_values() {
        let dev: Cpu = Default::default();
        let mut t = Tensor::<f32, _>::new(&dev, [2]);
        t.try_init_with(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(t.try_as_vec().unwrap(), [1.0, 2.0]);
    }

    #[test]
    fn test_init_with_shortfall_leaves_zeros() {
        let dev: Cpu = Default::default();
        let mut t = Tensor::<f32, _>::new(&dev, [4]);
        t.try_init_with(&[7.0]).unwrap();
        assert_eq!(t.try_as_vec().unwrap(), [7.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_reinit_releases_prior_storage() {
        let dev: Cpu = Default::default();
        let mut t = Tensor::<f32, _>::new(&dev, [3]);
        t.try_init_with(&[1.0, 2.0, 3.0]).unwrap();
        t.try_init().unwrap();
        assert_eq!(t.try_as_vec().unwrap(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_reshape_requires_same_element_count() {
        let dev: Cpu = Default::default();
        let mut t = Tensor::<f32, _>::new(&dev, [2, 3]);
        t.try_init().unwrap();
        t.try_reshape([6]).unwrap();
        assert_eq!(t.shape(), &Shape::from([6]));
        assert!(matches!(
            t.try_reshape([7]),
            Err(Error::ShapeMismatch {
                expected: 6,
                found: 7
            })
        ));
        // failed reshape leaves the tensor unchanged and usable
        assert_eq!(t.shape(), &Shape::from([6]));
        t.try_reshape([3, 2]).unwrap();
        assert_eq!(t.get(5).unwrap(), 0.0);
    }

    #[test]
    fn test_element_access_is_bounds_checked() {
        let dev: Cpu = Default::default();
        let mut t = Tensor::<f32, _>::new(&dev, [2]);
        t.try_init().unwrap();
        assert!(matches!(
            t.get(2),
            Err(Error::IndexOutOfBounds { index: 2, len: 2 })
        ));
        assert!(matches!(
            t.set(5, 1.0),
            Err(Error::IndexOutOfBounds { index: 5, len: 2 })
        ));
    }

    #[test]
    fn test_access_before_init_errors() {
        let dev: Cpu = Default::default();
        let t = Tensor::<f32, _>::new(&dev, [2]);
        assert!(matches!(t.get(0), Err(Error::Unallocated)));
    }

    #[test]
    fn test_randomize_uses_seeded_source() {
        let dev_a = Cpu::seed_from_u64(42);
        let dev_b = Cpu::seed_from_u64(42);
        let dev_c = Cpu::seed_from_u64(43);

        let mut a = Tensor::<f32, _>::new(&dev_a, [32]);
        let mut b = Tensor::<f32, _>::new(&dev_b, [32]);
        let mut c = Tensor::<f32, _>::new(&dev_c, [32]);
        a.try_init().unwrap();
        b.try_init().unwrap();
        c.try_init().unwrap();

        a.try_randomize().unwrap();
        b.try_randomize().unwrap();
        c.try_randomize().unwrap();

        assert_eq!(a.try_as_vec().unwrap(), b.try_as_vec().unwrap());
        assert_ne!(a.try_as_vec().unwrap(), c.try_as_vec().unwrap());
    }

    #[test]
    fn test_randomize_with_distribution() {
        let dev: Cpu = Default::default();
        let mut t = Tensor::<f64, _>::new(&dev, [16]);
        t.try_init().unwrap();
        t.try_randomize_with(rand_distr::StandardNormal).unwrap();
        let v = t.try_as_vec().unwrap();
        assert!(v.iter().any(|&x| x != 0.0));
    }

    #[test]
    fn test_clone_aliases_storage() {
        let dev: Cpu = Default::default();
        let mut a = Tensor::<f32, _>::new(&dev, [3]);
        a.try_init_with(&[1.0, 2.0, 3.0]).unwrap();
        let b = a.clone();
        a.set(1, 9.0).unwrap();
        assert_eq!(b.get(1).unwrap(), 9.0);
    }

    #[test]
    fn test_clear_detaches_one_owner() {
        let dev: Cpu = Default::default();
        let mut a = Tensor::<f32, _>::new(&dev, [3]);
        a.try_init_with(&[1.0, 2.0, 3.0]).unwrap();
        let b = a.clone();
        a.clear();
        // b holds the storage alive; a is uninitialized but validly shaped
        assert_eq!(b.get(2).unwrap(), 3.0);
        assert!(matches!(a.get(0), Err(Error::Unallocated)));
        assert_eq!(a.shape(), &Shape::from([3]));
        a.try_init().unwrap();
        assert_eq!(b.get(2).unwrap(), 3.0);
    }

    #[test]
    fn test_no_descriptor_on_host_target() {
        let dev: Cpu = Default::default();
        let t = Tensor::<f32, _>::new(&dev, [2, 3]);
        assert!(t.descriptor().is_none());
    }

    #[test]
    fn test_descriptor_tracks_shape_on_accelerator_target() {
        let dev: EmulatedAccel = Default::default();
        let mut t = Tensor::<f32, _>::new(&dev, [2, 3]);
        let d = t.descriptor().unwrap();
        assert_eq!(d.extents(), &[1, 1, 3, 2]);

        t.try_init().unwrap();
        t.try_reshape([6]).unwrap();
        let d = t.descriptor().unwrap();
        assert_eq!(d.extents(), &[1, 1, 1, 6]);
        assert_eq!(d.strides(), &[1, 1, 1, 1]);

        let c = t.clone();
        assert_eq!(c.descriptor().unwrap().extents(), &[1, 1, 1, 6]);
    }

    #[test]
    fn test_dual_residency_transitions() {
        let dev: EmulatedAccel = Default::default();
        let mut t = Tensor::<f32, _>::new(&dev, [4]);
        t.try_init().unwrap();
        assert_eq!(t.buffer().residency(), Residency::BothSynced);

        t.set(0, 3.0).unwrap();
        assert_eq!(t.buffer().residency(), Residency::BothDiverged);

        t.try_copy_from_host_to_device().unwrap();
        assert_eq!(t.buffer().residency(), Residency::BothSynced);
    }

    #[test]
    fn test_init_with_pushes_to_accelerator_mirror() {
        let dev: EmulatedAccel = Default::default();
        let mut t = Tensor::<f32, _>::new(&dev, [3]);
        t.try_init_with(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(t.buffer().residency(), Residency::BothSynced);
        // clobber the host mirror, then pull the accelerator copy back
        t.set(0, 0.0).unwrap();
        t.set(1, 0.0).unwrap();
        t.set(2, 0.0).unwrap();
        t.try_copy_from_device_to_host().unwrap();
        assert_eq!(t.try_as_vec().unwrap(), [1.0, 2.0, 3.0]);
    }
}
