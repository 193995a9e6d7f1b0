use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::dtypes::Unit;

use super::{storage_traits::Storage, Error};

/// Which mirrors of a [SharedBuffer] currently hold meaningful data.
///
/// Copies between the memory spaces are explicit transitions; nothing
/// keeps the mirrors consistent automatically. A buffer on a device with
/// no accelerator space never leaves `HostOnly` once allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residency {
    /// No storage allocated.
    Unallocated,
    /// Host storage only; the device target has no accelerator mirror.
    HostOnly,
    /// Both mirrors allocated and last known to hold the same bytes.
    BothSynced,
    /// Both mirrors allocated, but one has been written since the last
    /// copy. Whichever side was written last is the fresh one; the
    /// caller knows which, the buffer only knows they differ.
    BothDiverged,
}

#[derive(Debug)]
pub(crate) struct BufferInner<E, D: Storage<E>>
where
    E: Unit,
{
    pub(crate) host: Vec<E>,
    pub(crate) accel: Option<D::Vec>,
    pub(crate) residency: Residency,
}

impl<E: Unit, D: Storage<E>> Default for BufferInner<E, D> {
    fn default() -> Self {
        Self {
            host: Vec::new(),
            accel: None,
            residency: Residency::Unallocated,
        }
    }
}

/// A single logical storage region, reference-counted and potentially
/// mirrored across host and accelerator memory spaces.
///
/// Cloning aliases the storage instead of duplicating bytes: mutation
/// through one alias is visible through every alias. This is the sharing
/// primitive behind lightweight tensor copies. The allocation is released
/// when the last owner drops it or detaches via [SharedBuffer::clear].
#[derive(Debug)]
pub struct SharedBuffer<E: Unit, D: Storage<E>> {
    inner: Arc<RwLock<BufferInner<E, D>>>,
    device: D,
}

impl<E: Unit, D: Storage<E>> Clone for SharedBuffer<E, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            device: self.device.clone(),
        }
    }
}

impl<E: Unit, D: Storage<E>> Default for SharedBuffer<E, D> {
    fn default() -> Self {
        Self::new(D::default())
    }
}

impl<E: Unit, D: Storage<E>> SharedBuffer<E, D> {
    /// An unallocated buffer on `device`.
    pub fn new(device: D) -> Self {
        Self {
            inner: Arc::new(RwLock::new(BufferInner::default())),
            device,
        }
    }

    /// Allocates `len` zero-filled elements in every memory space the
    /// device target requires. Prior storage is released first, through
    /// every alias. All-or-nothing: on error the buffer is unallocated.
    pub fn try_alloc(&self, len: usize) -> Result<(), Error> {
        if len == 0 {
            return Err(Error::ZeroSizedAllocation);
        }
        let mut inner = self.inner.write().unwrap();
        *inner = BufferInner::default();

        let mut host = Vec::new();
        host.try_reserve_exact(len).map_err(|_| Error::OutOfMemory)?;
        host.resize(len, E::default());

        let accel = if D::HAS_ACCELERATOR {
            Some(self.device.try_alloc_len(len)?)
        } else {
            None
        };

        inner.host = host;
        inner.accel = accel;
        inner.residency = if D::HAS_ACCELERATOR {
            Residency::BothSynced
        } else {
            Residency::HostOnly
        };
        Ok(())
    }

    /// Detaches this owner from the shared storage, leaving it
    /// unallocated. Other aliases keep the storage alive; the bytes are
    /// only released when the last owner clears or drops. Idempotent.
    pub fn clear(&mut self) {
        self.inner = Arc::new(RwLock::new(BufferInner::default()));
    }

    /// Element count of the current allocation, 0 if unallocated.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().host.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current allocation size of the host mirror, 0 if unallocated.
    pub fn size_in_bytes(&self) -> usize {
        self.len() * std::mem::size_of::<E>()
    }

    pub fn is_allocated(&self) -> bool {
        self.residency() != Residency::Unallocated
    }

    pub fn residency(&self) -> Residency {
        self.inner.read().unwrap().residency
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Whether `self` and `other` alias the same storage.
    pub fn aliases(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of owners currently aliasing this storage.
    pub fn owner_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Read access to the host mirror.
    pub fn with_host<R>(&self, f: impl FnOnce(&[E]) -> R) -> Result<R, Error> {
        let inner = self.inner.read().unwrap();
        if inner.residency == Residency::Unallocated {
            return Err(Error::Unallocated);
        }
        Ok(f(&inner.host))
    }

    /// Write access to the host mirror. On accelerator targets this
    /// marks the mirrors diverged; the caller must push before the next
    /// kernel reads the buffer.
    pub fn with_host_mut<R>(&self, f: impl FnOnce(&mut [E]) -> R) -> Result<R, Error> {
        let mut inner = self.inner.write().unwrap();
        if inner.residency == Residency::Unallocated {
            return Err(Error::Unallocated);
        }
        let r = f(&mut inner.host);
        if D::HAS_ACCELERATOR {
            inner.residency = Residency::BothDiverged;
        }
        Ok(r)
    }

    /// Synchronous bulk copy from host to accelerator. No-op on device targets
    /// without an accelerator mirror.
    pub fn try_copy_from_host_to_device(&self) -> Result<(), Error> {
        let mut inner = self.inner.write().unwrap();
        if inner.residency == Residency::Unallocated {
            return Err(Error::Unallocated);
        }
        let BufferInner {
            host,
            accel,
            residency,
        } = &mut *inner;
        if let Some(accel) = accel.as_mut() {
            self.device.try_copy_to_accel(host, accel)?;
            *residency = Residency::BothSynced;
        }
        Ok(())
    }

    /// Synchronous bulk copy from accelerator to host. No-op on device targets
    /// without an accelerator mirror.
    pub fn try_copy_from_device_to_host(&self) -> Result<(), Error> {
        let mut inner = self.inner.write().unwrap();
        if inner.residency == Residency::Unallocated {
            return Err(Error::Unallocated);
        }
        let BufferInner {
            host,
            accel,
            residency,
        } = &mut *inner;
        if let Some(accel) = accel.as_ref() {
            self.device.try_copy_from_accel(accel, host)?;
            *residency = Residency::BothSynced;
        }
        Ok(())
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, BufferInner<E, D>> {
        self.inner.read().unwrap()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, BufferInner<E, D>> {
        self.inner.write().unwrap()
    }
}
