use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// A race-free accumulation slot: the host rendition of the
/// accelerator's `atomicAdd`. Work-items sharing an output slot
/// accumulate through a bitwise compare-and-swap loop, so the final sum
/// is exact up to floating summation order (which depends on parallel
/// scheduling, exactly as on the accelerator).
pub trait AtomicAccum: Copy {
    type Atomic: Send + Sync;

    fn atomic_zero() -> Self::Atomic;
    fn atomic_add(slot: &Self::Atomic, value: Self);
    fn atomic_load(slot: &Self::Atomic) -> Self;
}

macro_rules! atomic_accum {
    ($Float:ty, $Atomic:ty) => {
        impl AtomicAccum for $Float {
            type Atomic = $Atomic;

            fn atomic_zero() -> Self::Atomic {
                <$Atomic>::new((0.0 as $Float).to_bits())
            }

            fn atomic_add(slot: &Self::Atomic, value: Self) {
                let mut current = slot.load(Ordering::Relaxed);
                loop {
                    let next = (<$Float>::from_bits(current) + value).to_bits();
                    match slot.compare_exchange_weak(
                        current,
                        next,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => break,
                        Err(actual) => current = actual,
                    }
                }
            }

            fn atomic_load(slot: &Self::Atomic) -> Self {
                <$Float>::from_bits(slot.load(Ordering::Relaxed))
            }
        }
    };
}

atomic_accum!(f32, AtomicU32);
atomic_accum!(f64, AtomicU64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrent_adds_are_lossless() {
        let slot = f64::atomic_zero();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..1000 {
                        f64::atomic_add(&slot, 0.25);
                    }
                });
            }
        });
        assert_eq!(f64::atomic_load(&slot), 1000.0);
    }
}
