//! Volatile cell for descriptor words the DMA controller reads.

/// One word of a list element image
///
/// Reads and writes are volatile; the controller fetches these words on its
/// own schedule.
#[repr(transparent)]
pub(crate) struct VolatileCell<T: Copy> {
    value: core::cell::UnsafeCell<T>,
}

// Safety: all access is through volatile operations on word-sized values.
unsafe impl<T: Copy> Sync for VolatileCell<T> {}

impl<T: Copy> VolatileCell<T> {
    #[inline(always)]
    pub(crate) const fn new(value: T) -> Self {
        Self {
            value: core::cell::UnsafeCell::new(value),
        }
    }

    /// Read the value (volatile read)
    #[inline(always)]
    pub(crate) fn get(&self) -> T {
        unsafe { core::ptr::read_volatile(self.value.get()) }
    }

    /// Write a value (volatile write)
    #[inline(always)]
    pub(crate) fn set(&self, value: T) {
        unsafe { core::ptr::write_volatile(self.value.get(), value) }
    }

    /// Read-modify-write
    #[inline(always)]
    pub(crate) fn update(&self, f: impl FnOnce(T) -> T) {
        self.set(f(self.get()));
    }
}

impl<T: Copy + core::fmt::Debug> core::fmt::Debug for VolatileCell<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.get().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_is_one_transparent_word() {
        let words = [const { VolatileCell::new(0u32) }; 2];
        words[1].set(0xA5A5_0001);
        assert_eq!(words[0].get(), 0);
        assert_eq!(words[1].get(), 0xA5A5_0001);
        assert_eq!(core::mem::size_of_val(&words), 8);
    }

    #[test]
    fn update_touches_only_the_requested_bits() {
        let word = VolatileCell::new(0x0000_00F0u32);
        word.update(|w| w | 0x1);
        assert_eq!(word.get(), 0x0000_00F1);
        word.update(|w| w & !0xF0);
        assert_eq!(word.get(), 0x0000_0001);
    }
}
