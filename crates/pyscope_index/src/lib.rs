//! Typed arena indices: a [`Idx`] trait for newtype indices, the
//! [`newtype_index!`] macro to declare them, and [`IndexVec`]/[`IndexSlice`]
//! containers indexed by them instead of `usize`.

mod slice;
mod vec;

pub use slice::IndexSlice;
pub use vec::IndexVec;

/// A type usable as the index of an [`IndexVec`].
pub trait Idx: Copy + PartialEq + Eq + std::hash::Hash + std::fmt::Debug + 'static {
    fn new(value: usize) -> Self;

    fn index(self) -> usize;
}

/// Declares a `u32`-backed newtype index.
///
/// The type stores the index as a [`std::num::NonZeroU32`] shifted by one so
/// that `Option<Index>` is the same size as `Index` itself, mirroring the
/// layout trick used by rustc's index types.
#[macro_export]
macro_rules! newtype_index {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis struct $name(std::num::NonZeroU32);

        impl $name {
            #[inline]
            $vis const fn from_u32(value: u32) -> Self {
                assert!(value < u32::MAX);
                // SAFETY-free: `value + 1` cannot be zero after the assert.
                match std::num::NonZeroU32::new(value + 1) {
                    Some(value) => Self(value),
                    None => unreachable!(),
                }
            }

            #[inline]
            $vis const fn as_u32(self) -> u32 {
                self.0.get() - 1
            }

            #[inline]
            $vis const fn as_usize(self) -> usize {
                self.as_u32() as usize
            }
        }

        impl $crate::Idx for $name {
            #[inline]
            fn new(value: usize) -> Self {
                assert!(u32::try_from(value).is_ok_and(|value| value < u32::MAX));
                #[allow(clippy::cast_possible_truncation)]
                Self::from_u32(value as u32)
            }

            #[inline]
            fn index(self) -> usize {
                self.as_usize()
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.as_u32()).finish()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{Idx, IndexVec};

    newtype_index! {
        struct TestId;
    }

    #[test]
    fn niche_optimization() {
        assert_eq!(
            std::mem::size_of::<TestId>(),
            std::mem::size_of::<Option<TestId>>()
        );
    }

    #[test]
    fn push_and_index() {
        let mut vec: IndexVec<TestId, &str> = IndexVec::new();
        let a = vec.push("a");
        let b = vec.push("b");
        assert_eq!(a, TestId::from_u32(0));
        assert_eq!(vec[b], "b");
        assert_eq!(vec.next_index(), TestId::new(2));
        assert_eq!(vec.iter_enumerated().count(), 2);
    }
}
