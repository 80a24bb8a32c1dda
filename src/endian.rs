use core::fmt::Debug;

/// Little endian on-disk integer, usable inside packed records
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct Little<T: Copy + Default + Debug + PartialEq + Eq>(T);

macro_rules! define {
    ($type:ty) => {
        impl Little<$type> {
            #[inline]
            pub fn to_ne(self) -> $type {
                <$type>::from_le(self.0)
            }
        }

        impl From<$type> for Little<$type> {
            #[inline]
            fn from(t: $type) -> Self {
                Self(<$type>::to_le(t))
            }
        }

        impl From<Little<$type>> for $type {
            #[inline]
            fn from(t: Little<$type>) -> $type {
                t.to_ne()
            }
        }
    };
}

define!(u16);
define!(u32);
