use derive_more::{Display, From, Into};

use crate::io::SECTOR_SIZE_SHIFT;

#[derive(Copy, Clone, Debug, Default, Display, From, Into, Eq, Ord, PartialOrd, PartialEq)]
pub struct SectorID(u64);

impl SectorID {
    pub const BOOT: Self = Self(0);
    pub const FSINFO: Self = Self(1);
    pub const BACKUP_BOOT: Self = Self(6);

    /// Logical byte offset of this sector on the disk
    pub fn offset(self) -> u64 {
        self.0 << SECTOR_SIZE_SHIFT
    }
}

impl<I: Into<u64>> core::ops::Add<I> for SectorID {
    type Output = Self;

    fn add(self, rhs: I) -> Self {
        Self(self.0 + rhs.into())
    }
}

impl<I: Into<u64>> core::ops::AddAssign<I> for SectorID {
    fn add_assign(&mut self, rhs: I) {
        self.0 += rhs.into()
    }
}

/// Provider defined memory type code, passed through untouched
#[derive(Copy, Clone, Debug, Default, Display, From, Into, Eq, PartialEq)]
#[display("{_0:#010X}")]
pub struct MemoryKind(u32);

impl MemoryKind {
    pub const fn new(kind: u32) -> Self {
        Self(kind)
    }
}

#[derive(Copy, Clone, Debug, Default, Display, From, Into, Eq, PartialEq)]
#[display("{_0:#X}")]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    pub const fn new(address: u64) -> Self {
        Self(address)
    }
}
