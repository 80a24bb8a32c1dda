#[cfg(feature = "std")]
pub mod image;

use crate::endian::Little as LE;
use crate::error::Error;
use crate::types::SectorID;

pub const SECTOR_SIZE_SHIFT: u32 = 9;
pub const SECTOR_SIZE: usize = 1 << SECTOR_SIZE_SHIFT;
pub type Sector = [u8; SECTOR_SIZE];

/// Device information record answered to the mass storage layer
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct DevInfo {
    total_sectors: LE<u32>,
    _reserved1: LE<u32>,
    sector_size: LE<u32>,
    _reserved2: LE<u32>,
}

impl DevInfo {
    pub fn new(total_sectors: u32) -> Self {
        let sector_size = (SECTOR_SIZE as u32).into();
        Self { total_sectors: total_sectors.into(), sector_size, ..Default::default() }
    }

    pub fn total_sectors(&self) -> u32 {
        self.total_sectors.to_ne()
    }

    pub fn sector_size(&self) -> u32 {
        self.sector_size.to_ne()
    }

    pub fn to_bytes(self) -> [u8; 16] {
        unsafe { core::mem::transmute(self) }
    }
}

/// Storage contract consumed by a device emulation layer.
///
/// Implementations must serialize calls internally, callers may
/// invoke any method from any thread at any time.
pub trait MassStorage {
    fn dev_info(&self) -> DevInfo;
    /// Reads `count` sectors starting at `id` into the head of `buf`
    fn read_sectors(&self, id: SectorID, buf: &mut [u8], count: u32) -> Result<(), Error>;
    /// Writes `count` sectors starting at `id` from the head of `buf`
    fn write_sectors(&self, id: SectorID, buf: &[u8], count: u32) -> Result<(), Error>;
}

#[cfg(test)]
mod test {
    use memoffset::offset_of;

    use super::DevInfo;

    #[test]
    fn test_dev_info_layout() {
        assert_eq!(core::mem::size_of::<DevInfo>(), 16);
        assert_eq!(offset_of!(DevInfo, sector_size), 8);
        let bytes = DevInfo::new(0x8000).to_bytes();
        assert_eq!(bytes, hex!("00800000 00000000 00020000 00000000"));
    }
}
