use core::mem::size_of;

use super::boot::{Fat32BootSector, SECTOR_SIGNATURE};
use crate::endian::Little as LE;
use crate::io::{Sector, SECTOR_SIZE};

const LEAD_SIGNATURE: u32 = 0x41615252;
const STRUCT_SIGNATURE: u32 = 0x61417272;
/// Next free cluster hint meaning "unknown, search from cluster 2"
const UNKNOWN: u32 = 0xFFFFFFFF;

/// FAT32 free space summary, stored at sector 1
#[derive(Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct FsInfo {
    pub lead_signature: LE<u32>,
    _reserved1: [u8; 480],
    pub struct_signature: LE<u32>,
    pub free_count: LE<u32>,
    pub next_free: LE<u32>,
    _reserved2: [u8; 14],
    pub sector_signature: LE<u16>,
}

const _: () = assert!(size_of::<FsInfo>() == SECTOR_SIZE);

impl FsInfo {
    pub fn new(boot_sector: &Fat32BootSector) -> Self {
        let total_sectors = boot_sector.bpb().total_sectors();
        let fat_size = boot_sector.fat_size_32();
        let reserved = boot_sector.bpb().reserved_sectors() as u32;
        Self::with_geometry(total_sectors, fat_size, reserved)
    }

    pub fn with_geometry(total_sectors: u32, fat_size: u32, reserved_sectors: u32) -> Self {
        let data_sectors = total_sectors.wrapping_sub(fat_size * 2 + reserved_sectors);
        let mut fsinfo: Self = unsafe { core::mem::zeroed() };
        fsinfo.lead_signature = LEAD_SIGNATURE.into();
        fsinfo.struct_signature = STRUCT_SIGNATURE.into();
        fsinfo.free_count = ((data_sectors >> 6).wrapping_sub(1)).into();
        fsinfo.next_free = UNKNOWN.into();
        fsinfo.sector_signature = SECTOR_SIGNATURE.into();
        fsinfo
    }

    pub fn free_count(&self) -> u32 {
        self.free_count.to_ne()
    }

    pub fn as_bytes(&self) -> &Sector {
        unsafe { &*(self as *const Self as *const Sector) }
    }
}
