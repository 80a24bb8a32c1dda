// Boot sector of FAT12/16/32 volumes

use core::mem::size_of;

use crate::endian::Little as LE;
use crate::io::{Sector, SECTOR_SIZE};

const JUMP_BOOT: [u8; 3] = hex!("EB FE 90");
const OEM_NAME: [u8; 8] = *b"FAPS    ";
const MEDIA_FIXED: u8 = 0xF8;
const SECTORS_PER_TRACK: u16 = 63;
const NUM_HEADS: u16 = 255;
const DRIVE_NUMBER: u8 = 0x80;
const BOOT_SIGNATURE: u8 = 0x29;
const VOLUME_ID: u32 = 0x287C78C1;
const VOLUME_LABEL: [u8; 11] = *b"NO NAME    ";
pub(crate) const SECTOR_SIGNATURE: u16 = 0xAA55;

#[derive(Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct BiosParameterBlock {
    pub jump_boot: [u8; 3],
    pub oem_name: [u8; 8],
    pub bytes_per_sector: LE<u16>,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: LE<u16>,
    pub number_of_fats: u8,
    pub root_entries: LE<u16>,     // FAT12/16 only
    pub total_sectors_16: LE<u16>, // FAT12/16 only, below 0x10000
    pub media: u8,
    pub fat_size_16: LE<u16>,
    pub sectors_per_track: LE<u16>,
    pub num_heads: LE<u16>,
    pub hidden_sectors: LE<u32>,
    pub total_sectors_32: LE<u32>,
}

/// Trailer of FAT12 and FAT16 boot sectors
#[derive(Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct Fat16Extension {
    pub drive_number: u8,
    _reserved: u8,
    pub boot_signature: u8,
    pub volume_id: LE<u32>,
    pub volume_label: [u8; 11],
    pub filesystem_type: [u8; 8],
    _bootcode: [u8; 448],
    pub sector_signature: LE<u16>,
}

#[derive(Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct Fat32Extension {
    pub fat_size_32: LE<u32>,
    pub ext_flags: LE<u16>,
    pub filesystem_version: LE<u16>,
    pub root_cluster: LE<u32>,
    pub fsinfo_sector: LE<u16>,
    pub backup_boot_sector: LE<u16>,
    _reserved1: [u8; 12],
    pub drive_number: u8,
    _reserved2: u8,
    pub boot_signature: u8,
    pub volume_id: LE<u32>,
    pub volume_label: [u8; 11],
    pub filesystem_type: [u8; 8],
    _bootcode: [u8; 420],
    pub sector_signature: LE<u16>,
}

macro_rules! boot_sector {
    ($name:ident, $ext:ty) => {
        #[derive(Copy, Clone, Debug)]
        #[repr(C, packed)]
        pub struct $name {
            pub bpb: BiosParameterBlock,
            pub ext: $ext,
        }

        const _: () = assert!(size_of::<$name>() == SECTOR_SIZE);

        impl $name {
            pub fn as_bytes(&self) -> &Sector {
                unsafe { &*(self as *const Self as *const Sector) }
            }

            pub fn bpb(&self) -> BiosParameterBlock {
                self.bpb
            }

            pub fn filesystem_type(&self) -> [u8; 8] {
                self.ext.filesystem_type
            }
        }
    };
}

boot_sector!(Fat16BootSector, Fat16Extension);
boot_sector!(Fat32BootSector, Fat32Extension);

const _: () = assert!(size_of::<BiosParameterBlock>() == 0x24);

impl BiosParameterBlock {
    fn new(sectors_per_cluster: u8, reserved_sectors: u16) -> Self {
        let mut bpb: Self = unsafe { core::mem::zeroed() };
        bpb.jump_boot = JUMP_BOOT;
        bpb.oem_name = OEM_NAME;
        bpb.bytes_per_sector = (SECTOR_SIZE as u16).into();
        bpb.sectors_per_cluster = sectors_per_cluster;
        bpb.reserved_sectors = reserved_sectors.into();
        bpb.number_of_fats = 2;
        bpb.media = MEDIA_FIXED;
        bpb.sectors_per_track = SECTORS_PER_TRACK.into();
        bpb.num_heads = NUM_HEADS.into();
        bpb
    }

    /// Total sectors, from whichever of the two fields is in use
    pub fn total_sectors(&self) -> u32 {
        match self.total_sectors_16.to_ne() {
            0 => self.total_sectors_32.to_ne(),
            sectors => sectors as u32,
        }
    }

    pub fn reserved_sectors(&self) -> u16 {
        self.reserved_sectors.to_ne()
    }

    pub fn fat_size_16(&self) -> u16 {
        self.fat_size_16.to_ne()
    }

    pub fn bytes_per_sector(&self) -> u16 {
        self.bytes_per_sector.to_ne()
    }

    pub fn root_entries(&self) -> u16 {
        self.root_entries.to_ne()
    }
}

impl Fat16BootSector {
    pub fn fat16(total_sectors: u32) -> Self {
        let mut bpb = BiosParameterBlock::new(8, 2);
        bpb.root_entries = 512u16.into();
        bpb.fat_size_16 = (((total_sectors >> 11) + 3) as u16).into();
        if total_sectors < 0x10000 {
            bpb.total_sectors_16 = (total_sectors as u16).into();
        } else {
            bpb.total_sectors_32 = total_sectors.into();
        }
        let mut ext: Fat16Extension = unsafe { core::mem::zeroed() };
        ext.drive_number = DRIVE_NUMBER;
        ext.boot_signature = BOOT_SIGNATURE;
        ext.volume_id = VOLUME_ID.into();
        ext.volume_label = VOLUME_LABEL;
        ext.filesystem_type = *b"FAT16   ";
        ext.sector_signature = SECTOR_SIGNATURE.into();
        Self { bpb, ext }
    }

    /// Same geometry as FAT16, which is not proper FAT12 cluster math
    /// but what hosts have been mounting so far
    pub fn fat12(total_sectors: u32) -> Self {
        let mut sector = Self::fat16(total_sectors);
        sector.ext.filesystem_type = *b"FAT12   ";
        sector
    }
}

impl Fat32BootSector {
    pub fn fat32(total_sectors: u32) -> Self {
        let mut bpb = BiosParameterBlock::new(64, 64);
        bpb.total_sectors_32 = total_sectors.into();
        let mut ext: Fat32Extension = unsafe { core::mem::zeroed() };
        ext.fat_size_32 = (((total_sectors >> 13) + 0x3F) & !0x3F).into();
        ext.root_cluster = 2u32.into();
        ext.fsinfo_sector = 1u16.into();
        ext.backup_boot_sector = 6u16.into();
        ext.drive_number = DRIVE_NUMBER;
        ext.boot_signature = BOOT_SIGNATURE;
        ext.volume_id = VOLUME_ID.into();
        ext.volume_label = VOLUME_LABEL;
        ext.filesystem_type = *b"FAT32   ";
        ext.sector_signature = SECTOR_SIGNATURE.into();
        Self { bpb, ext }
    }

    pub fn fat_size_32(&self) -> u32 {
        self.ext.fat_size_32.to_ne()
    }

    pub fn root_cluster(&self) -> u32 {
        self.ext.root_cluster.to_ne()
    }
}

/// Common part of any FAT boot sector, read back from raw sector bytes
pub fn parse(sector: &Sector) -> Option<BiosParameterBlock> {
    let ptr = sector.as_ptr() as *const BiosParameterBlock;
    let bpb = unsafe { core::ptr::read_unaligned(ptr) };
    let signature = u16::from_le_bytes([sector[510], sector[511]]);
    if bpb.jump_boot[0] != 0xEB || signature != SECTOR_SIGNATURE {
        return None;
    }
    Some(bpb)
}

/// Filesystem type tag, located by the FAT size fields
pub fn filesystem_type(sector: &Sector) -> Option<[u8; 8]> {
    let bpb = parse(sector)?;
    let offset = match bpb.fat_size_16() {
        0 => 0x52,
        _ => 0x36,
    };
    let mut tag = [0u8; 8];
    tag.copy_from_slice(&sector[offset..offset + 8]);
    Some(tag)
}
