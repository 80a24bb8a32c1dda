use crate::error::Error;
use crate::io::{Sector, SECTOR_SIZE};
use crate::pages::Region;
use crate::region::boot::{Fat16BootSector, Fat32BootSector};
use crate::region::fsinfo::FsInfo;
use crate::types::SectorID;
use crate::Disk;

const FAT16_THRESHOLD: u64 = 16 * 1024 * 1024;

const FAT12_MARKER: [u8; 3] = hex!("F8 FF FF");
const FAT16_MARKER: [u8; 4] = hex!("F8 FF FF FF");
// Media, reserved and root directory end of chain
const FAT32_MARKER: [u8; 12] = hex!("F8 FF FF 0F FF FF FF 0F FF FF FF 0F");

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Layout {
    Fat12,
    Fat16,
    Fat32,
}

impl Layout {
    /// FAT16 from 16MiB upwards, FAT12 below
    pub fn select(disk_bytes: u64) -> Self {
        match disk_bytes >= FAT16_THRESHOLD {
            true => Self::Fat16,
            false => Self::Fat12,
        }
    }
}

fn marker_sector(marker: &[u8]) -> Sector {
    let mut sector = [0u8; SECTOR_SIZE];
    sector[..marker.len()].copy_from_slice(marker);
    sector
}

impl<R: Region + 'static> Disk<R> {
    /// Writes a FAT header fitting the live disk size
    pub fn initialize(&self) -> Result<Layout, Error> {
        let layout = Layout::select(self.size());
        self.format(layout)?;
        Ok(layout)
    }

    pub fn format(&self, layout: Layout) -> Result<(), Error> {
        let total_sectors = self.dev_info().total_sectors();
        debug!("Format {} sectors as {:?}", total_sectors, layout);
        let (boot_sector, marker) = match layout {
            Layout::Fat12 => (Fat16BootSector::fat12(total_sectors), &FAT12_MARKER[..]),
            Layout::Fat16 => (Fat16BootSector::fat16(total_sectors), &FAT16_MARKER[..]),
            Layout::Fat32 => return self.format_fat32(Fat32BootSector::fat32(total_sectors)),
        };
        self.format_fat16(boot_sector, marker)
    }

    fn format_fat16(&self, boot_sector: Fat16BootSector, marker: &[u8]) -> Result<(), Error> {
        let bpb = boot_sector.bpb();
        let (first, fat_size) = (bpb.reserved_sectors() as u64, bpb.fat_size_16() as u64);
        let fat = marker_sector(marker);
        self.write_batch(&[
            (SectorID::BOOT, boot_sector.as_bytes()),
            (SectorID::from(first), &fat),
            (SectorID::from(first + fat_size), &fat),
        ])
    }

    fn format_fat32(&self, boot_sector: Fat32BootSector) -> Result<(), Error> {
        let fsinfo = FsInfo::new(&boot_sector);
        debug!("FAT32 with {} free clusters", fsinfo.free_count());
        let first = boot_sector.bpb().reserved_sectors() as u64;
        let fat_size = boot_sector.fat_size_32() as u64;
        let fat = marker_sector(&FAT32_MARKER);
        self.write_batch(&[
            (SectorID::BOOT, boot_sector.as_bytes()),
            (SectorID::FSINFO, fsinfo.as_bytes()),
            (SectorID::BACKUP_BOOT, boot_sector.as_bytes()),
            (SectorID::from(first), &fat),
            (SectorID::from(first + fat_size), &fat),
        ])
    }
}
