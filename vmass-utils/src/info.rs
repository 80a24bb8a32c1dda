use std::fs;
use std::str::from_utf8;

use vmass::io::Sector;
use vmass::pages::{HeapProvider, HeapRegion};
use vmass::region::boot;
use vmass::types::SectorID;
use vmass::{Config, Disk};

use crate::{plan, Error};

pub fn open(image: &str) -> Result<Disk<HeapRegion>, Error> {
    let length = fs::metadata(image)?.len();
    let disk = Disk::new(&plan::fit(length), &mut HeapProvider::default(), Config::inline())?;
    disk.load_file(image)?;
    Ok(disk)
}

pub fn info(image: &str) -> Result<(), Error> {
    let disk = open(image)?;
    let dev_info = disk.dev_info();
    println!("Total sectors: {}", dev_info.total_sectors());
    println!("Sector size: {}", dev_info.sector_size());

    let mut sector: Sector = [0u8; 512];
    disk.read(SectorID::BOOT, &mut sector, 1)?;
    let bpb = boot::parse(&sector).ok_or(Error::NotFat)?;
    let filesystem_type = boot::filesystem_type(&sector).ok_or(Error::NotFat)?;
    println!("Filesystem: {}", from_utf8(&filesystem_type).unwrap_or("?").trim_end());
    println!("OEM name: {}", from_utf8(&bpb.oem_name).unwrap_or("?"));
    println!("Bytes per sector: {}", bpb.bytes_per_sector());
    println!("Sectors per cluster: {}", bpb.sectors_per_cluster);
    println!("Reserved sectors: {}", bpb.reserved_sectors());
    println!("Number of FATs: {}", bpb.number_of_fats);
    println!("Root entries: {}", bpb.root_entries());
    println!("Volume sectors: {}", bpb.total_sectors());
    if bpb.fat_size_16() > 0 {
        println!("FAT size: {}", bpb.fat_size_16());
    }
    Ok(())
}
