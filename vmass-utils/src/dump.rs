use pretty_hex::pretty_hex;
use vmass::error::RangeError;
use vmass::io::{Sector, SECTOR_SIZE};
use vmass::types::SectorID;

use crate::info::open;
use crate::Error;

fn check(total: u32, sector: u64, count: u32) -> Result<(), Error> {
    let error = match (count, sector.checked_add(count as u64)) {
        (0, _) => RangeError::Empty,
        (_, Some(end)) if end <= total as u64 => return Ok(()),
        _ => RangeError::OutOfBounds { start: sector.into(), count, total: total as u64 },
    };
    Err(vmass::error::Error::from(error).into())
}

pub fn dump(image: &str, sector: u64, count: u32) -> Result<(), Error> {
    let disk = open(image)?;
    check(disk.dev_info().total_sectors(), sector, count)?;
    let mut buf: Sector = [0u8; SECTOR_SIZE];
    for id in sector..sector + count as u64 {
        disk.read(SectorID::from(id), &mut buf, 1)?;
        println!("Sector {}", id);
        println!("{}", pretty_hex(&buf));
    }
    Ok(())
}
