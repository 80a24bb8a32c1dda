#![doc = include_str!("../README.md")]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

#[macro_use]
extern crate hex_literal;
#[macro_use]
extern crate log;

pub mod config;
mod endian;
pub mod error;
pub mod format;
pub mod io;
pub mod pages;
pub mod region;
mod split;
pub(crate) mod sync;
pub mod types;
#[cfg(feature = "std")]
mod worker;

use alloc::sync::Arc;
use core::ptr::NonNull;

pub use config::Config;
use error::{Error, RangeError};
pub use format::Layout;
use io::{DevInfo, MassStorage, Sector, SECTOR_SIZE};
pub use pages::{HeapProvider, PageSpec, PageTable, Provider, Region};
use pages::translate::Direction;
use split::{Coordinator, Transfer};
use sync::{acquire, Mutex};
use types::SectorID;

struct State {
    // Live size in bytes, exact length of a loaded image which may end mid-sector
    size: u64,
    coordinator: Coordinator,
}

impl State {
    fn check(&self, id: SectorID, count: u32, len: usize) -> Result<(), RangeError> {
        if count == 0 {
            return Err(RangeError::Empty);
        }
        let bytes = count as u64 * SECTOR_SIZE as u64;
        if (len as u64) < bytes {
            return Err(RangeError::Buffer { len, count });
        }
        let start = u64::from(id).checked_mul(SECTOR_SIZE as u64);
        match start.and_then(|start| start.checked_add(bytes)) {
            Some(end) if end <= self.size => Ok(()),
            _ => {
                let total = self.size / SECTOR_SIZE as u64;
                Err(RangeError::OutOfBounds { start: id, count, total })
            }
        }
    }
}

/// Virtual disk over a list of scattered memory pages.
///
/// Every operation takes the one disk lock, share the disk between
/// threads with an `Arc`.
pub struct Disk<R: Region> {
    // Drops first, stopping the IO worker before the pages go away
    state: Mutex<State>,
    pages: Arc<PageTable<R>>,
}

impl<R: Region + 'static> Disk<R> {
    pub fn new<P>(plan: &[PageSpec], provider: &mut P, config: Config) -> Result<Self, Error>
    where
        P: Provider<Region = R>,
    {
        let pages = Arc::new(PageTable::allocate(plan, provider)?);
        let coordinator = Coordinator::new(config, &pages)?;
        let size = pages.size();
        debug!("Disk of {:#X} bytes over {} pages, {:?}", size, pages.len(), config);
        Ok(Self { state: Mutex::new(State { size, coordinator }), pages })
    }

    /// Live disk size in bytes
    pub fn size(&self) -> u64 {
        acquire!(self.state).size
    }

    /// Allocated size in bytes, what the disk may grow back to
    pub fn capacity(&self) -> u64 {
        self.pages.size()
    }

    pub fn dev_info(&self) -> DevInfo {
        let total_sectors = self.size() / SECTOR_SIZE as u64;
        DevInfo::new(u32::try_from(total_sectors).unwrap_or(u32::MAX))
    }

    /// Reads `count` sectors starting at `id` into the head of `buf`
    pub fn read(&self, id: SectorID, buf: &mut [u8], count: u32) -> Result<(), Error> {
        let buffer = NonNull::new(buf.as_mut_ptr()).unwrap_or(NonNull::dangling());
        self.transfer(id, count, buffer, buf.len(), Direction::Read)
    }

    /// Writes `count` sectors starting at `id` from the head of `buf`
    pub fn write(&self, id: SectorID, buf: &[u8], count: u32) -> Result<(), Error> {
        // Never written through on this direction
        let buffer = NonNull::new(buf.as_ptr() as *mut u8).unwrap_or(NonNull::dangling());
        self.transfer(id, count, buffer, buf.len(), Direction::Write)
    }

    fn transfer(
        &self,
        id: SectorID,
        count: u32,
        buffer: NonNull<u8>,
        len: usize,
        direction: Direction,
    ) -> Result<(), Error> {
        let state = acquire!(self.state);
        if let Err(error) = state.check(id, count, len) {
            debug!("Reject {:?} sectors {}+{}: {}", direction, id, count, error);
            return Err(error.into());
        }
        trace!("{:?} sectors {}+{}", direction, id, count);
        let transfer = Transfer { id, count, buffer, direction };
        unsafe { state.coordinator.execute(&self.pages, transfer) }
    }

    /// Writes single sectors under one lock, nothing is written unless all of them fit
    pub(crate) fn write_batch(&self, batch: &[(SectorID, &Sector)]) -> Result<(), Error> {
        let state = acquire!(self.state);
        for &(id, sector) in batch {
            if let Err(error) = state.check(id, 1, sector.len()) {
                debug!("Reject batch of {} sectors: {}", batch.len(), error);
                return Err(error.into());
            }
        }
        for &(id, sector) in batch {
            trace!("Batch write sector {}", id);
            let buffer = NonNull::from(sector).cast::<u8>();
            let transfer = Transfer { id, count: 1, buffer, direction: Direction::Write };
            unsafe { state.coordinator.execute(&self.pages, transfer)? };
        }
        Ok(())
    }
}

impl<R: Region + 'static> MassStorage for Disk<R> {
    fn dev_info(&self) -> DevInfo {
        Disk::dev_info(self)
    }

    fn read_sectors(&self, id: SectorID, buf: &mut [u8], count: u32) -> Result<(), Error> {
        self.read(id, buf, count)
    }

    fn write_sectors(&self, id: SectorID, buf: &[u8], count: u32) -> Result<(), Error> {
        self.write(id, buf, count)
    }
}

impl<R: Region> Drop for Disk<R> {
    fn drop(&mut self) {
        debug!("Tear down disk of {} pages", self.pages.len());
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::thread;

    use super::{Config, Disk, HeapProvider, PageSpec};
    use crate::error::{AllocationError, Error, RangeError};
    use crate::io::{MassStorage, SECTOR_SIZE};
    use crate::pages::HeapRegion;
    use crate::types::{MemoryKind, SectorID};

    const KIND: MemoryKind = MemoryKind::new(0x40408006);

    // Unequal pages, 10 + 4 + 2 + 1 sectors scaled by 64
    fn plan() -> [PageSpec; 4] {
        [10, 4, 2, 1].map(|sectors| PageSpec::new(KIND, sectors * 64 * SECTOR_SIZE))
    }

    fn disk(config: Config) -> Disk<HeapRegion> {
        Disk::new(&plan(), &mut HeapProvider::default(), config).unwrap()
    }

    fn pattern(seed: u8, len: usize) -> Vec<u8> {
        (0..len).map(|i| seed.wrapping_mul(31).wrapping_add((i % 509) as u8)).collect()
    }

    #[test]
    fn test_dev_info() {
        let disk = disk(Config::default());
        let info = disk.dev_info();
        let sum: usize = plan().iter().map(|spec| spec.size).sum();
        assert_eq!(info.total_sectors() as u64 * SECTOR_SIZE as u64, disk.size());
        assert_eq!(disk.size(), sum as u64);
        assert_eq!(info.sector_size(), 512);
        assert_eq!(MassStorage::dev_info(&disk), info);
    }

    #[test]
    fn test_write_then_read() {
        let disk = disk(Config::default());
        let total = disk.dev_info().total_sectors();
        for &(start, count) in &[(0, 1), (639, 2), (600, 300), (1, total - 1), (total - 1, 1)] {
            let data = pattern(start as u8, count as usize * SECTOR_SIZE);
            disk.write(SectorID::from(start as u64), &data, count).unwrap();
            let mut readback = vec![0u8; data.len()];
            disk.read(SectorID::from(start as u64), &mut readback, count).unwrap();
            assert_eq!(readback, data, "sectors {}+{}", start, count);
        }
    }

    #[test]
    fn test_range_errors() {
        let disk = disk(Config::default());
        let total = disk.dev_info().total_sectors();
        let data = pattern(7, 4 * SECTOR_SIZE);
        disk.write(SectorID::from(total as u64 - 4), &data, 4).unwrap();

        let mut buf = vec![0xEEu8; 4 * SECTOR_SIZE];
        let cases = [(total as u64 - 3, 4), (total as u64, 1), (u64::MAX, 1), (0, 0)];
        for (start, count) in cases {
            match disk.read(SectorID::from(start), &mut buf, count) {
                Err(Error::Range(_)) => (),
                other => panic!("sectors {}+{}: {:?}", start, count, other),
            }
            assert!(buf.iter().all(|&b| b == 0xEE));
            let result = disk.write(SectorID::from(start), &buf, count);
            assert!(matches!(result, Err(Error::Range(_))));
        }
        let result = disk.read(SectorID::BOOT, &mut buf, 5);
        assert!(matches!(result, Err(Error::Range(RangeError::Buffer { count: 5, .. }))));

        let mut readback = vec![0u8; data.len()];
        disk.read(SectorID::from(total as u64 - 4), &mut readback, 4).unwrap();
        assert_eq!(readback, data);
    }

    #[test]
    fn test_split_equals_inline() {
        let split = disk(Config { read_threshold: 1, write_threshold: 1, ..Default::default() });
        let inline = disk(Config::inline());
        let total = split.dev_info().total_sectors();
        let data = pattern(3, total as usize * SECTOR_SIZE);
        for (start, count) in [(0u64, total), (5, 77), (630, 15), (1000, 3)] {
            let offset = start as usize * SECTOR_SIZE;
            let chunk = &data[offset..offset + count as usize * SECTOR_SIZE];
            split.write(SectorID::from(start), chunk, count).unwrap();
            inline.write(SectorID::from(start), chunk, count).unwrap();
        }
        let mut left = vec![0u8; data.len()];
        let mut right = vec![0u8; data.len()];
        split.read(SectorID::BOOT, &mut left, total).unwrap();
        inline.read(SectorID::BOOT, &mut right, total).unwrap();
        assert_eq!(left, right);
        assert_eq!(left, data);
    }

    #[test]
    fn test_concurrent_callers_never_interleave() {
        let config = Config { read_threshold: 2, write_threshold: 2, ..Default::default() };
        let disk = Arc::new(disk(config));
        let count = 128u32;
        let handles: Vec<_> = (0..4u8)
            .map(|index| {
                let disk = disk.clone();
                thread::spawn(move || {
                    // Each thread owns sectors index * 256 .. index * 256 + 256
                    let mut readback = vec![0u8; count as usize * SECTOR_SIZE];
                    for round in 0..50u64 {
                        let canary = vec![(index << 6) | (round as u8 & 0x3F); readback.len()];
                        let id = SectorID::from(index as u64 * 256 + round % 2 * 128);
                        disk.write(id, &canary, count).unwrap();
                        disk.read(id, &mut readback, count).unwrap();
                        assert!(readback == canary, "thread {} round {} at {}", index, round, id);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_allocation_failure() {
        let mut provider = HeapProvider::with_limit(SECTOR_SIZE * 64 * 12);
        match Disk::new(&plan(), &mut provider, Config::default()) {
            Err(Error::Allocation(AllocationError::Exhausted { index: 1, .. })) => (),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("allocation should fail"),
        }
    }
}
