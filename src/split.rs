use core::ptr::NonNull;

use crate::config::Config;
use crate::error::Error;
#[cfg(feature = "std")]
use crate::io::SECTOR_SIZE;
use crate::pages::translate::Direction;
use crate::pages::{PageTable, Region};
use crate::types::SectorID;
#[cfg(feature = "std")]
use crate::worker::{Request, Worker};

/// A validated transfer, buffer holds at least `count` sectors
#[derive(Copy, Clone, Debug)]
pub(crate) struct Transfer {
    pub id: SectorID,
    pub count: u32,
    pub buffer: NonNull<u8>,
    pub direction: Direction,
}

/// Splits large transfers between the calling thread and the IO worker.
///
/// Lives inside the disk lock, which is what keeps a single request
/// in flight.
pub(crate) struct Coordinator {
    config: Config,
    #[cfg(feature = "std")]
    worker: Option<Worker>,
}

impl Coordinator {
    #[cfg(feature = "std")]
    pub(crate) fn new<R: Region + 'static>(
        config: Config,
        pages: &alloc::sync::Arc<PageTable<R>>,
    ) -> Result<Self, Error> {
        let worker = match config.offload {
            true => Some(Worker::spawn(pages.clone()).map_err(Error::Initialization)?),
            false => None,
        };
        Ok(Self { config, worker })
    }

    #[cfg(not(feature = "std"))]
    pub(crate) fn new<R: Region + 'static>(
        config: Config,
        _pages: &alloc::sync::Arc<PageTable<R>>,
    ) -> Result<Self, Error> {
        Ok(Self { config })
    }

    #[cfg_attr(not(feature = "std"), allow(dead_code))]
    fn threshold(&self, direction: Direction) -> u32 {
        match direction {
            Direction::Read => self.config.read_threshold,
            Direction::Write => self.config.write_threshold,
        }
    }

    /// # Safety
    ///
    /// Caller holds the disk lock and `transfer` is within the pages
    pub(crate) unsafe fn execute<R: Region>(
        &self,
        pages: &PageTable<R>,
        transfer: Transfer,
    ) -> Result<(), Error> {
        if let Some(result) = self.split(pages, transfer) {
            return result;
        }
        let Transfer { id, count, buffer, direction } = transfer;
        pages.translate(id, count, buffer, direction);
        Ok(())
    }

    /// Caller copies the first half while the worker copies the rest,
    /// `None` when the transfer isn't worth splitting
    #[cfg(feature = "std")]
    unsafe fn split<R: Region>(
        &self,
        pages: &PageTable<R>,
        transfer: Transfer,
    ) -> Option<Result<(), Error>> {
        let Transfer { id, count, buffer, direction } = transfer;
        let worker = self.worker.as_ref()?;
        let (half, remainder) = (count / 2, count % 2);
        if half == 0 || half < self.threshold(direction) {
            return None;
        }
        let second = NonNull::new_unchecked(buffer.as_ptr().add(half as usize * SECTOR_SIZE));
        let request = Request::new(direction, id + half, half + remainder, second);
        let in_flight = match worker.dispatch(request) {
            Some(in_flight) => in_flight,
            None => {
                warn!("IO worker gone, transfer {}+{} done inline", id, count);
                return None;
            }
        };
        trace!("Split {:?} {}+{} at {}", direction, id, count, half);
        pages.translate(id, half, buffer, direction);
        Some(in_flight.wait())
    }

    #[cfg(not(feature = "std"))]
    unsafe fn split<R: Region>(
        &self,
        _pages: &PageTable<R>,
        _transfer: Transfer,
    ) -> Option<Result<(), Error>> {
        None
    }
}
