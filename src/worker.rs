//! Background thread performing the offloaded half of split transfers.
//!
//! Requests are only ever sent while the disk lock is held, so at most
//! one request is in flight and its range is disjoint from the one the
//! caller copies meanwhile. Hosted threads get no priority boost.

use alloc::sync::Arc;
use core::ptr::NonNull;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::error::{Error, RangeError};
use crate::io::SECTOR_SIZE;
use crate::pages::translate::Direction;
use crate::pages::{PageTable, Region};
use crate::types::SectorID;

pub(crate) struct Buffer(NonNull<u8>);

// Points into a caller buffer kept alive until the request completes
unsafe impl Send for Buffer {}

pub(crate) enum Request {
    Read { id: SectorID, count: u32, buffer: Buffer },
    Write { id: SectorID, count: u32, buffer: Buffer },
    Stop,
}

impl Request {
    /// # Safety
    ///
    /// `ptr` is valid for `count` sectors until the request completes
    pub(crate) unsafe fn new(
        direction: Direction,
        id: SectorID,
        count: u32,
        ptr: NonNull<u8>,
    ) -> Self {
        let buffer = Buffer(ptr);
        match direction {
            Direction::Read => Self::Read { id, count, buffer },
            Direction::Write => Self::Write { id, count, buffer },
        }
    }
}

pub(crate) struct Worker {
    requests: Sender<Request>,
    done: Receiver<Result<(), RangeError>>,
    handle: Option<JoinHandle<()>>,
}

/// Waits for the worker even if the caller bails out early,
/// the worker may still be touching the caller's buffer
pub(crate) struct InFlight<'a> {
    worker: &'a Worker,
    waited: bool,
}

impl InFlight<'_> {
    pub(crate) fn wait(mut self) -> Result<(), Error> {
        self.waited = true;
        self.worker.wait()
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.waited {
            self.worker.wait().ok();
        }
    }
}

impl Worker {
    pub(crate) fn spawn<R: Region + 'static>(pages: Arc<PageTable<R>>) -> std::io::Result<Self> {
        let (requests, receiver) = mpsc::channel();
        let (sender, done) = mpsc::channel();
        let builder = thread::Builder::new().name("vmass-io".into());
        let handle = builder.spawn(move || run(pages, receiver, sender))?;
        debug!("IO worker started");
        Ok(Self { requests, done, handle: Some(handle) })
    }

    /// Hands a request over, `None` when the worker is gone
    ///
    /// # Safety
    ///
    /// The request buffer must not be touched by anyone else
    /// until the returned guard is waited or dropped
    pub(crate) unsafe fn dispatch(&self, request: Request) -> Option<InFlight<'_>> {
        match self.requests.send(request) {
            Ok(_) => Some(InFlight { worker: self, waited: false }),
            Err(_) => None,
        }
    }

    fn wait(&self) -> Result<(), Error> {
        match self.done.recv() {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::WorkerGone),
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if self.requests.send(Request::Stop).is_ok() {
            self.done.recv().ok();
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("IO worker panicked");
            }
        }
        debug!("IO worker stopped");
    }
}

fn check<R: Region>(pages: &PageTable<R>, id: SectorID, count: u32) -> Result<(), RangeError> {
    if count == 0 {
        return Err(RangeError::Empty);
    }
    let bytes = count as u64 * SECTOR_SIZE as u64;
    match u64::from(id).checked_mul(SECTOR_SIZE as u64).and_then(|start| start.checked_add(bytes)) {
        Some(end) if end <= pages.size() => Ok(()),
        _ => {
            let total = pages.size() / SECTOR_SIZE as u64;
            Err(RangeError::OutOfBounds { start: id, count, total })
        }
    }
}

fn run<R: Region>(
    pages: Arc<PageTable<R>>,
    requests: Receiver<Request>,
    done: Sender<Result<(), RangeError>>,
) {
    for request in requests.iter() {
        let (id, count, buffer, direction) = match request {
            Request::Read { id, count, buffer } => (id, count, buffer, Direction::Read),
            Request::Write { id, count, buffer } => (id, count, buffer, Direction::Write),
            Request::Stop => {
                done.send(Ok(())).ok();
                break;
            }
        };
        trace!("IO worker {:?} sectors {}+{}", direction, id, count);
        let result = check(&pages, id, count);
        if result.is_ok() {
            unsafe { pages.translate(id, count, buffer.0, direction) };
        }
        if done.send(result).is_err() {
            break;
        }
    }
    trace!("IO worker exits");
}

#[cfg(test)]
mod test {
    use alloc::sync::Arc;
    use core::ptr::NonNull;

    use super::{Request, Worker};
    use crate::error::{Error, RangeError};
    use crate::pages::translate::Direction;
    use crate::pages::{HeapProvider, PageSpec, PageTable};
    use crate::types::{MemoryKind, SectorID};

    #[test]
    fn test_offloaded_write_then_read() {
        let kind = MemoryKind::new(1);
        let plan = [PageSpec::new(kind, 2048), PageSpec::new(kind, 1024)];
        let pages = Arc::new(PageTable::allocate(&plan, &mut HeapProvider::default()).unwrap());
        let worker = Worker::spawn(pages.clone()).unwrap();

        let data = [0x5Au8; 1536];
        let ptr = NonNull::new(data.as_ptr() as *mut u8).unwrap();
        let request = unsafe { Request::new(Direction::Write, SectorID::from(3), 3, ptr) };
        unsafe { worker.dispatch(request) }.unwrap().wait().unwrap();

        let mut readback = [0u8; 1536];
        let ptr = NonNull::new(readback.as_mut_ptr()).unwrap();
        let request = unsafe { Request::new(Direction::Read, SectorID::from(3), 3, ptr) };
        unsafe { worker.dispatch(request) }.unwrap().wait().unwrap();
        assert_eq!(readback, data);
    }

    #[test]
    fn test_out_of_range_is_reported() {
        let plan = [PageSpec::new(MemoryKind::new(1), 1024)];
        let pages = Arc::new(PageTable::allocate(&plan, &mut HeapProvider::default()).unwrap());
        let worker = Worker::spawn(pages).unwrap();
        let mut buffer = [0u8; 1024];
        let ptr = NonNull::new(buffer.as_mut_ptr()).unwrap();
        let request = unsafe { Request::new(Direction::Read, SectorID::from(1), 2, ptr) };
        let result = unsafe { worker.dispatch(request) }.unwrap().wait();
        assert!(matches!(result, Err(Error::Range(RangeError::OutOfBounds { .. }))));

        let request = unsafe { Request::new(Direction::Read, SectorID::from(u64::MAX), 1, ptr) };
        let result = unsafe { worker.dispatch(request) }.unwrap().wait();
        assert!(matches!(result, Err(Error::Range(RangeError::OutOfBounds { .. }))));

        let request = unsafe { Request::new(Direction::Read, SectorID::BOOT, 0, ptr) };
        let result = unsafe { worker.dispatch(request) }.unwrap().wait();
        assert!(matches!(result, Err(Error::Range(RangeError::Empty))));
        assert!(buffer.iter().all(|&b| b == 0));
        drop(worker);
    }
}
