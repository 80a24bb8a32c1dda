use displaydoc::Display;
use thiserror::Error;

use crate::types::{MemoryKind, SectorID};

#[derive(Debug, Display, Error)]
pub enum AllocationError {
    /// Page {index}: provider could not supply {size} bytes of kind {kind}
    Exhausted { index: usize, kind: MemoryKind, size: usize },
    /// Page {index}: size {size} is zero or not a whole number of sectors
    Size { index: usize, size: usize },
    /// Allocation plan exceeds {0} pages
    TooManyPages(usize),
}

#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum RangeError {
    /// Empty transfer request
    Empty,
    /// Sectors {start}+{count} beyond disk of {total} sectors
    OutOfBounds { start: SectorID, count: u32, total: u64 },
    /// Buffer of {len} bytes cannot hold {count} sectors
    Buffer { len: usize, count: u32 },
}

#[derive(Debug, Display, Error)]
pub enum Error {
    /// Allocation: {0}
    Allocation(#[from] AllocationError),
    /// Range: {0}
    Range(#[from] RangeError),
    /// IO worker could not be started: {0}
    #[cfg(feature = "std")]
    Initialization(#[source] std::io::Error),
    /// IO worker exited unexpectedly
    WorkerGone,
    /// Image of {image} bytes exceeds disk of {disk} bytes
    ImageTooLarge { image: u64, disk: u64 },
    /// IO: {0}
    #[cfg(feature = "std")]
    IO(#[from] std::io::Error),
}
