//! Backing memory of the virtual disk.
//!
//! The logical disk is the concatenation, in plan order, of every page
//! handed out by a [`Provider`]. Pages never move nor resize once allocated.

mod heap;
pub(crate) mod translate;

use core::fmt::Debug;
use core::ptr::NonNull;

use crate::error::AllocationError;
use crate::io::SECTOR_SIZE;
use crate::types::{MemoryKind, PhysicalAddress};

pub use heap::{HeapError, HeapProvider, HeapRegion};

pub const MAX_PAGES: usize = 32;

/// A memory block exclusively owned by the disk, released on drop
pub trait Region: Send + Sync {
    /// Base of the block, valid for [`len`](Self::len) bytes while the region lives
    fn as_ptr(&self) -> NonNull<u8>;
    fn len(&self) -> usize;
}

pub trait Provider {
    type Region: Region;
    type Error: Debug;

    /// `address`, when given, pins the block at a physical address
    fn allocate(
        &mut self,
        kind: MemoryKind,
        address: Option<PhysicalAddress>,
        size: usize,
    ) -> Result<Self::Region, Self::Error>;
}

/// One entry of an allocation plan
#[derive(Copy, Clone, Debug)]
pub struct PageSpec {
    pub kind: MemoryKind,
    pub address: Option<PhysicalAddress>,
    pub size: usize,
    /// Pinned block already holds meaningful content, don't zero it
    pub keep_contents: bool,
}

impl PageSpec {
    pub fn new(kind: MemoryKind, size: usize) -> Self {
        Self { kind, address: None, size, keep_contents: false }
    }

    pub fn pinned(kind: MemoryKind, address: PhysicalAddress, size: usize) -> Self {
        Self { kind, address: Some(address), size, keep_contents: false }
    }

    pub fn keep_contents(self) -> Self {
        Self { keep_contents: true, ..self }
    }
}

pub(crate) struct Page<R> {
    region: R,
    size: usize,
}

impl<R: Region> Page<R> {
    fn zero(&mut self) {
        unsafe { core::ptr::write_bytes(self.region.as_ptr().as_ptr(), 0, self.size) }
    }
}

pub struct PageTable<R: Region> {
    pages: heapless::Vec<Page<R>, MAX_PAGES>,
    size: u64,
}

impl<R: Region> PageTable<R> {
    pub fn allocate<P>(plan: &[PageSpec], provider: &mut P) -> Result<Self, AllocationError>
    where
        P: Provider<Region = R>,
    {
        if plan.len() > MAX_PAGES {
            return Err(AllocationError::TooManyPages(MAX_PAGES));
        }
        // Dropping a partially built table releases what has been acquired so far
        let mut table = Self { pages: heapless::Vec::new(), size: 0 };
        for (index, spec) in plan.iter().enumerate() {
            let (kind, size) = (spec.kind, spec.size);
            if size == 0 || size % SECTOR_SIZE != 0 {
                return Err(AllocationError::Size { index, size });
            }
            let region = match provider.allocate(kind, spec.address, size) {
                Ok(region) if region.len() >= size => region,
                Ok(region) => {
                    warn!("Page {} short, {} of {} bytes", index, region.len(), size);
                    return Err(AllocationError::Exhausted { index, kind, size });
                }
                Err(e) => {
                    warn!("Page {} of kind {} failed: {:?}", index, kind, e);
                    return Err(AllocationError::Exhausted { index, kind, size });
                }
            };
            let mut page = Page { region, size };
            if spec.address.is_some() && !spec.keep_contents {
                page.zero();
            }
            if table.pages.push(page).is_err() {
                return Err(AllocationError::TooManyPages(MAX_PAGES));
            }
            table.size += size as u64;
            debug!("Page {} kind {} size {:#X}, disk size {:#X}", index, kind, size, table.size);
        }
        Ok(table)
    }

    /// Release every page, last allocated first
    pub fn free(self) {
        drop(self)
    }

    /// Sum of all page sizes in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.pages.iter().map(|page| page.size)
    }
}

impl<R: Region> Drop for PageTable<R> {
    fn drop(&mut self) {
        while let Some(page) = self.pages.pop() {
            trace!("Release page {} size {:#X}", self.pages.len(), page.size);
            drop(page);
        }
    }
}
