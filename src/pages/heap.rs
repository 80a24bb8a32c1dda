use alloc::boxed::Box;
use alloc::vec;
use core::ptr::NonNull;

use displaydoc::Display;

use super::{Provider, Region};
use crate::types::{MemoryKind, PhysicalAddress};

/// Zero filled block on the global heap
pub struct HeapRegion {
    ptr: NonNull<u8>,
    len: usize,
}

// Only the page table touches the bytes, always under the disk lock
unsafe impl Send for HeapRegion {}
unsafe impl Sync for HeapRegion {}

impl Region for HeapRegion {
    fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl Drop for HeapRegion {
    fn drop(&mut self) {
        let slice = core::ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.len);
        drop(unsafe { Box::from_raw(slice) })
    }
}

#[derive(Debug, Display)]
pub enum HeapError {
    /// Budget of {limit} bytes exhausted
    Budget { limit: usize },
}

/// Hosted stand-in for a physical memory provider.
///
/// Memory kinds and pinned addresses are accepted but not honored.
#[derive(Debug, Default)]
pub struct HeapProvider {
    limit: Option<usize>,
    allocated: usize,
}

impl HeapProvider {
    /// Never hands out more than `limit` bytes in total
    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit), allocated: 0 }
    }
}

impl Provider for HeapProvider {
    type Region = HeapRegion;
    type Error = HeapError;

    fn allocate(
        &mut self,
        kind: MemoryKind,
        address: Option<PhysicalAddress>,
        size: usize,
    ) -> Result<HeapRegion, HeapError> {
        if let Some(limit) = self.limit {
            if self.allocated + size > limit {
                return Err(HeapError::Budget { limit });
            }
        }
        if let Some(address) = address {
            debug!("Ignore pinned address {} for kind {}", address, kind);
        }
        let boxed = vec![0u8; size].into_boxed_slice();
        let len = boxed.len();
        let ptr = NonNull::new(Box::into_raw(boxed) as *mut u8).unwrap_or(NonNull::dangling());
        self.allocated += size;
        Ok(HeapRegion { ptr, len })
    }
}
