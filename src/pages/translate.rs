//! Scatter/gather translation from logical sectors onto pages.

use core::ptr::{copy_nonoverlapping, NonNull};

use super::{PageTable, Region};
use crate::io::SECTOR_SIZE;
use crate::types::SectorID;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Disk to buffer
    Read,
    /// Buffer to disk
    Write,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Cursor {
    pub page: usize,
    pub offset: usize,
}

/// A contiguous piece of one page
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Span {
    pub page: usize,
    pub offset: usize,
    pub len: usize,
}

pub(crate) struct Spans<'a, R: Region> {
    table: &'a PageTable<R>,
    cursor: Cursor,
    remaining: usize,
}

impl<R: Region> Iterator for Spans<'_, R> {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        if self.remaining == 0 {
            return None;
        }
        let page = self.table.pages.get(self.cursor.page)?;
        let Cursor { page: index, offset } = self.cursor;
        let len = core::cmp::min(page.size - offset, self.remaining);
        self.remaining -= len;
        self.cursor = Cursor { page: index + 1, offset: 0 };
        Some(Span { page: index, offset, len })
    }
}

impl<R: Region> PageTable<R> {
    /// Locates the page holding logical byte `offset`
    pub(crate) fn seek(&self, mut offset: u64) -> Option<Cursor> {
        for (index, page) in self.pages.iter().enumerate() {
            if offset < page.size as u64 {
                return Some(Cursor { page: index, offset: offset as usize });
            }
            offset -= page.size as u64;
        }
        None
    }

    /// Splits logical byte range `offset..offset + len` at page boundaries,
    /// yields nothing past the last page
    pub(crate) fn spans(&self, offset: u64, len: usize) -> Spans<'_, R> {
        match self.seek(offset) {
            Some(cursor) => Spans { table: self, cursor, remaining: len },
            None => Spans { table: self, cursor: Cursor::default(), remaining: 0 },
        }
    }

    /// # Safety
    ///
    /// Caller guarantees the span is not accessed by anyone else meanwhile
    pub(crate) unsafe fn span_mut(&self, span: Span) -> &mut [u8] {
        let base = self.pages[span.page].region.as_ptr().as_ptr();
        core::slice::from_raw_parts_mut(base.add(span.offset), span.len)
    }

    /// Copies `count` sectors starting at `id` between the pages and `buffer`
    ///
    /// # Safety
    ///
    /// * The sector range lies within the table
    /// * `buffer` is valid for `count` sectors, writable when reading
    /// * No one else touches the sector range nor `buffer` meanwhile
    pub(crate) unsafe fn translate(
        &self,
        id: SectorID,
        count: u32,
        buffer: NonNull<u8>,
        direction: Direction,
    ) {
        let total = count as usize * SECTOR_SIZE;
        let mut buffer = buffer.as_ptr();
        let mut copied = 0;
        for span in self.spans(id.offset(), total) {
            let page = self.pages[span.page].region.as_ptr().as_ptr().add(span.offset);
            match direction {
                Direction::Read => copy_nonoverlapping(page as *const u8, buffer, span.len),
                Direction::Write => copy_nonoverlapping(buffer as *const u8, page, span.len),
            }
            buffer = buffer.add(span.len);
            copied += span.len;
        }
        debug_assert_eq!(copied, total, "sector range {}+{} beyond pages", id, count);
    }
}
