//! Backing image, a flat file of sectors loaded into or saved from the pages.

use std::fs;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::SECTOR_SIZE;
use crate::error::Error;
use crate::pages::Region;
use crate::sync::acquire;
use crate::Disk;

impl<R: Region + 'static> Disk<R> {
    /// Copies `length` bytes of image into the disk and shrinks or grows the
    /// live disk size to match. A trailing partial sector is kept for
    /// `save_image` but not addressable by sector reads and writes.
    pub fn load_image<T: Read>(&self, mut reader: T, length: u64) -> Result<(), Error> {
        let capacity = self.pages.size();
        if length > capacity {
            warn!("Image of {} bytes exceeds disk of {} bytes", length, capacity);
            return Err(Error::ImageTooLarge { image: length, disk: capacity });
        }
        if length % SECTOR_SIZE as u64 != 0 {
            debug!("Image ends {} bytes into its last sector", length % SECTOR_SIZE as u64);
        }
        let mut state = acquire!(self.state);
        // Never beyond capacity, which is addressable memory
        for span in self.pages.spans(0, length as usize) {
            reader.read_exact(unsafe { self.pages.span_mut(span) })?;
        }
        if length != state.size {
            debug!("Live disk size {:#X} -> {:#X}", state.size, length);
        }
        state.size = length;
        Ok(())
    }

    /// Streams the live disk content
    pub fn save_image<T: Write>(&self, mut writer: T) -> Result<(), Error> {
        let state = acquire!(self.state);
        for span in self.pages.spans(0, state.size as usize) {
            writer.write_all(unsafe { self.pages.span_mut(span) })?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = fs::File::open(path.as_ref())?;
        let length = file.metadata()?.len();
        debug!("Load image {} of {} bytes", path.as_ref().display(), length);
        self.load_image(BufReader::new(file), length)
    }

    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = fs::File::create(path.as_ref())?;
        debug!("Save image {}", path.as_ref().display());
        self.save_image(BufWriter::new(file))
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use crate::error::{Error, RangeError};
    use crate::io::SECTOR_SIZE;
    use crate::pages::{HeapProvider, HeapRegion, PageSpec};
    use crate::types::{MemoryKind, SectorID};
    use crate::{Config, Disk};

    fn disk() -> Disk<HeapRegion> {
        let kind = MemoryKind::new(0x40408006);
        let plan = [PageSpec::new(kind, 3 * SECTOR_SIZE), PageSpec::new(kind, 5 * SECTOR_SIZE)];
        Disk::new(&plan, &mut HeapProvider::default(), Config::default()).unwrap()
    }

    fn image(sectors: usize) -> Vec<u8> {
        (0..sectors * SECTOR_SIZE).map(|i| (i / SECTOR_SIZE) as u8 + 1).collect()
    }

    #[test]
    fn test_load_shrinks_disk() {
        let disk = disk();
        let data = image(4);
        disk.load_image(Cursor::new(&data), data.len() as u64).unwrap();
        assert_eq!(disk.size(), 4 * SECTOR_SIZE as u64);
        assert_eq!(disk.capacity(), 8 * SECTOR_SIZE as u64);
        assert_eq!(disk.dev_info().total_sectors(), 4);

        let mut buf = vec![0u8; 4 * SECTOR_SIZE];
        disk.read(SectorID::BOOT, &mut buf, 4).unwrap();
        assert_eq!(buf, data);
        assert!(disk.read(SectorID::from(4), &mut buf, 1).is_err());
    }

    #[test]
    fn test_partial_sector_roundtrip() {
        let disk = disk();
        let mut data = image(3);
        data.extend_from_slice(&[0xFF; 100]);
        disk.load_image(Cursor::new(&data), data.len() as u64).unwrap();
        assert_eq!(disk.size(), 3 * SECTOR_SIZE as u64 + 100);
        assert_eq!(disk.dev_info().total_sectors(), 3);

        // Partial sector is not addressable
        let mut buf = vec![0u8; SECTOR_SIZE];
        disk.read(SectorID::from(2), &mut buf, 1).unwrap();
        let result = disk.read(SectorID::from(3), &mut buf, 1);
        assert!(matches!(result, Err(Error::Range(RangeError::OutOfBounds { total: 3, .. }))));

        let mut saved = Vec::new();
        disk.save_image(&mut saved).unwrap();
        assert_eq!(saved.len(), data.len());
        assert_eq!(saved, data);
    }

    #[test]
    fn test_load_too_large() {
        let disk = disk();
        let data = image(9);
        let result = disk.load_image(Cursor::new(&data), data.len() as u64);
        assert!(matches!(result, Err(Error::ImageTooLarge { image: 4608, disk: 4096 })));
        assert_eq!(disk.size(), 8 * SECTOR_SIZE as u64);
    }

    #[test]
    fn test_short_stream() {
        let disk = disk();
        let data = image(2);
        let result = disk.load_image(Cursor::new(&data), 6 * SECTOR_SIZE as u64);
        assert!(matches!(result, Err(Error::IO(_))));
        assert_eq!(disk.size(), 8 * SECTOR_SIZE as u64);
    }

    #[test]
    fn test_save_image() {
        let disk = disk();
        let data = image(8);
        disk.write(SectorID::BOOT, &data, 8).unwrap();
        let mut saved = Vec::new();
        disk.save_image(&mut saved).unwrap();
        assert_eq!(saved, data);

        disk.load_image(Cursor::new(&data[..1024]), 1024).unwrap();
        saved.clear();
        disk.save_image(&mut saved).unwrap();
        assert_eq!(saved, data[..1024]);
    }
}
