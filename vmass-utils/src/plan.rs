use vmass::types::MemoryKind;
use vmass::PageSpec;

use crate::Error;

const KIND: MemoryKind = MemoryKind::new(0);

fn parse_size(text: &str) -> Option<usize> {
    let text = text.trim();
    let (digits, shift) = match text.char_indices().last()? {
        (i, 'K' | 'k') => (&text[..i], 10),
        (i, 'M' | 'm') => (&text[..i], 20),
        (i, 'G' | 'g') => (&text[..i], 30),
        _ => (text, 0),
    };
    digits.parse::<usize>().ok()?.checked_mul(1 << shift)
}

/// Parses page sizes like `10M,4M,512K` into an allocation plan
pub fn parse(text: &str) -> Result<Vec<PageSpec>, Error> {
    text.split(',')
        .map(|size| match parse_size(size) {
            Some(size) => Ok(PageSpec::new(KIND, size)),
            None => Err(Error::Size(size.into())),
        })
        .collect()
}

/// Single page large enough for a file of `length` bytes
pub fn fit(length: u64) -> Vec<PageSpec> {
    let size = (length as usize).div_ceil(512) * 512;
    vec![PageSpec::new(KIND, size)]
}
