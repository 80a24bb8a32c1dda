#[derive(Copy, Clone, Debug)]
pub struct Config {
    /// Offload half of large transfers to the IO worker thread,
    /// has no effect without `std`
    pub offload: bool,
    /// Minimum sectors per half before a read is split
    pub read_threshold: u32,
    /// Minimum sectors per half before a write is split
    pub write_threshold: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self { offload: true, read_threshold: 16, write_threshold: 32 }
    }
}

impl Config {
    /// Every transfer handled by the calling thread alone
    pub fn inline() -> Self {
        Self { offload: false, ..Default::default() }
    }
}
