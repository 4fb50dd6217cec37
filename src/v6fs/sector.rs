//! 512-byte sector I/O against the backing file.
//!
//! Every disk access in the crate goes through these two functions; there is
//! no caching layer above them.

use crate::error::Result;
use std::fs::File;
use std::os::unix::fs::FileExt;

/// Size of a disk sector in bytes.
pub const SECTOR_SIZE: usize = 512;

/// Reads the sector at index `sector` from the virtual disk into `data`.
pub fn read(f: &File, sector: u32, data: &mut [u8; SECTOR_SIZE]) -> Result<()> {
    f.read_exact_at(data, sector as u64 * SECTOR_SIZE as u64)?;
    Ok(())
}

/// Writes `data` to the sector at index `sector` of the virtual disk.
pub fn write(f: &File, sector: u32, data: &[u8; SECTOR_SIZE]) -> Result<()> {
    f.write_all_at(data, sector as u64 * SECTOR_SIZE as u64)?;
    Ok(())
}
