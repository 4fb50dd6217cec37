//! SHA-256 rendering of file contents.

use crate::error::Result;
use crate::file::FileHandle;
use crate::fs::FileSystem;
use sha2::{Digest, Sha256};
use std::io::Write;

/// Returns the lowercase hex SHA-256 digest of `content`.
pub fn hex_digest(content: &[u8]) -> String {
    Sha256::digest(content)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Prints the `SHA inode <n>: …` line for inode `inr`.
///
/// Directories have no meaningful byte stream, so they get a fixed text
/// instead of a digest.
pub fn print_sha_inode<W: Write>(fs: &FileSystem, inr: u16, out: &mut W) -> Result<()> {
    let mut file = FileHandle::open(fs, inr)?;
    if file.inode.is_directory() {
        writeln!(out, "SHA inode {inr}: no SHA for directories")?;
        return Ok(());
    }
    let content = file.read_to_end(fs)?;
    writeln!(out, "SHA inode {inr}: {}", hex_digest(&content))?;
    Ok(())
}
