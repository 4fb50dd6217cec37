//! Read/write implementation of the Unix Version 6 filesystem, layered over a
//! single backing file acting as a virtual disk.
//!
//! The crate is organized bottom-up:
//! - [`sector`]: 512-byte random-access I/O on the backing file.
//! - [`bitmap`]: free-index bookkeeping with a next-free cursor.
//! - [`fs`]: superblock, the in-memory filesystem handle, mount/unmount/mkfs.
//! - [`inode`]: on-disk inode records and direct/indirect sector resolution.
//! - [`file`]: sequential reads and tail-append writes, with transparent
//!   promotion from direct to indirect addressing.
//! - [`dir`]: directory records, path lookup and entry creation.
//!
//! The `v6sh` binary drives these operations from an interactive shell; the
//! `v6fuse` binary exposes a mounted image read-only through FUSE.

pub mod bitmap;
pub mod dir;
pub mod error;
pub mod file;
pub mod fs;
pub mod inode;
pub mod sector;
pub mod sha;

pub use error::{Error, Result};
pub use fs::FileSystem;
