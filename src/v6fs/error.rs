//! Error codes shared by all layers of the filesystem.

use std::{fmt, io};

/// An error reported by the filesystem core.
///
/// Each variant carries a stable negative code, exposed through
/// [`Error::code`]; these are the values reported at the shell boundary.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An argument violates the caller contract.
    BadParameter = -1,
    /// The backing file could not be opened, read, written or closed.
    Io = -2,
    /// The inode number lies outside the inode table.
    InodeOutOfRange = -3,
    /// The inode is not marked allocated.
    UnallocatedInode = -4,
    /// The file is, or would grow, past the addressing limit.
    FileTooLarge = -5,
    /// The offset does not fall inside the file.
    OffsetOutOfRange = -6,
    /// The boot sector does not carry the magic byte.
    BadBootSector = -7,
    /// No free inode is left.
    NoMem = -8,
    /// No free index is left in the bitmap.
    BitmapFull = -9,
    /// The inode does not describe a directory.
    InvalidDirectoryInode = -10,
    /// An entry with this name already exists.
    FilenameAlreadyExists = -11,
    /// A name or path exceeds the on-disk limits.
    FilenameTooLong = -12,
    /// Too few blocks to hold the inode table and data region.
    NotEnoughBlocks = -13,
}

/// The result type used by every fallible filesystem operation.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the stable numeric code of the error.
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Error::BadParameter => "bad parameter",
            Error::Io => "input/output error",
            Error::InodeOutOfRange => "inode out of range",
            Error::UnallocatedInode => "unallocated inode",
            Error::FileTooLarge => "file too large",
            Error::OffsetOutOfRange => "offset out of range",
            Error::BadBootSector => "bad boot sector",
            Error::NoMem => "not enough memory",
            Error::BitmapFull => "bitmap is full",
            Error::InvalidDirectoryInode => "invalid directory inode",
            Error::FilenameAlreadyExists => "filename already exists",
            Error::FilenameTooLong => "filename too long",
            Error::NotEnoughBlocks => "not enough blocks",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(_: io::Error) -> Self {
        Self::Io
    }
}
