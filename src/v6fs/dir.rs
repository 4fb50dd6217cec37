//! Directories: fixed 16-byte records binding a name to an inode number,
//! stored as regular file contents. Provides sector-buffered iteration,
//! recursive path lookup, entry creation and tree listing.

use crate::error::{Error, Result};
use crate::file::FileHandle;
use crate::fs::FileSystem;
use crate::inode::ROOT_INUMBER;
use crate::sector::SECTOR_SIZE;
use std::io::Write;

/// Maximum length of an entry name, in bytes.
pub const DIRENT_MAXLEN: usize = 14;
/// Size of one on-disk directory record.
pub const DIRENT_SIZE: usize = 16;
/// Number of directory records per sector.
pub const DIRENTRIES_PER_SECTOR: usize = SECTOR_SIZE / DIRENT_SIZE;
/// Maximum length of a path handed to [`create`].
pub const MAX_PATH_LEN: usize = 1024;

/// A decoded directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inr: u16,
}

/// Iterates the entries of one directory, one buffered sector at a time.
pub struct DirReader {
    file: FileHandle,
    block: [u8; SECTOR_SIZE],
    curr: usize,
    last: usize,
}

impl DirReader {
    /// Opens inode `inr` for entry iteration.
    pub fn open(fs: &FileSystem, inr: u16) -> Result<Self> {
        let file = FileHandle::open(fs, inr)?;
        if !file.inode.is_directory() {
            return Err(Error::InvalidDirectoryInode);
        }
        Ok(Self {
            file,
            block: [0; SECTOR_SIZE],
            curr: 0,
            last: 0,
        })
    }

    /// Tells whether the directory holds no entry at all.
    pub fn is_empty(&self) -> bool {
        self.file.inode.size() == 0
    }

    /// Returns the next entry, or `None` once every entry has been emitted.
    ///
    /// Names are truncated at the first null byte; a name filling the whole
    /// field carries no terminator.
    pub fn next_entry(&mut self, fs: &FileSystem) -> Result<Option<DirEntry>> {
        if self.curr == 0 {
            let n = self.file.read_block(fs, &mut self.block)?;
            self.last = n / DIRENT_SIZE;
            if self.last == 0 {
                return Ok(None);
            }
        } else if self.curr == self.last {
            return Ok(None);
        }
        let record = &self.block[self.curr * DIRENT_SIZE..(self.curr + 1) * DIRENT_SIZE];
        let inr = u16::from_le_bytes([record[0], record[1]]);
        let name_len = record[2..]
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(DIRENT_MAXLEN);
        let name = String::from_utf8_lossy(&record[2..2 + name_len]).into_owned();
        self.curr += 1;
        if self.curr == self.last && self.last == DIRENTRIES_PER_SECTOR {
            // A fully populated sector was drained; fetch the next one on
            // the following call.
            self.curr = 0;
        }
        Ok(Some(DirEntry { name, inr }))
    }
}

/// Resolves `path` relative to the directory at inode `inr` and returns the
/// inode number it names.
///
/// Runs of leading `/` are ignored; an empty remainder names `inr` itself.
/// An unknown component fails with [`Error::InodeOutOfRange`]; descending
/// into a regular file fails with [`Error::InvalidDirectoryInode`].
pub fn lookup(fs: &FileSystem, inr: u16, path: &str) -> Result<u16> {
    let rest = path.trim_start_matches('/');
    if rest.is_empty() {
        return Ok(inr);
    }
    let (component, remainder) = match rest.split_once('/') {
        Some((component, remainder)) => (component, remainder),
        None => (rest, ""),
    };
    let mut dir = DirReader::open(fs, inr)?;
    while let Some(entry) = dir.next_entry(fs)? {
        if entry.name == component {
            return lookup(fs, entry.inr, remainder);
        }
    }
    Err(Error::InodeOutOfRange)
}

/// Creates a new entry at `path` with the given inode mode and returns the
/// freshly allocated inode number.
///
/// The path is normalized first: a `/` is prepended when absent and runs of
/// `/` collapse. A trailing `/` is refused, as are leaf names over
/// [`DIRENT_MAXLEN`] bytes and paths over [`MAX_PATH_LEN`] bytes. Every
/// component but the last must name an existing directory.
pub fn create(fs: &mut FileSystem, path: &str, mode: u16) -> Result<u16> {
    if path.is_empty() || path.ends_with('/') {
        return Err(Error::BadParameter);
    }
    let mut full = String::with_capacity(path.len() + 1);
    for component in path.split('/').filter(|c| !c.is_empty()) {
        full.push('/');
        full.push_str(component);
    }
    if full.len() > MAX_PATH_LEN {
        return Err(Error::FilenameTooLong);
    }
    let split = full.rfind('/').ok_or(Error::BadParameter)?;
    let (parent, leaf) = (&full[..split], &full[split + 1..]);
    if leaf.len() > DIRENT_MAXLEN {
        return Err(Error::FilenameTooLong);
    }

    if lookup(fs, ROOT_INUMBER, &full).is_ok() {
        return Err(Error::FilenameAlreadyExists);
    }
    let parent_inr = lookup(fs, ROOT_INUMBER, parent).map_err(|_| Error::BadParameter)?;
    let mut parent_file = FileHandle::open(fs, parent_inr)?;
    if !parent_file.inode.is_directory() {
        return Err(Error::BadParameter);
    }

    let inr = fs.inode_alloc()?;
    FileHandle::create(fs, inr, mode)?;

    let mut record = [0u8; DIRENT_SIZE];
    record[0..2].copy_from_slice(&inr.to_le_bytes());
    record[2..2 + leaf.len()].copy_from_slice(leaf.as_bytes());
    parent_file.write_bytes(fs, &record)?;
    Ok(inr)
}

/// Prints the subtree rooted at `inr`, one line per node: `DIR <path>/` for
/// directories and `FIL <path>` for regular files, depth-first in directory
/// order.
pub fn print_tree<W: Write>(fs: &FileSystem, inr: u16, prefix: &str, out: &mut W) -> Result<()> {
    match DirReader::open(fs, inr) {
        Ok(mut dir) => {
            writeln!(out, "DIR {prefix}/")?;
            while let Some(entry) = dir.next_entry(fs)? {
                let path = format!("{prefix}/{}", entry.name);
                print_tree(fs, entry.inr, &path, out)?;
            }
            Ok(())
        }
        Err(Error::InvalidDirectoryInode) => {
            writeln!(out, "FIL {prefix}")?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::inode::IFDIR;

    fn fresh_fs(blocks: u16, inodes: u16) -> (tempfile::TempDir, std::path::PathBuf, FileSystem) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");
        FileSystem::mkfs(&path, blocks, inodes).unwrap();
        let fs = FileSystem::mount(&path).unwrap();
        (dir, path, fs)
    }

    #[test]
    fn empty_root_lists_as_a_single_line() {
        let (_dir, _path, fs) = fresh_fs(100, 32);
        let mut out = Vec::new();
        print_tree(&fs, ROOT_INUMBER, "", &mut out).unwrap();
        assert_eq!(out, b"DIR /\n");
    }

    #[test]
    fn lookup_returns_what_create_returned() {
        let (_dir, _path, mut fs) = fresh_fs(100, 32);
        let a = create(&mut fs, "/a", IFDIR).unwrap();
        let b = create(&mut fs, "/a/b", IFDIR).unwrap();
        let f = create(&mut fs, "/a/b/f", 0).unwrap();
        assert_eq!(lookup(&fs, ROOT_INUMBER, "/a"), Ok(a));
        assert_eq!(lookup(&fs, ROOT_INUMBER, "/a/b"), Ok(b));
        assert_eq!(lookup(&fs, ROOT_INUMBER, "/a/b/f"), Ok(f));
        assert_eq!(lookup(&fs, ROOT_INUMBER, "/"), Ok(ROOT_INUMBER));
        assert_eq!(lookup(&fs, ROOT_INUMBER, ""), Ok(ROOT_INUMBER));
    }

    #[test]
    fn lookup_failures() {
        let (_dir, _path, mut fs) = fresh_fs(100, 32);
        create(&mut fs, "/a", IFDIR).unwrap();
        create(&mut fs, "/f", 0).unwrap();
        assert_eq!(
            lookup(&fs, ROOT_INUMBER, "/missing").err(),
            Some(Error::InodeOutOfRange)
        );
        assert_eq!(
            lookup(&fs, ROOT_INUMBER, "/a/missing").err(),
            Some(Error::InodeOutOfRange)
        );
        // Descending into a regular file.
        assert_eq!(
            lookup(&fs, ROOT_INUMBER, "/f/x").err(),
            Some(Error::InvalidDirectoryInode)
        );
    }

    #[test]
    fn create_normalizes_paths() {
        let (_dir, _path, mut fs) = fresh_fs(100, 32);
        let a = create(&mut fs, "a", IFDIR).unwrap();
        assert_eq!(lookup(&fs, ROOT_INUMBER, "/a"), Ok(a));
        let c = create(&mut fs, "//a///c", 0).unwrap();
        assert_eq!(lookup(&fs, ROOT_INUMBER, "/a/c"), Ok(c));
    }

    #[test]
    fn create_refusals() {
        let (_dir, _path, mut fs) = fresh_fs(100, 32);
        create(&mut fs, "/x", 0).unwrap();
        assert_eq!(create(&mut fs, "/x", 0).err(), Some(Error::FilenameAlreadyExists));
        assert_eq!(create(&mut fs, "/d/", IFDIR).err(), Some(Error::BadParameter));
        assert_eq!(create(&mut fs, "", 0).err(), Some(Error::BadParameter));
        assert_eq!(
            create(&mut fs, "/fifteen-bytes-x", 0).err(),
            Some(Error::FilenameTooLong)
        );
        let deep = "/abcdefghij".repeat(95);
        assert_eq!(create(&mut fs, &deep, 0).err(), Some(Error::FilenameTooLong));
        // Parent must exist and be a directory.
        assert_eq!(create(&mut fs, "/no/f", 0).err(), Some(Error::BadParameter));
        assert_eq!(create(&mut fs, "/x/f", 0).err(), Some(Error::BadParameter));
    }

    #[test]
    fn fourteen_byte_names_roundtrip() {
        let (_dir, _path, mut fs) = fresh_fs(100, 32);
        let name = "/abcdefghijklmn";
        assert_eq!(name.len(), 15);
        let inr = create(&mut fs, name, 0).unwrap();
        assert_eq!(lookup(&fs, ROOT_INUMBER, name), Ok(inr));
        let mut dir = DirReader::open(&fs, ROOT_INUMBER).unwrap();
        let entry = dir.next_entry(&fs).unwrap().unwrap();
        assert_eq!(entry.name, "abcdefghijklmn");
        assert_eq!(entry.inr, inr);
    }

    #[test]
    fn iterates_across_sector_boundaries() {
        let (_dir, _path, mut fs) = fresh_fs(200, 64);
        let mut created = Vec::new();
        for i in 0..40 {
            let name = format!("f{i:02}");
            let inr = create(&mut fs, &name, 0).unwrap();
            created.push((name, inr));
        }
        let mut dir = DirReader::open(&fs, ROOT_INUMBER).unwrap();
        let mut seen = Vec::new();
        while let Some(entry) = dir.next_entry(&fs).unwrap() {
            seen.push((entry.name, entry.inr));
        }
        assert_eq!(seen, created);
    }

    #[test]
    fn exactly_one_full_sector_of_entries() {
        let (_dir, _path, mut fs) = fresh_fs(200, 64);
        for i in 0..DIRENTRIES_PER_SECTOR {
            create(&mut fs, &format!("e{i:02}"), 0).unwrap();
        }
        let mut dir = DirReader::open(&fs, ROOT_INUMBER).unwrap();
        let mut count = 0;
        while dir.next_entry(&fs).unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, DIRENTRIES_PER_SECTOR);
    }

    #[test]
    fn opendir_rejects_regular_files() {
        let (_dir, _path, mut fs) = fresh_fs(100, 32);
        let inr = create(&mut fs, "/f", 0).unwrap();
        assert_eq!(
            DirReader::open(&fs, inr).err(),
            Some(Error::InvalidDirectoryInode)
        );
    }

    #[test]
    fn tree_lists_nested_paths() {
        let (_dir, _path, mut fs) = fresh_fs(100, 32);
        create(&mut fs, "/a", IFDIR).unwrap();
        create(&mut fs, "/a/b", IFDIR).unwrap();
        create(&mut fs, "/a/b/f", 0).unwrap();
        create(&mut fs, "/g", 0).unwrap();
        let mut out = Vec::new();
        print_tree(&fs, ROOT_INUMBER, "", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "DIR /\nDIR /a/\nDIR /a/b/\nFIL /a/b/f\nFIL /g\n");
    }

    #[test]
    fn entries_survive_a_remount() {
        let (_dir, path, mut fs) = fresh_fs(100, 32);
        create(&mut fs, "/a", IFDIR).unwrap();
        let f = create(&mut fs, "/a/f", 0).unwrap();
        let mut file = FileHandle::open(&fs, f).unwrap();
        let content: Vec<u8> = (0..1500u32).map(|i| (i % 256) as u8).collect();
        file.write_bytes(&mut fs, &content).unwrap();
        fs.unmount().unwrap();

        let mut fs = FileSystem::mount(&path).unwrap();
        assert_eq!(lookup(&fs, ROOT_INUMBER, "/a/f"), Ok(f));
        let mut file = FileHandle::open(&fs, f).unwrap();
        assert_eq!(file.read_to_end(&fs).unwrap(), content);
        // The rebuilt free-block bitmap knows the file's sectors.
        let first = fs.inode_sector(&file.inode, 0).unwrap();
        assert_eq!(fs.fbm.get(first as u64), Ok(true));
        // New entries keep working after the rebuild.
        let g = create(&mut fs, "/a/g", 0).unwrap();
        assert_eq!(lookup(&fs, ROOT_INUMBER, "/a/g"), Ok(g));
    }
}
