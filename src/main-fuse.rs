//! `v6fuse` exposes a Unix V6 filesystem image read-only through FUSE.
//!
//! The session runs single-threaded, so callbacks reach the engine one at a
//! time.

use fuser::{
    FileAttr, FileType, MountOption, ReplyAttr, ReplyData, ReplyDirectory, ReplyEntry, Request,
};
use std::env::{self, ArgsOs};
use std::ffi::OsStr;
use std::fmt;
use std::path::PathBuf;
use std::process::exit;
use std::time::{Duration, SystemTime};
use v6fs::Error;
use v6fs::dir::DirReader;
use v6fs::file::FileHandle;
use v6fs::fs::FileSystem;
use v6fs::inode::Inode;
use v6fs::sector::SECTOR_SIZE;

/// Reports a fatal error and gives up serving, with a failure status.
fn fatal<M: fmt::Display>(msg: M) -> ! {
    eprintln!("v6fuse: error: {msg}");
    exit(1);
}

/// Validity window handed to the kernel for attributes and entries.
const TTL: Duration = Duration::from_secs(1);

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
    /// If true, print command line help.
    help: bool,
    /// The filesystem image to serve.
    disk: Option<PathBuf>,
    /// Where to mount it.
    mountpoint: Option<PathBuf>,
}

fn parse_args(args: ArgsOs) -> Args {
    let mut res: Args = Default::default();
    for arg in args {
        match arg.to_str() {
            Some("-h" | "--help") => res.help = true,
            _ => {
                if res.disk.is_none() {
                    res.disk = Some(PathBuf::from(arg));
                } else {
                    res.mountpoint = Some(PathBuf::from(arg));
                }
            }
        }
    }
    res
}

/// Prints command help.
fn print_help() {
    println!();
    println!("Usage:");
    println!(" v6fuse [options] <disk> <mountpoint>");
    println!();
    println!("Serves a Unix V6 filesystem image read-only through FUSE.");
    println!();
    println!("Options:");
    println!(" -h, --help\tPrints help.");
}

/// Maps a filesystem error to the errno reported to the kernel.
fn errno(e: Error) -> libc::c_int {
    match e {
        Error::InodeOutOfRange | Error::UnallocatedInode => libc::ENOENT,
        Error::InvalidDirectoryInode => libc::ENOTDIR,
        Error::OffsetOutOfRange | Error::BadParameter => libc::EINVAL,
        _ => libc::EIO,
    }
}

/// Builds the attributes of inode `inr`: directories appear with two links,
/// regular files with one, both world-readable.
fn attr(inr: u16, inode: &Inode) -> FileAttr {
    let (kind, nlink) = if inode.is_directory() {
        (FileType::Directory, 2)
    } else {
        (FileType::RegularFile, 1)
    };
    FileAttr {
        ino: inr as u64,
        size: inode.size() as u64,
        blocks: inode.sector_count() as u64,
        atime: SystemTime::UNIX_EPOCH,
        mtime: SystemTime::UNIX_EPOCH,
        ctime: SystemTime::UNIX_EPOCH,
        crtime: SystemTime::UNIX_EPOCH,
        kind,
        perm: 0o755,
        nlink,
        uid: unsafe { libc::getuid() },
        gid: unsafe { libc::getgid() },
        rdev: 0,
        blksize: SECTOR_SIZE as u32,
        flags: 0,
    }
}

/// Serves a mounted image. Inode numbers double as FUSE inode ids; the FUSE
/// root (1) is the filesystem's root directory.
struct V6Fuse {
    fs: FileSystem,
}

impl fuser::Filesystem for V6Fuse {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name) = name.to_str() else {
            reply.error(libc::ENOENT);
            return;
        };
        let mut dir = match DirReader::open(&self.fs, parent as u16) {
            Ok(dir) => dir,
            Err(e) => {
                reply.error(errno(e));
                return;
            }
        };
        loop {
            match dir.next_entry(&self.fs) {
                Ok(Some(entry)) if entry.name == name => {
                    match self.fs.inode_read(entry.inr) {
                        Ok(inode) => reply.entry(&TTL, &attr(entry.inr, &inode), 0),
                        Err(e) => reply.error(errno(e)),
                    }
                    return;
                }
                Ok(Some(_)) => {}
                Ok(None) => {
                    reply.error(libc::ENOENT);
                    return;
                }
                Err(e) => {
                    reply.error(errno(e));
                    return;
                }
            }
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        match self.fs.inode_read(ino as u16) {
            Ok(inode) => reply.attr(&TTL, &attr(ino as u16, &inode)),
            Err(e) => reply.error(errno(e)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let mut dir = match DirReader::open(&self.fs, ino as u16) {
            Ok(dir) => dir,
            Err(e) => {
                reply.error(errno(e));
                return;
            }
        };
        let mut entries: Vec<(u64, FileType, String)> = vec![
            (ino, FileType::Directory, ".".to_owned()),
            (ino, FileType::Directory, "..".to_owned()),
        ];
        loop {
            match dir.next_entry(&self.fs) {
                Ok(Some(entry)) => {
                    let kind = match self.fs.inode_read(entry.inr) {
                        Ok(inode) if inode.is_directory() => FileType::Directory,
                        _ => FileType::RegularFile,
                    };
                    entries.push((entry.inr as u64, kind, entry.name));
                }
                Ok(None) => break,
                Err(e) => {
                    reply.error(errno(e));
                    return;
                }
            }
        }
        for (i, (ino, kind, name)) in entries.into_iter().enumerate().skip(offset as usize) {
            // The offset handed back is the one of the *next* entry.
            if reply.add(ino, (i + 1) as i64, kind, &name) {
                break;
            }
        }
        reply.ok();
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let mut file = match FileHandle::open(&self.fs, ino as u16) {
            Ok(file) => file,
            Err(e) => {
                reply.error(errno(e));
                return;
            }
        };
        if file.inode.is_directory() {
            reply.error(libc::EISDIR);
            return;
        }
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }
        // Reading at or past the end yields no bytes.
        if file.seek(offset as u32).is_err() {
            reply.data(&[]);
            return;
        }
        let mut content = Vec::with_capacity(size as usize);
        let mut block = [0u8; SECTOR_SIZE];
        while content.len() < size as usize {
            match file.read_block(&self.fs, &mut block) {
                Ok(0) => break,
                Ok(n) => content.extend_from_slice(&block[..n]),
                Err(e) => {
                    reply.error(errno(e));
                    return;
                }
            }
        }
        content.truncate(size as usize);
        reply.data(&content);
    }
}

fn main() {
    env_logger::init();
    let mut args = env::args_os();
    args.next();
    let args = parse_args(args);
    if args.help {
        print_help();
        return;
    }
    let Some(disk) = args.disk else {
        fatal("specify path to a filesystem image");
    };
    let Some(mountpoint) = args.mountpoint else {
        fatal("specify path to a mount point");
    };

    let fs = FileSystem::mount(&disk).unwrap_or_else(|e| {
        fatal(format_args!("{}: {e}", disk.display()));
    });
    log::info!("serving {} on {}", disk.display(), mountpoint.display());
    let options = [MountOption::RO, MountOption::FSName("v6fs".to_owned())];
    fuser::mount2(V6Fuse { fs }, &mountpoint, &options).unwrap_or_else(|e| {
        fatal(e);
    });
}
