//! `v6sh` is an interactive shell for inspecting and modifying a Unix V6
//! filesystem image.

use std::env::{self, ArgsOs};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::exit;
use v6fs::Error;
use v6fs::dir;
use v6fs::file::FileHandle;
use v6fs::fs::FileSystem;
use v6fs::inode::{IFDIR, ROOT_INUMBER};
use v6fs::sha;

/// Reports a fatal error and leaves the shell with a failure status.
fn fatal<M: fmt::Display>(msg: M) -> ! {
    eprintln!("v6sh: error: {msg}");
    exit(1);
}

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
    /// If true, print command line help.
    help: bool,
    /// Image to mount at startup.
    disk: Option<PathBuf>,
}

fn parse_args(args: ArgsOs) -> Args {
    let mut res: Args = Default::default();
    for arg in args {
        match arg.to_str() {
            Some("-h" | "--help") => res.help = true,
            _ => res.disk = Some(PathBuf::from(arg)),
        }
    }
    res
}

/// Prints command help.
fn print_help() {
    println!();
    println!("Usage:");
    println!(" v6sh [options] [disk]");
    println!();
    println!("Interactive shell over a Unix V6 filesystem image.");
    println!();
    println!("Options:");
    println!(" -h, --help\tPrints help.");
    println!(" disk\t\tImage to mount at startup.");
}

/// The shell's mutable state: the currently mounted filesystem, if any.
struct Shell {
    fs: Option<FileSystem>,
}

impl Shell {
    /// The mounted filesystem, for commands that require one.
    fn mounted(&mut self) -> v6fs::Result<&mut FileSystem> {
        self.fs.as_mut().ok_or(Error::Io)
    }
}

/// One shell command: its handler, description and argument signature.
struct Command {
    name: &'static str,
    run: fn(&mut Shell, &[&str]) -> v6fs::Result<()>,
    help: &'static str,
    argc: usize,
    args: &'static str,
    /// Whether the command requires a mounted filesystem.
    needs_mount: bool,
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        run: do_help,
        help: "display this help",
        argc: 0,
        args: "",
        needs_mount: false,
    },
    Command {
        name: "exit",
        run: do_exit,
        help: "exit shell",
        argc: 0,
        args: "",
        needs_mount: false,
    },
    Command {
        name: "quit",
        run: do_exit,
        help: "exit shell",
        argc: 0,
        args: "",
        needs_mount: false,
    },
    Command {
        name: "mkfs",
        run: do_mkfs,
        help: "create a new filesystem",
        argc: 3,
        args: "<diskname> <#inodes> <#blocks>",
        needs_mount: false,
    },
    Command {
        name: "mount",
        run: do_mount,
        help: "mount the provided filesystem",
        argc: 1,
        args: "<diskname>",
        needs_mount: false,
    },
    Command {
        name: "mkdir",
        run: do_mkdir,
        help: "create a new directory",
        argc: 1,
        args: "<dirname>",
        needs_mount: true,
    },
    Command {
        name: "lsall",
        run: do_lsall,
        help: "list all directories and files contained in the currently mounted filesystem",
        argc: 0,
        args: "",
        needs_mount: true,
    },
    Command {
        name: "add",
        run: do_add,
        help: "add a new file",
        argc: 2,
        args: "<src-fullpath> <dst>",
        needs_mount: true,
    },
    Command {
        name: "cat",
        run: do_cat,
        help: "display the content of a file",
        argc: 1,
        args: "<pathname>",
        needs_mount: true,
    },
    Command {
        name: "istat",
        run: do_istat,
        help: "display information about the provided inode",
        argc: 1,
        args: "<inode_nr>",
        needs_mount: true,
    },
    Command {
        name: "inode",
        run: do_inode,
        help: "display the inode number of a file",
        argc: 1,
        args: "<pathname>",
        needs_mount: true,
    },
    Command {
        name: "sha",
        run: do_sha,
        help: "display the SHA of a file",
        argc: 1,
        args: "<pathname>",
        needs_mount: true,
    },
    Command {
        name: "psb",
        run: do_psb,
        help: "print SuperBlock of the currently mounted filesystem",
        argc: 0,
        args: "",
        needs_mount: true,
    },
];

fn do_help(_shell: &mut Shell, _args: &[&str]) -> v6fs::Result<()> {
    for cmd in COMMANDS {
        println!("- {} {}: {}.", cmd.name, cmd.args, cmd.help);
    }
    Ok(())
}

fn do_exit(shell: &mut Shell, _args: &[&str]) -> v6fs::Result<()> {
    match shell.fs.take() {
        Some(fs) => fs.unmount(),
        None => Ok(()),
    }
}

fn do_mkfs(_shell: &mut Shell, args: &[&str]) -> v6fs::Result<()> {
    let inodes: u16 = args[1].parse().map_err(|_| Error::BadParameter)?;
    let blocks: u16 = args[2].parse().map_err(|_| Error::BadParameter)?;
    FileSystem::mkfs(Path::new(args[0]), blocks, inodes)
}

fn do_mount(shell: &mut Shell, args: &[&str]) -> v6fs::Result<()> {
    if let Some(old) = shell.fs.take() {
        old.unmount()?;
    }
    shell.fs = Some(FileSystem::mount(Path::new(args[0]))?);
    Ok(())
}

fn do_mkdir(shell: &mut Shell, args: &[&str]) -> v6fs::Result<()> {
    dir::create(shell.mounted()?, args[0], IFDIR)?;
    Ok(())
}

fn do_lsall(shell: &mut Shell, _args: &[&str]) -> v6fs::Result<()> {
    dir::print_tree(shell.mounted()?, ROOT_INUMBER, "", &mut io::stdout().lock())
}

fn do_add(shell: &mut Shell, args: &[&str]) -> v6fs::Result<()> {
    let content = std::fs::read(args[0])?;
    let fs = shell.mounted()?;
    let inr = dir::create(fs, args[1], 0)?;
    let mut file = FileHandle::open(fs, inr)?;
    file.write_bytes(fs, &content)
}

fn do_cat(shell: &mut Shell, args: &[&str]) -> v6fs::Result<()> {
    let fs = shell.mounted()?;
    let inr = dir::lookup(fs, ROOT_INUMBER, args[0])?;
    let mut file = FileHandle::open(fs, inr)?;
    if file.inode.is_directory() {
        println!("ERROR SHELL: cat on a directory is not defined");
        return Ok(());
    }
    let content = file.read_to_end(fs)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(&content)?;
    stdout.write_all(b"\n")?;
    Ok(())
}

fn do_istat(shell: &mut Shell, args: &[&str]) -> v6fs::Result<()> {
    let inr: u16 = args[0].parse().map_err(|_| Error::InodeOutOfRange)?;
    let inode = shell.mounted()?.inode_read(inr)?;
    println!("{inode}");
    Ok(())
}

fn do_inode(shell: &mut Shell, args: &[&str]) -> v6fs::Result<()> {
    let inr = dir::lookup(shell.mounted()?, ROOT_INUMBER, args[0])?;
    println!("inode: {inr}");
    Ok(())
}

fn do_sha(shell: &mut Shell, args: &[&str]) -> v6fs::Result<()> {
    let fs = shell.mounted()?;
    let inr = dir::lookup(fs, ROOT_INUMBER, args[0])?;
    sha::print_sha_inode(fs, inr, &mut io::stdout().lock())
}

fn do_psb(shell: &mut Shell, _args: &[&str]) -> v6fs::Result<()> {
    println!("{}", shell.mounted()?.superblock());
    Ok(())
}

/// Runs one tokenized input line. Returns whether the shell should exit.
fn dispatch(shell: &mut Shell, tokens: &[&str]) -> bool {
    let Some(cmd) = COMMANDS.iter().find(|c| c.name == tokens[0]) else {
        println!("ERROR SHELL: invalid command");
        return false;
    };
    if tokens.len() - 1 != cmd.argc {
        println!("ERROR SHELL: wrong number of arguments");
        return false;
    }
    if cmd.needs_mount && shell.fs.is_none() {
        println!("ERROR SHELL: mount the FS before the operation");
        return false;
    }
    if let Err(e) = (cmd.run)(shell, &tokens[1..]) {
        println!("ERROR FS: {e}");
    }
    matches!(cmd.name, "exit" | "quit")
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

    let mut shell = Shell { fs: None };
    if let Some(disk) = &args.disk {
        shell.fs = Some(FileSystem::mount(disk).unwrap_or_else(|e| {
            fatal(format_args!("{}: {e}", disk.display()));
        }));
    }

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!(">>> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.lock().read_line(&mut line) {
            // EOF or unreadable input ends the session.
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if dispatch(&mut shell, &tokens) {
            return;
        }
    }
    // EOF path: release the image like an explicit `exit` would.
    if let Some(fs) = shell.fs.take() {
        if let Err(e) = fs.unmount() {
            fatal(e);
        }
    }
}
