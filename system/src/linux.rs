use std::{
    env,
    ffi::CString,
    io,
    os::unix::ffi::OsStringExt,
    ptr,
    time::Duration,
};

use camino::Utf8Path;
use rustix::{
    fd::OwnedFd,
    fs::{self, Dir, Mode, OFlags},
    io::Errno,
    ioctl::ioctl,
    mount::{mount, mount_move},
    process::{self, getpid},
    runtime::execve,
};

use crate::{
    host::{Host, Mount},
    loop_configure::ConfigureLoop,
    subprocess::{self, SubprocessResult},
};

/// [`Host`] on top of the running kernel.
#[derive(Debug, Default)]
pub struct LinuxHost;

impl LinuxHost {
    pub fn new() -> Self {
        Self
    }
}

impl Host for LinuxHost {
    type Image = OwnedFd;

    fn is_init(&self) -> bool {
        getpid().is_init()
    }

    fn exists(&mut self, path: &Utf8Path) -> bool {
        fs::stat(path.as_std_path()).is_ok()
    }

    fn list_dir(&mut self, path: &Utf8Path) -> Result<Vec<String>, Errno> {
        let dir = fs::open(
            path.as_std_path(),
            OFlags::RDONLY | OFlags::DIRECTORY | OFlags::CLOEXEC,
            Mode::empty(),
        )?;

        let mut dir = Dir::new(dir)?;
        let mut names = Vec::new();

        while let Some(Ok(e)) = dir.next() {
            let name = e.file_name().to_bytes();

            if name != b"." && name != b".." {
                names.push(String::from_utf8_lossy(name).into_owned());
            }
        }

        Ok(names)
    }

    fn read_file(&mut self, path: &Utf8Path, limit: usize) -> Result<Vec<u8>, Errno> {
        let fd = fs::open(
            path.as_std_path(),
            OFlags::RDONLY | OFlags::CLOEXEC,
            Mode::empty(),
        )?;

        rt::io::read_up_to(fd, limit)
    }

    fn write_file(&mut self, path: &Utf8Path, contents: &[u8]) -> Result<(), Errno> {
        let fd = fs::open(
            path.as_std_path(),
            OFlags::WRONLY | OFlags::CLOEXEC,
            Mode::empty(),
        )?;

        rt::io::write_all(fd, contents)
    }

    fn mkdir(&mut self, path: &Utf8Path, mode: Mode) -> Result<(), Errno> {
        fs::mkdir(path.as_std_path(), mode)
    }

    fn chdir(&mut self, path: &Utf8Path) -> Result<(), Errno> {
        process::chdir(path.as_std_path())
    }

    fn setsid(&mut self) -> Result<(), Errno> {
        process::setsid().map(drop)
    }

    fn set_env(&mut self, key: &str, value: &str) {
        env::set_var(key, value);
    }

    fn mount(&mut self, m: &Mount<'_>) -> Result<(), Errno> {
        mount(m.source, m.target.as_str(), m.fstype, m.flags, m.data)
    }

    fn move_mount(&mut self, from: &Utf8Path, to: &Utf8Path) -> Result<(), Errno> {
        mount_move(from.as_std_path(), to.as_std_path())
    }

    fn pivot_root(&mut self, new_root: &Utf8Path, put_old: &Utf8Path) -> Result<(), Errno> {
        process::pivot_root(new_root.as_std_path(), put_old.as_std_path())
    }

    fn open_image(&mut self, path: &Utf8Path) -> Result<OwnedFd, Errno> {
        fs::open(
            path.as_std_path(),
            OFlags::RDWR | OFlags::CLOEXEC,
            Mode::empty(),
        )
    }

    fn attach_loop(&mut self, device: &Utf8Path, image: &OwnedFd) -> Result<(), Errno> {
        let device = fs::open(
            device.as_std_path(),
            OFlags::RDWR | OFlags::CLOEXEC,
            Mode::empty(),
        )?;

        unsafe { ioctl(&device, ConfigureLoop::new(image)) }.map(drop)
    }

    fn run(&mut self, program: &Utf8Path, args: &[&str]) -> io::Result<SubprocessResult> {
        subprocess::run(program, args)
    }

    fn exec(&mut self, program: &Utf8Path, argv: &[&str]) -> Errno {
        let Ok(path) = CString::new(program.as_str()) else {
            return Errno::INVAL;
        };
        let Ok(args) = argv
            .iter()
            .map(|arg| CString::new(*arg))
            .collect::<Result<Vec<_>, _>>()
        else {
            return Errno::INVAL;
        };

        let env: Vec<CString> = env::vars_os()
            .filter_map(|(key, value)| {
                let mut entry = key.into_vec();
                entry.push(b'=');
                entry.extend(value.into_vec());
                CString::new(entry).ok()
            })
            .collect();

        let argv = null_terminated(&args);
        let envp = null_terminated(&env);

        unsafe { execve(&path, argv.as_ptr(), envp.as_ptr()) }
    }

    fn sleep(&mut self, duration: Duration) {
        rt::sleep(duration)
    }
}

fn null_terminated(strings: &[CString]) -> Vec<*const u8> {
    strings
        .iter()
        .map(|s| s.as_ptr().cast())
        .chain([ptr::null()])
        .collect()
}
