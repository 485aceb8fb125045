#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    io,
    time::Duration,
};

use arrayvec::ArrayVec;
use camino::{Utf8Path, Utf8PathBuf};
use rootswitch::{
    config::{Discovery, Layout},
    host::{Host, Mount},
    subprocess::{Outcome, SubprocessResult, OUTPUT_CAPACITY},
};
use rustix::{fs::Mode, io::Errno, mount::MountFlags};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Chdir(String),
    Setsid,
    SetEnv(String, String),
    Mount {
        source: String,
        target: String,
        fstype: String,
        read_only: bool,
        data: String,
    },
    MoveMount(String, String),
    PivotRoot(String, String),
    Mkdir(String),
    WriteFile(String),
    OpenImage(String),
    AttachLoop(String),
    Run(String, Vec<String>),
    Exec(String, Vec<String>),
    ListDir(String),
}

impl Call {
    pub fn mount(source: &str, target: &str, fstype: &str) -> Self {
        Self::Mount {
            source: source.into(),
            target: target.into(),
            fstype: fstype.into(),
            read_only: false,
            data: String::new(),
        }
    }

    /// Anything that changes the machine.
    pub fn mutates(&self) -> bool {
        !matches!(self, Self::ListDir(_))
    }
}

/// Records every call and answers from its configured state.
#[derive(Debug)]
pub struct MockHost {
    pub init: bool,
    pub files: HashMap<Utf8PathBuf, Vec<u8>>,
    /// Device node and the number of `exists` checks it takes to show up.
    pub devices: HashMap<Utf8PathBuf, u32>,
    pub dev_listing: Vec<String>,
    pub busy_loops: HashSet<Utf8PathBuf>,
    /// Mounts whose source or target is listed fail.
    pub failing_mounts: HashSet<String>,
    pub fail_pivot: bool,
    /// `None` makes the helper fail to start.
    pub helper: Option<Outcome>,
    pub helper_output: &'static [u8],
    pub exec_error: Errno,

    pub calls: Vec<Call>,
    pub sleeps: u32,
    pub slept: Duration,
    checks: HashMap<Utf8PathBuf, u32>,
}

impl MockHost {
    pub fn new(cmdline: &str) -> Self {
        let mut files = HashMap::new();
        files.insert(Utf8PathBuf::from("/proc/cmdline"), cmdline.as_bytes().to_vec());

        Self {
            init: true,
            files,
            devices: HashMap::new(),
            dev_listing: vec!["console".into(), "null".into(), "mmcblk0".into()],
            busy_loops: HashSet::new(),
            failing_mounts: HashSet::new(),
            fail_pivot: false,
            helper: Some(Outcome::Exited(0)),
            helper_output: b"",
            exec_error: Errno::NOENT,
            calls: Vec::new(),
            sleeps: 0,
            slept: Duration::ZERO,
            checks: HashMap::new(),
        }
    }

    pub fn with_device(mut self, device: &str) -> Self {
        self.devices.insert(device.into(), 0);
        self
    }

    pub fn with_file(mut self, path: &str, contents: &[u8]) -> Self {
        self.files.insert(path.into(), contents.to_vec());
        self
    }

    pub fn with_failing_mount(mut self, source_or_target: &str) -> Self {
        self.failing_mounts.insert(source_or_target.into());
        self
    }

    pub fn ran_helper(&self) -> bool {
        self.calls.iter().any(|call| matches!(call, Call::Run(..)))
    }

    pub fn attached_loop(&self) -> bool {
        self.calls
            .iter()
            .any(|call| matches!(call, Call::OpenImage(_) | Call::AttachLoop(_)))
    }

    pub fn mounts(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Mount { .. }))
            .collect()
    }
}

impl Host for MockHost {
    type Image = Utf8PathBuf;

    fn is_init(&self) -> bool {
        self.init
    }

    fn exists(&mut self, path: &Utf8Path) -> bool {
        if self.files.contains_key(path) {
            return true;
        }

        let Some(&after) = self.devices.get(path) else {
            return false;
        };

        let checks = self.checks.entry(path.to_owned()).or_default();
        *checks += 1;
        *checks > after
    }

    fn list_dir(&mut self, path: &Utf8Path) -> Result<Vec<String>, Errno> {
        self.calls.push(Call::ListDir(path.to_string()));
        Ok(self.dev_listing.clone())
    }

    fn read_file(&mut self, path: &Utf8Path, limit: usize) -> Result<Vec<u8>, Errno> {
        let contents = self.files.get(path).ok_or(Errno::NOENT)?;
        Ok(contents[..contents.len().min(limit)].to_vec())
    }

    fn write_file(&mut self, path: &Utf8Path, _contents: &[u8]) -> Result<(), Errno> {
        self.calls.push(Call::WriteFile(path.to_string()));
        Ok(())
    }

    fn mkdir(&mut self, path: &Utf8Path, _mode: Mode) -> Result<(), Errno> {
        self.calls.push(Call::Mkdir(path.to_string()));
        Err(Errno::EXIST)
    }

    fn chdir(&mut self, path: &Utf8Path) -> Result<(), Errno> {
        self.calls.push(Call::Chdir(path.to_string()));
        Ok(())
    }

    fn setsid(&mut self) -> Result<(), Errno> {
        self.calls.push(Call::Setsid);
        Ok(())
    }

    fn set_env(&mut self, key: &str, value: &str) {
        self.calls.push(Call::SetEnv(key.into(), value.into()));
    }

    fn mount(&mut self, mount: &Mount<'_>) -> Result<(), Errno> {
        self.calls.push(Call::Mount {
            source: mount.source.into(),
            target: mount.target.to_string(),
            fstype: mount.fstype.into(),
            read_only: mount.flags.contains(MountFlags::RDONLY),
            data: mount.data.into(),
        });

        if self.failing_mounts.contains(mount.source)
            || self.failing_mounts.contains(mount.target.as_str())
        {
            return Err(Errno::INVAL);
        }

        Ok(())
    }

    fn move_mount(&mut self, from: &Utf8Path, to: &Utf8Path) -> Result<(), Errno> {
        self.calls
            .push(Call::MoveMount(from.to_string(), to.to_string()));
        Ok(())
    }

    fn pivot_root(&mut self, new_root: &Utf8Path, put_old: &Utf8Path) -> Result<(), Errno> {
        self.calls
            .push(Call::PivotRoot(new_root.to_string(), put_old.to_string()));

        if self.fail_pivot {
            return Err(Errno::BUSY);
        }

        Ok(())
    }

    fn open_image(&mut self, path: &Utf8Path) -> Result<Utf8PathBuf, Errno> {
        self.calls.push(Call::OpenImage(path.to_string()));

        if self.files.contains_key(path) {
            Ok(path.to_owned())
        } else {
            Err(Errno::NOENT)
        }
    }

    fn attach_loop(&mut self, device: &Utf8Path, _image: &Utf8PathBuf) -> Result<(), Errno> {
        self.calls.push(Call::AttachLoop(device.to_string()));

        if self.busy_loops.contains(device) {
            Err(Errno::BUSY)
        } else {
            Ok(())
        }
    }

    fn run(&mut self, program: &Utf8Path, args: &[&str]) -> io::Result<SubprocessResult> {
        self.calls.push(Call::Run(
            program.to_string(),
            args.iter().map(|arg| arg.to_string()).collect(),
        ));

        let outcome = self
            .helper
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;

        let mut stdout = ArrayVec::new();
        stdout.extend(self.helper_output.iter().copied().take(OUTPUT_CAPACITY));

        Ok(SubprocessResult { outcome, stdout })
    }

    fn exec(&mut self, program: &Utf8Path, argv: &[&str]) -> Errno {
        self.calls.push(Call::Exec(
            program.to_string(),
            argv.iter().map(|arg| arg.to_string()).collect(),
        ));
        self.exec_error
    }

    fn sleep(&mut self, duration: Duration) {
        self.sleeps += 1;
        self.slept += duration;
    }
}

/// Default layout with a discovery budget small enough for tests.
pub fn layout() -> Layout {
    Layout {
        discovery: Discovery {
            attempts: 50,
            ..Discovery::default()
        },
        ..Layout::default()
    }
}
