//! Cross-process storage of the working directory and of the pids each coordinator spawned.
use std::{
    ffi::OsString,
    fs::{self, DirBuilder, OpenOptions},
    io::{self, Write},
    os::unix::{
        ffi::{OsStrExt, OsStringExt},
        fs::DirBuilderExt,
    },
    path::{Path, PathBuf},
};

use crate::{
    log::{dev_info, dev_warn},
    system::{interface::ProcessId, kill},
};

/// Storage shared by every process of one shell instance, keyed by process id.
///
/// Writes for one key are serialized by the job-control protocol, so implementations only need
/// read-your-writes consistency.
pub trait JobStateStore {
    fn set_cwd(&self, pid: ProcessId, path: &Path) -> io::Result<()>;
    fn get_cwd(&self, pid: ProcessId) -> io::Result<PathBuf>;
    fn append_spawned_pid(&self, pid: ProcessId, spawned: ProcessId) -> io::Result<()>;
    /// Returns the pids appended for `pid`, oldest first, and forgets them.
    fn drain_spawned_pids(&self, pid: ProcessId) -> io::Result<Vec<ProcessId>>;
}

const DIR_PREFIX: &str = "msh-";

/// A [`JobStateStore`] backed by one private directory under the system temporary directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create the store owned by the controller `owner`, sweeping the stores left behind by
    /// shells that are gone.
    pub fn create(owner: ProcessId) -> io::Result<Self> {
        Self::create_in(&std::env::temp_dir(), owner)
    }

    fn create_in(root: &Path, owner: ProcessId) -> io::Result<Self> {
        sweep_stale(root, owner);

        let dir = root.join(format!("{DIR_PREFIX}{owner}"));
        DirBuilder::new().recursive(true).mode(0o700).create(&dir)?;
        dev_info!("job state store at {}", dir.display());

        Ok(Self { dir })
    }

    /// Delete the store and everything in it.
    pub fn remove(self) -> io::Result<()> {
        fs::remove_dir_all(&self.dir)
    }

    fn entry(&self, pid: ProcessId, kind: &str) -> PathBuf {
        self.dir.join(format!("{pid}.{kind}"))
    }
}

impl JobStateStore for FileStore {
    fn set_cwd(&self, pid: ProcessId, path: &Path) -> io::Result<()> {
        fs::write(self.entry(pid, "cwd"), path.as_os_str().as_bytes())
    }

    fn get_cwd(&self, pid: ProcessId) -> io::Result<PathBuf> {
        let bytes = fs::read(self.entry(pid, "cwd"))?;
        Ok(OsString::from_vec(bytes).into())
    }

    fn append_spawned_pid(&self, pid: ProcessId, spawned: ProcessId) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.entry(pid, "pids"))?;
        file.write_all(format!("{spawned}\n").as_bytes())
    }

    fn drain_spawned_pids(&self, pid: ProcessId) -> io::Result<Vec<ProcessId>> {
        let path = self.entry(pid, "pids");
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        fs::remove_file(&path)?;

        let pids = contents
            .lines()
            .filter_map(|line| {
                let parsed = line.parse().ok();
                if parsed.is_none() {
                    dev_warn!("ignoring malformed pid {line:?} in {}", path.display());
                }
                parsed
            })
            .collect();

        Ok(pids)
    }
}

/// Remove `msh-<pid>` directories under `root` whose shell no longer exists.
fn sweep_stale(root: &Path, owner: ProcessId) {
    let Ok(pattern) = glob::Pattern::new(&format!("{DIR_PREFIX}[0-9]*")) else {
        return;
    };
    let opts = glob::MatchOptions {
        require_literal_separator: true,
        ..glob::MatchOptions::new()
    };

    let Ok(entries) = fs::read_dir(root) else {
        return;
    };

    for entry in entries.filter_map(Result::ok) {
        let name = entry.file_name();
        if !pattern.matches_path_with(Path::new(&name), opts) {
            continue;
        }
        let Some(pid) = name
            .to_str()
            .and_then(|name| name.strip_prefix(DIR_PREFIX))
            .and_then(|pid| pid.parse::<ProcessId>().ok())
        else {
            continue;
        };

        let is_dir = entry.file_type().map(|kind| kind.is_dir()).unwrap_or(false);
        if pid == owner || !is_dir || is_alive(pid) {
            continue;
        }

        match fs::remove_dir_all(entry.path()) {
            Ok(()) => dev_info!("removed stale job state store of {pid}"),
            Err(err) => dev_warn!("cannot remove stale job state store of {pid}: {err}"),
        }
    }
}

fn is_alive(pid: ProcessId) -> bool {
    match kill(pid, 0) {
        Ok(()) => true,
        Err(err) => err.raw_os_error() != Some(libc::ESRCH),
    }
}

#[cfg(test)]
pub(crate) use memory::MemoryStore;

#[cfg(test)]
mod memory {
    use std::{cell::RefCell, collections::HashMap, io, path::Path, path::PathBuf};

    use crate::system::interface::ProcessId;

    use super::JobStateStore;

    /// A [`JobStateStore`] that only lives in the calling process.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        cwds: RefCell<HashMap<ProcessId, PathBuf>>,
        pids: RefCell<HashMap<ProcessId, Vec<ProcessId>>>,
    }

    impl JobStateStore for MemoryStore {
        fn set_cwd(&self, pid: ProcessId, path: &Path) -> io::Result<()> {
            self.cwds.borrow_mut().insert(pid, path.to_path_buf());
            Ok(())
        }

        fn get_cwd(&self, pid: ProcessId) -> io::Result<PathBuf> {
            self.cwds
                .borrow()
                .get(&pid)
                .cloned()
                .ok_or_else(|| io::ErrorKind::NotFound.into())
        }

        fn append_spawned_pid(&self, pid: ProcessId, spawned: ProcessId) -> io::Result<()> {
            self.pids.borrow_mut().entry(pid).or_default().push(spawned);
            Ok(())
        }

        fn drain_spawned_pids(&self, pid: ProcessId) -> io::Result<Vec<ProcessId>> {
            Ok(self.pids.borrow_mut().remove(&pid).unwrap_or_default())
        }
    }
}
