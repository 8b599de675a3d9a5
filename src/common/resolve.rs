use std::{
    env,
    ffi::{OsStr, OsString},
    fs,
    os::unix::prelude::MetadataExt,
    path::{Path, PathBuf},
};

/// Directories searched after the working directory, fixed at build time.
pub const PATH_FALLBACK: &str = env!("MSH_PATH_FALLBACK");

pub(crate) fn is_valid_executable(path: &PathBuf) -> bool {
    if path.is_file() {
        match fs::metadata(path) {
            Ok(meta) => meta.mode() & 0o111 != 0,
            _ => false,
        }
    } else {
        false
    }
}

/// The search path used to run external commands from `cwd`: the working directory first,
/// then [`PATH_FALLBACK`].
pub(crate) fn search_path(cwd: &Path) -> OsString {
    let mut path = cwd.as_os_str().to_owned();
    path.push(":");
    path.push(PATH_FALLBACK);
    path
}

//checks whether the command is actually describing a qualified path (i.e. contains "/")
//or just specifying the name of a file (in which case we are going to resolve it via PATH)
pub(crate) fn is_qualified(command: &str) -> bool {
    command.contains('/')
}

/// Resolve a executable name against a `:`-separated list of directories.
/// When resolving a path, this code checks whether the target file is
/// a regular file and has any executable bits set. It does not specifically
/// check for user, group, or others' executable bit.
pub(crate) fn resolve_path(command: &Path, path: &OsStr) -> Option<PathBuf> {
    env::split_paths(path)
        // ignore all relative paths ("", "." or "./")
        .filter(|path| path.is_absolute())
        // construct a possible executable absolute path candidate
        .map(|path| path.join(command))
        // check whether the candidate is a regular file and any executable flag is set
        .find(is_valid_executable)
}

/// Find the program an external command refers to. Qualified names are taken as given.
pub(crate) fn resolve_command(command: &str, path: &OsStr) -> Option<PathBuf> {
    if is_qualified(command) {
        Some(PathBuf::from(command))
    } else {
        resolve_path(Path::new(command), path)
    }
}
