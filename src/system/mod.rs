use std::{ffi::c_uint, io};

use crate::cutils::cerr;
use interface::ProcessId;
use libc::STDERR_FILENO;

use self::signal::SignalNumber;

// generalized traits for when we want to hide implementations
pub mod interface;

pub mod poll;

pub mod signal;

pub mod term;

pub mod wait;

pub(crate) fn _exit(status: libc::c_int) -> ! {
    unsafe { libc::_exit(status) }
}

/// Close every file descriptor other than the standard streams.
pub(crate) fn close_inherited_fds() -> io::Result<()> {
    close_range(STDERR_FILENO as c_uint + 1, c_uint::MAX)
}

#[cfg(target_os = "linux")]
fn close_range(min_fd: c_uint, max_fd: c_uint) -> io::Result<()> {
    if min_fd > max_fd {
        return Ok(());
    }

    match cerr(unsafe { libc::syscall(libc::SYS_close_range, min_fd, max_fd, 0 as c_uint) }) {
        // kernels before 5.9
        Err(err) if err.raw_os_error() == Some(libc::ENOSYS) => close_each(min_fd, max_fd),
        result => result.map(|_| ()),
    }
}

#[cfg(not(target_os = "linux"))]
fn close_range(min_fd: c_uint, max_fd: c_uint) -> io::Result<()> {
    close_each(min_fd, max_fd)
}

/// Close descriptors one by one, up to the soft limit on open files.
fn close_each(min_fd: c_uint, max_fd: c_uint) -> io::Result<()> {
    let limit = cerr(unsafe { libc::sysconf(libc::_SC_OPEN_MAX) })?;
    let max_fd = max_fd.min(limit.try_into().unwrap_or(c_uint::MAX));
    for fd in min_fd..=max_fd {
        unsafe { libc::close(fd as libc::c_int) };
    }

    Ok(())
}

pub(crate) enum ForkResult {
    // Parent process branch with the child process' PID.
    Parent(ProcessId),
    // Child process branch.
    Child,
}

/// Create a new process.
///
/// The shell is single threaded, so the child is free to call any function after `fork` returns.
pub(crate) fn fork() -> io::Result<ForkResult> {
    let pid = cerr(unsafe { libc::fork() })?;
    if pid == 0 {
        Ok(ForkResult::Child)
    } else {
        Ok(ForkResult::Parent(ProcessId::new(pid)))
    }
}

/// Get the process ID of the current process.
pub fn getpid() -> ProcessId {
    ProcessId::new(unsafe { libc::getpid() })
}

/// Send a signal to a process with the specified ID.
pub fn kill(pid: ProcessId, signal: SignalNumber) -> io::Result<()> {
    // SAFETY: This function cannot cause UB even if `pid` is not a valid process ID or if
    // `signal` is not a valid signal code.
    cerr(unsafe { libc::kill(pid.get(), signal) }).map(|_| ())
}

/// Send a signal to a process group with the specified ID.
pub fn killpg(pgid: ProcessId, signal: SignalNumber) -> io::Result<()> {
    // SAFETY: This function cannot cause UB even if `pgid` is not a valid process ID or if
    // `signal` is not a valid signal code.
    cerr(unsafe { libc::killpg(pgid.get(), signal) }).map(|_| ())
}

/// Get the process group ID of the current process.
pub fn getpgrp() -> ProcessId {
    ProcessId::new(unsafe { libc::getpgrp() })
}

/// Get a process group ID.
#[cfg(test)]
pub fn getpgid(pid: ProcessId) -> io::Result<ProcessId> {
    // SAFETY: This function cannot cause UB even if `pid` is not a valid process ID
    cerr(unsafe { libc::getpgid(pid.get()) }).map(ProcessId::new)
}

/// Set a process group ID.
pub fn setpgid(pid: ProcessId, pgid: ProcessId) -> io::Result<()> {
    cerr(unsafe { libc::setpgid(pid.get(), pgid.get()) }).map(|_| ())
}

#[cfg(test)]
mod tests {
    use std::{
        fs::File,
        io::{self, Read, Write},
        os::{fd::AsRawFd, unix::net::UnixStream},
        thread::sleep,
        time::Duration,
    };

    use libc::{SIGKILL, SIGTERM};
    use pretty_assertions::assert_eq;

    use super::{
        _exit, fork, getpgid, getpgrp, getpid, interface::ProcessId, kill, killpg, setpgid,
        wait::{Wait, WaitOptions, WaitStatus},
        ForkResult,
    };

    /// Fork a child that sleeps for a second and then exits with 0.
    fn sleeping_child() -> ProcessId {
        match fork().unwrap() {
            ForkResult::Parent(pid) => pid,
            ForkResult::Child => {
                sleep(Duration::from_secs(1));
                _exit(0)
            }
        }
    }

    #[test]
    fn children_start_in_our_group() {
        let pgrp = getpgrp();
        assert_eq!(getpgid(ProcessId::SELF).unwrap(), pgrp);
        assert_eq!(getpgid(getpid()).unwrap(), pgrp);

        let child = sleeping_child();
        assert_eq!(getpgid(child).unwrap(), pgrp);

        // the way a resumed job detaches
        setpgid(child, child).unwrap();
        assert_eq!(getpgid(child).unwrap(), child);

        let (_, status) = child.wait(WaitOptions::new()).unwrap();
        assert_eq!(status, WaitStatus::Exited(0));
    }

    #[test]
    fn kill_terminates() {
        let child = sleeping_child();
        kill(child, SIGTERM).unwrap();

        let (_, status) = child.wait(WaitOptions::new()).unwrap();
        assert_eq!(status, WaitStatus::Signaled(SIGTERM));
    }

    #[test]
    fn killpg_reaches_the_whole_group() {
        // a child that survives writes to the socket
        let (mut rx, tx) = UnixStream::pair().unwrap();
        let children = [(); 2].map(|()| match fork().unwrap() {
            ForkResult::Parent(pid) => pid,
            ForkResult::Child => {
                sleep(Duration::from_secs(1));
                let _ = (&tx).write_all(&[1]);
                _exit(0)
            }
        });
        drop(tx);

        for child in children {
            setpgid(child, children[0]).unwrap();
        }
        killpg(children[0], SIGKILL).unwrap();

        let mut buf = Vec::new();
        rx.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, Vec::<u8>::new());

        for child in children {
            let (_, status) = child.wait(WaitOptions::new()).unwrap();
            assert_eq!(status, WaitStatus::Signaled(SIGKILL));
        }
    }

    fn is_closed<F: AsRawFd>(fd: &F) -> bool {
        crate::cutils::cerr(unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETFD) })
            .is_err_and(|err| err.raw_os_error() == Some(libc::EBADF))
    }

    #[test]
    fn close_inherited_fds() {
        let ForkResult::Parent(child_pid) = fork().unwrap() else {
            let Ok(should_close) = File::open("/dev/null") else {
                _exit(2);
            };

            if super::close_inherited_fds().is_err() {
                _exit(3);
            }

            let ok = is_closed(&should_close)
                && !is_closed(&io::stdin())
                && !is_closed(&io::stdout())
                && !is_closed(&io::stderr());

            _exit(if ok { 0 } else { 1 })
        };

        let (_, status) = child_pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(status, WaitStatus::Exited(0));
    }
}
