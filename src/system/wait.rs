use std::io;

use libc::{c_int, WCONTINUED, WNOHANG, WUNTRACED};

use crate::cutils::cerr;
use crate::system::{interface::ProcessId, signal::SignalNumber};

mod sealed {
    pub(crate) trait Sealed {}

    impl Sealed for crate::system::interface::ProcessId {}
}

pub(crate) trait Wait: sealed::Sealed {
    /// Wait for a child to change state. With [`ProcessId::ANY`] this is any child.
    fn wait(self, options: WaitOptions) -> Result<(ProcessId, WaitStatus), WaitError>;
}

impl Wait for ProcessId {
    fn wait(self, options: WaitOptions) -> Result<(ProcessId, WaitStatus), WaitError> {
        let mut raw: c_int = 0;

        let pid = cerr(unsafe { libc::waitpid(self.get(), &mut raw, options.flags) })
            .map_err(WaitError::Io)?;

        if pid == 0 && options.flags & WNOHANG != 0 {
            return Err(WaitError::NotReady);
        }

        let status = WaitStatus::from_raw(raw).ok_or(WaitError::Unknown(raw))?;
        Ok((ProcessId::new(pid), status))
    }
}

#[derive(Debug)]
pub enum WaitError {
    /// No child has a state change to report. Only with [`WaitOptions::no_hang`].
    NotReady,
    /// `waitpid` reported a status that is none of the known kinds.
    Unknown(c_int),
    Io(io::Error),
}

impl WaitError {
    /// Whether the error means that there are no children left to wait for.
    pub fn is_no_child(&self) -> bool {
        matches!(self, WaitError::Io(err) if err.raw_os_error() == Some(libc::ECHILD))
    }
}

/// Which state changes [`Wait::wait`] reports. By default only terminations, blocking.
pub struct WaitOptions {
    flags: c_int,
}

impl WaitOptions {
    pub const fn new() -> Self {
        Self { flags: 0 }
    }

    /// Do not block when no child has changed state.
    pub const fn no_hang(mut self) -> Self {
        self.flags |= WNOHANG;
        self
    }

    /// Also report children that were stopped.
    pub const fn untraced(mut self) -> Self {
        self.flags |= WUNTRACED;
        self
    }

    /// Also report stopped children that were resumed by `SIGCONT`.
    pub const fn continued(mut self) -> Self {
        self.flags |= WCONTINUED;
        self
    }
}

/// A state change of a child.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitStatus {
    Exited(c_int),
    Signaled(SignalNumber),
    Stopped(SignalNumber),
    Continued,
}

impl WaitStatus {
    fn from_raw(raw: c_int) -> Option<Self> {
        if libc::WIFEXITED(raw) {
            Some(Self::Exited(libc::WEXITSTATUS(raw)))
        } else if libc::WIFSIGNALED(raw) {
            Some(Self::Signaled(libc::WTERMSIG(raw)))
        } else if libc::WIFSTOPPED(raw) {
            Some(Self::Stopped(libc::WSTOPSIG(raw)))
        } else if libc::WIFCONTINUED(raw) {
            Some(Self::Continued)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use libc::{SIGCONT, SIGKILL, SIGSTOP};
    use pretty_assertions::assert_eq;

    use super::{Wait, WaitError, WaitOptions, WaitStatus};
    use crate::system::{interface::ProcessId, kill};

    fn spawn_sh(script: &str) -> ProcessId {
        let child = std::process::Command::new("sh")
            .args(["-c", script])
            .spawn()
            .unwrap();

        ProcessId::new(child.id() as i32)
    }

    #[test]
    fn exit_status() {
        let child = spawn_sh("sleep 0.1; exit 42");

        let (pid, status) = child.wait(WaitOptions::new()).unwrap();
        assert_eq!(pid, child);
        assert_eq!(status, WaitStatus::Exited(42));

        // the child is gone now
        assert!(child.wait(WaitOptions::new()).unwrap_err().is_no_child());
    }

    #[test]
    fn stop_continue_kill() {
        let child = spawn_sh("sleep 1; exit 42");

        kill(child, SIGSTOP).unwrap();
        let (_, status) = child.wait(WaitOptions::new().untraced()).unwrap();
        assert_eq!(status, WaitStatus::Stopped(SIGSTOP));

        kill(child, SIGCONT).unwrap();
        let (_, status) = child.wait(WaitOptions::new().continued()).unwrap();
        assert_eq!(status, WaitStatus::Continued);

        kill(child, SIGKILL).unwrap();
        let (_, status) = child.wait(WaitOptions::new()).unwrap();
        assert_eq!(status, WaitStatus::Signaled(SIGKILL));
    }

    #[test]
    fn no_hang() {
        let child = spawn_sh("sleep 0.1; exit 7");

        let mut polls = 0;
        let status = loop {
            match child.wait(WaitOptions::new().no_hang()) {
                Ok((_, status)) => break status,
                Err(WaitError::NotReady) => polls += 1,
                Err(err) => panic!("{err:?}"),
            }
        };

        assert_eq!(status, WaitStatus::Exited(7));
        assert!(polls > 0);
    }

    #[test]
    fn decoding() {
        assert_eq!(WaitStatus::from_raw(0), Some(WaitStatus::Exited(0)));
        assert_eq!(WaitStatus::from_raw(5 << 8), Some(WaitStatus::Exited(5)));
        assert_eq!(WaitStatus::from_raw(SIGKILL), Some(WaitStatus::Signaled(SIGKILL)));
        assert_eq!(
            WaitStatus::from_raw((SIGSTOP << 8) | 0x7f),
            Some(WaitStatus::Stopped(SIGSTOP))
        );
        assert_eq!(WaitStatus::from_raw(0xffff), Some(WaitStatus::Continued));
    }
}
