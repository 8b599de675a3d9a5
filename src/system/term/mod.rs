use std::{io, os::fd::AsRawFd};

use crate::cutils::cerr;

use super::interface::ProcessId;

mod sealed {
    use std::os::fd::AsRawFd;

    pub(crate) trait Sealed {}

    impl<F: AsRawFd> Sealed for F {}
}

pub(crate) trait Terminal: sealed::Sealed {
    fn tcgetpgrp(&self) -> io::Result<ProcessId>;
    fn tcsetpgrp(&self, pgrp: ProcessId) -> io::Result<()>;
}

impl<F: AsRawFd> Terminal for F {
    /// Get the foreground process group ID associated with this terminal.
    fn tcgetpgrp(&self) -> io::Result<ProcessId> {
        cerr(unsafe { libc::tcgetpgrp(self.as_raw_fd()) }).map(ProcessId::new)
    }

    /// Set the foreground process group ID associated with this terminal to `pgrp`.
    fn tcsetpgrp(&self, pgrp: ProcessId) -> io::Result<()> {
        cerr(unsafe { libc::tcsetpgrp(self.as_raw_fd(), pgrp.get()) }).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::Terminal;

    #[test]
    fn regular_files_are_not_terminals() {
        let file = File::open("/dev/null").unwrap();
        assert_eq!(
            file.tcgetpgrp().unwrap_err().raw_os_error(),
            Some(libc::ENOTTY)
        );
    }
}
