use crate::system::interface::ProcessId;

use super::SignalNumber;

/// The `siginfo_t` a streamed signal arrived with.
#[repr(transparent)]
pub(crate) struct SignalInfo {
    info: libc::siginfo_t,
}

impl SignalInfo {
    pub(super) const SIZE: usize = std::mem::size_of::<Self>();

    pub(crate) fn signal(&self) -> SignalNumber {
        self.info.si_signo
    }

    /// Whether the signal came from `kill` or `sigqueue` rather than from the kernel.
    pub(crate) fn is_user_signaled(&self) -> bool {
        // SI_USER and SI_QUEUE are not exported by libc; both are non-positive.
        self.info.si_code <= 0
    }

    /// The sender. Only meaningful for user signals and SIGCHLD.
    pub(crate) fn pid(&self) -> ProcessId {
        ProcessId::new(unsafe { self.info.si_pid() })
    }
}
