use std::{io, mem::MaybeUninit};

use crate::cutils::cerr;

/// A set of signals, as used for the signal mask of the calling thread.
#[derive(Clone, Copy)]
pub(crate) struct SignalSet {
    raw: libc::sigset_t,
}

impl SignalSet {
    pub(crate) fn empty() -> io::Result<Self> {
        Self::init(libc::sigemptyset)
    }

    pub(crate) fn full() -> io::Result<Self> {
        Self::init(libc::sigfillset)
    }

    fn init(fill: unsafe extern "C" fn(*mut libc::sigset_t) -> libc::c_int) -> io::Result<Self> {
        let mut raw = MaybeUninit::<libc::sigset_t>::uninit();
        cerr(unsafe { fill(raw.as_mut_ptr()) })?;
        // SAFETY: `fill` initialized the set.
        Ok(Self {
            raw: unsafe { raw.assume_init() },
        })
    }

    pub(super) fn raw(&self) -> libc::sigset_t {
        self.raw
    }

    /// Add this set to the blocked signals. Returns the mask as it was before.
    pub(crate) fn block(&self) -> io::Result<Self> {
        self.change_mask(libc::SIG_BLOCK)
    }

    /// Block exactly the signals in this set.
    pub(crate) fn set_mask(&self) -> io::Result<()> {
        self.change_mask(libc::SIG_SETMASK).map(drop)
    }

    fn change_mask(&self, how: libc::c_int) -> io::Result<Self> {
        let mut previous = MaybeUninit::<libc::sigset_t>::uninit();
        cerr(unsafe { libc::sigprocmask(how, &self.raw, previous.as_mut_ptr()) })?;
        // SAFETY: `sigprocmask` succeeded, so it stored the previous mask.
        Ok(Self {
            raw: unsafe { previous.assume_init() },
        })
    }

    #[cfg(test)]
    fn contains(&self, signal: super::SignalNumber) -> bool {
        unsafe { libc::sigismember(&self.raw, signal) == 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::SignalSet;
    use crate::system::signal::consts::{SIGCHLD, SIGUSR1};

    #[test]
    fn block_returns_the_previous_mask() {
        assert!(SignalSet::full().unwrap().contains(SIGCHLD));
        assert!(!SignalSet::empty().unwrap().contains(SIGCHLD));

        // the mask is per thread, so this does not leak into other tests
        std::thread::spawn(|| {
            let original = SignalSet::full().unwrap().block().unwrap();
            assert!(!original.contains(SIGUSR1));

            let blocked = SignalSet::empty().unwrap().block().unwrap();
            assert!(blocked.contains(SIGUSR1));

            original.set_mask().unwrap();
            let restored = SignalSet::empty().unwrap().block().unwrap();
            assert!(!restored.contains(SIGUSR1));
        })
        .join()
        .unwrap();
    }
}
