use std::{io, mem::MaybeUninit};

use crate::{
    cutils::cerr,
    log::{dev_error, dev_warn},
};

use super::{consts::*, set::SignalSet, signal_name, SignalNumber};

/// What happens when a signal arrives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SignalHandlerBehavior {
    Default,
    Ignore,
    /// Write the signal information to the [`super::SignalStream`] of the process.
    Stream,
}

impl SignalHandlerBehavior {
    fn action(self) -> io::Result<libc::sigaction> {
        // SAFETY: all-zeroes is a valid `sigaction`; the fields that matter are set below.
        let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
        // Interrupted syscalls are restarted, except `poll`, which the event loop retries.
        action.sa_flags = libc::SA_RESTART;

        match self {
            Self::Default => {
                action.sa_sigaction = libc::SIG_DFL;
                action.sa_mask = SignalSet::empty()?.raw();
            }
            Self::Ignore => {
                action.sa_sigaction = libc::SIG_IGN;
                action.sa_mask = SignalSet::empty()?.raw();
            }
            Self::Stream => {
                action.sa_flags |= libc::SA_SIGINFO;
                action.sa_sigaction = super::stream::send_siginfo as libc::sighandler_t;
                // nothing may interrupt the handler halfway through a write
                action.sa_mask = SignalSet::full()?.raw();
            }
        }

        Ok(action)
    }
}

/// Install `action` for `signal`, returning the action it replaces.
fn swap_action(signal: SignalNumber, action: &libc::sigaction) -> io::Result<libc::sigaction> {
    let mut previous = MaybeUninit::<libc::sigaction>::uninit();
    cerr(unsafe { libc::sigaction(signal, action, previous.as_mut_ptr()) })?;
    // SAFETY: `sigaction` succeeded, so it stored the previous action.
    Ok(unsafe { previous.assume_init() })
}

/// The disposition of one signal, restored to what it was before when dropped.
pub(crate) struct SignalHandler {
    signal: SignalNumber,
    previous: libc::sigaction,
}

impl SignalHandler {
    /// # Panics
    ///
    /// If `signal` is SIGKILL or SIGSTOP, whose disposition cannot be changed.
    pub(crate) fn register(
        signal: SignalNumber,
        behavior: SignalHandlerBehavior,
    ) -> io::Result<Self> {
        assert!(
            signal != SIGKILL && signal != SIGSTOP,
            "{} cannot be handled",
            signal_name(signal)
        );

        let previous = swap_action(signal, &behavior.action()?)?;

        Ok(Self { signal, previous })
    }

    /// Keep the current disposition after this handler is gone.
    pub(crate) fn forget(self) {
        std::mem::forget(self)
    }
}

impl Drop for SignalHandler {
    fn drop(&mut self) {
        if let Err(err) = swap_action(self.signal, &self.previous) {
            dev_warn!("cannot restore the action for {}: {err}", signal_name(self.signal));
        }
    }
}

/// Give every signal in `signals` the same behavior.
pub(crate) fn register_handlers<const N: usize>(
    signals: [SignalNumber; N],
    behavior: SignalHandlerBehavior,
) -> io::Result<Vec<SignalHandler>> {
    signals
        .into_iter()
        .map(|signal| {
            SignalHandler::register(signal, behavior).map_err(|err| {
                dev_error!("cannot set up {behavior:?} for {}: {err}", signal_name(signal));
                err
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{swap_action, SignalHandler, SignalHandlerBehavior};
    use crate::system::signal::consts::{SIGUSR1, SIGWINCH};

    fn current_handler(signal: i32) -> libc::sighandler_t {
        // SAFETY: a null action only queries the current one.
        let mut current: libc::sigaction = unsafe { std::mem::zeroed() };
        unsafe { libc::sigaction(signal, std::ptr::null(), &mut current) };
        current.sa_sigaction
    }

    #[test]
    fn dropping_restores_the_previous_action() {
        let before = current_handler(SIGUSR1);

        let handler = SignalHandler::register(SIGUSR1, SignalHandlerBehavior::Ignore).unwrap();
        assert_eq!(current_handler(SIGUSR1), libc::SIG_IGN);

        drop(handler);
        assert_eq!(current_handler(SIGUSR1), before);
    }

    #[test]
    fn swapping_returns_the_replaced_action() {
        let ignore = SignalHandlerBehavior::Ignore.action().unwrap();
        let previous = swap_action(SIGWINCH, &ignore).unwrap();
        let replaced = swap_action(SIGWINCH, &previous).unwrap();
        assert_eq!(replaced.sa_sigaction, libc::SIG_IGN);
    }

    #[test]
    #[should_panic]
    fn sigkill_cannot_be_handled() {
        let _ = SignalHandler::register(
            crate::system::signal::consts::SIGKILL,
            SignalHandlerBehavior::Default,
        );
    }
}
