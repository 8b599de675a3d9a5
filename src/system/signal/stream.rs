use std::{
    io,
    mem::MaybeUninit,
    os::{
        fd::{AsRawFd, RawFd},
        unix::net::UnixStream,
    },
    sync::atomic::{AtomicI32, Ordering},
};

use crate::{cutils::cerr, log::dev_error};

use super::{info::SignalInfo, SignalNumber};

/// Sending side of the stream owned by the calling process, `-1` if there is none.
static TX: AtomicI32 = AtomicI32::new(-1);

pub(super) extern "C" fn send_siginfo(
    _signal: SignalNumber,
    info: *const SignalInfo,
    _context: *const libc::c_void,
) {
    let tx = TX.load(Ordering::Relaxed);
    if tx != -1 {
        unsafe { libc::send(tx, info.cast(), SignalInfo::SIZE, libc::MSG_DONTWAIT) };
    }
}

/// A type able to receive signal information from any [`super::SignalHandler`] with the
/// [`super::SignalHandlerBehavior::Stream`] behavior.
///
/// There is at most one live stream per process. A forked child inherits the stream of its
/// parent and must open its own before unblocking signals, otherwise the information of the
/// signals it receives would be delivered to its parent.
pub(crate) struct SignalStream {
    rx: UnixStream,
    tx: UnixStream,
}

impl SignalStream {
    /// Open the stream of the calling process, replacing any stream inherited through `fork`.
    pub(crate) fn open() -> io::Result<Self> {
        let (rx, tx) = UnixStream::pair().map_err(|err| {
            dev_error!("cannot create socket pair for `SignalStream`: {err}");
            err
        })?;

        TX.store(tx.as_raw_fd(), Ordering::SeqCst);

        Ok(Self { rx, tx })
    }

    /// Receives the information related to the arrival of a signal.
    pub(crate) fn recv(&self) -> io::Result<SignalInfo> {
        let mut info = MaybeUninit::<SignalInfo>::uninit();
        let fd = self.rx.as_raw_fd();
        let bytes = cerr(unsafe { libc::recv(fd, info.as_mut_ptr().cast(), SignalInfo::SIZE, 0) })?;

        if bytes as usize != SignalInfo::SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Not enough bytes when receiving `siginfo_t`",
            ));
        }
        // SAFETY: we can assume `info` is initialized because `recv` wrote enough bytes to fill
        // the value and `siginfo_t` is POD.
        Ok(unsafe { info.assume_init() })
    }
}

impl Drop for SignalStream {
    fn drop(&mut self) {
        let _ = TX.compare_exchange(
            self.tx.as_raw_fd(),
            -1,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

impl AsRawFd for SignalStream {
    fn as_raw_fd(&self) -> RawFd {
        self.rx.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use crate::system::{
        getpid, kill,
        signal::{consts::SIGUSR2, SignalHandler, SignalHandlerBehavior},
    };

    use super::SignalStream;

    #[test]
    fn streams_signal_information() {
        let stream = SignalStream::open().unwrap();
        let handler = SignalHandler::register(SIGUSR2, SignalHandlerBehavior::Stream).unwrap();

        kill(getpid(), SIGUSR2).unwrap();

        let info = stream.recv().unwrap();
        assert_eq!(info.signal(), SIGUSR2);
        assert_eq!(info.pid(), getpid());
        assert!(info.is_user_signaled());

        drop(handler);
    }
}
