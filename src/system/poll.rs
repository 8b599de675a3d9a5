use std::{
    collections::BTreeMap,
    io,
    os::fd::{AsRawFd, RawFd},
};

use crate::cutils::cerr;
use libc::{c_short, pollfd, POLLERR, POLLHUP, POLLIN};

/// The kind of event that will be monitored for a file descriptor.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// Data may be read without blocking.
    Readable,
}

/// A set of indexed file descriptors to be polled using the [`poll`](https://manpage.me/?q=poll) system call.
pub struct PollSet<K> {
    fds: BTreeMap<K, (RawFd, bool, c_short)>,
}

impl<K: Eq + PartialEq + Ord + PartialOrd + Clone> PollSet<K> {
    /// Create an empty set of file descriptors.
    pub const fn new() -> Self {
        Self {
            fds: BTreeMap::new(),
        }
    }

    /// Add a file descriptor under the provided key. This descriptor will be checked for the given
    /// poll event.
    ///
    /// If the provided key is already in the set, calling this function will overwrite the file
    /// descriptor for that key.
    pub fn add_fd<F: AsRawFd>(&mut self, key: K, fd: &F, event: PollEvent) {
        let event = match event {
            PollEvent::Readable => POLLIN,
        };
        self.fds.insert(key, (fd.as_raw_fd(), true, event));
    }

    /// Remove the file descriptor under the provided key, returning whether it was present.
    pub fn remove_fd(&mut self, key: &K) -> bool {
        self.fds.remove(key).is_some()
    }

    /// Ignore the file descriptor under the provided key, if any.
    pub fn ignore_fd(&mut self, key: &K) {
        if let Some((_, should_poll, _)) = self.fds.get_mut(key) {
            *should_poll = false;
        }
    }

    /// Stop ignoring the file descriptor under the provided key, if any.
    pub fn resume_fd(&mut self, key: &K) {
        if let Some((_, should_poll, _)) = self.fds.get_mut(key) {
            *should_poll = true;
        }
    }

    /// Poll the set of file descriptors and return the key of the descriptors that are ready to be
    /// read.
    ///
    /// Calling this function will block until one of the file descriptors in the set is ready.
    /// A descriptor whose peer hung up counts as readable so the reader can observe the end of
    /// the stream.
    pub fn poll(&mut self) -> io::Result<Vec<K>> {
        let (keys, mut fds): (Vec<K>, Vec<pollfd>) = self
            .fds
            .iter()
            .filter(|(_, (_, should_poll, _))| *should_poll)
            .map(|(key, &(fd, _, events))| {
                (
                    key.clone(),
                    pollfd {
                        fd,
                        events,
                        revents: 0,
                    },
                )
            })
            .unzip();

        let n = cerr(unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as _, -1) })?;

        let mut ready = Vec::with_capacity(n as usize);

        for (key, fd) in keys.into_iter().zip(fds) {
            if fd.revents & (POLLIN | POLLHUP | POLLERR) != 0 {
                ready.push(key);
            }
        }

        Ok(ready)
    }
}
