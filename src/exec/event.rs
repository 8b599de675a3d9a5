use std::{collections::BTreeMap, os::fd::AsRawFd};

use crate::{
    log::dev_warn,
    system::poll::{PollEvent, PollSet},
};

pub(super) trait Process: Sized {
    /// IO Events that this process should handle.
    type Event: Copy + Eq;
    /// Reason why the event loop should break.
    ///
    /// See [`EventRegistry::set_break`] for more information.
    type Break;
    /// Reason why the event loop should exit.
    ///
    /// See [`EventRegistry::set_exit`] for more information.
    type Exit;
    /// Handle the corresponding event.
    fn on_event(&mut self, event: Self::Event, registry: &mut EventRegistry<Self>);
}

enum Status<T: Process> {
    Continue,
    Stop(StopReason<T>),
}

impl<T: Process> Status<T> {
    fn take_stop(&mut self) -> Option<StopReason<T>> {
        // If the status ends up to be `Continue`, we are replacing it by another `Continue`.
        let status = std::mem::replace(self, Self::Continue);
        match status {
            Status::Continue => None,
            Status::Stop(reason) => Some(reason),
        }
    }

    fn take_exit(&mut self) -> Option<T::Exit> {
        match self.take_stop()? {
            reason @ StopReason::Break(_) => {
                // Replace back the status because it was not an `Exit`.
                *self = Self::Stop(reason);
                None
            }
            StopReason::Exit(exit_reason) => Some(exit_reason),
        }
    }
}

pub(super) enum StopReason<T: Process> {
    Break(T::Break),
    Exit(T::Exit),
}

#[derive(PartialEq, Eq, Hash, Ord, PartialOrd, Clone, Copy)]
struct EventId(usize);

/// A type able to register file descriptors to be polled.
///
/// The stop status of the registry is what a process waits on: it is cleared every time
/// [`EventRegistry::event_loop`] is entered and only the event handlers can set it.
pub(super) struct EventRegistry<T: Process> {
    seed: usize,
    poll_set: PollSet<EventId>,
    events: BTreeMap<EventId, T::Event>,
    status: Status<T>,
}

impl<T: Process> EventRegistry<T> {
    /// Create a new and empty registry..
    pub(super) const fn new() -> Self {
        Self {
            seed: 0,
            poll_set: PollSet::new(),
            events: BTreeMap::new(),
            status: Status::Continue,
        }
    }

    fn next_id(&mut self) -> EventId {
        let id = EventId(self.seed);
        self.seed += 1;
        id
    }

    /// Set the `fd` descriptor to be polled for `poll_event` events and produce a `T::Event`
    /// using `event_fn` when `fd` is ready.
    pub(super) fn register_event<F: AsRawFd>(
        &mut self,
        fd: &F,
        poll_event: PollEvent,
        event_fn: impl Fn(PollEvent) -> T::Event,
    ) {
        let id = self.next_id();
        self.poll_set.add_fd(id, fd, poll_event);
        self.events.insert(id, event_fn(poll_event));
    }

    /// Stop polling the descriptor of `event` for good.
    pub(super) fn deregister_event(&mut self, event: T::Event) {
        self.events.retain(|id, registered_event| {
            if *registered_event == event {
                self.poll_set.remove_fd(id);
                false
            } else {
                true
            }
        })
    }

    /// Stop polling the descriptor of `event` until [`EventRegistry::resume_event`] is called.
    pub(super) fn ignore_event(&mut self, event: T::Event) {
        for (id, _) in self.events.iter().filter(|(_, e)| **e == event) {
            self.poll_set.ignore_fd(id);
        }
    }

    pub(super) fn resume_event(&mut self, event: T::Event) {
        for (id, _) in self.events.iter().filter(|(_, e)| **e == event) {
            self.poll_set.resume_fd(id);
        }
    }

    /// Stop the event loop when the current callback is done and set a reason for it.
    ///
    /// This means that the event loop will stop even if other events are ready.
    pub(super) fn set_break(&mut self, reason: T::Break) {
        self.status = Status::Stop(StopReason::Break(reason));
    }

    /// Stop the event loop when the callbacks for the events that are ready by now have been
    /// dispatched and set a reason for it.
    pub(super) fn set_exit(&mut self, reason: T::Exit) {
        self.status = Status::Stop(StopReason::Exit(reason));
    }

    /// Run the event loop for this handler.
    ///
    /// The event loop will continue indefinitely unless you call [`EventRegistry::set_break`] or
    /// [`EventRegistry::set_exit`].
    pub(super) fn event_loop(&mut self, process: &mut T) -> StopReason<T> {
        self.status = Status::Continue;
        let mut event_queue = Vec::with_capacity(self.events.len());

        loop {
            match self.poll_set.poll() {
                Ok(ids) => {
                    for id in ids {
                        if let Some(&event) = self.events.get(&id) {
                            event_queue.push(event);
                        }
                    }

                    for event in event_queue.drain(..) {
                        process.on_event(event, self);

                        if let Some(reason) = self.status.take_exit() {
                            return StopReason::Exit(reason);
                        }
                    }
                }
                // poll is interrupted whenever a signal arrives; the signal itself shows up in
                // the signal stream.
                Err(err) if crate::cutils::was_interrupted(&err) => {}
                Err(err) => dev_warn!("poll failed: {err}"),
            }

            if let Some(reason) = self.status.take_stop() {
                return reason;
            }
        }
    }
}
