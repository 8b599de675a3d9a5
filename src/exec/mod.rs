#![deny(unsafe_code)]

mod builtins;
mod controller;
mod coordinator;
mod event;
mod executor;

use std::{ffi::c_int, io::Write};

use crate::{
    cutils::was_interrupted,
    log::{dev_info, dev_warn},
    system::{
        _exit, fork,
        interface::ProcessId,
        signal::{signal_name, SignalNumber, SignalSet},
        wait::{Wait, WaitError, WaitOptions, WaitStatus},
        ForkResult,
    },
};

pub use controller::{Controller, Input};

use self::event::{EventRegistry, Process};

/// Exit statuses with a meaning for the parent of the process that exits with them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum ControlCode {
    Success = 0,
    Failure = 1,
    /// Terminate the whole shell.
    ExitAll = 4,
    /// Resume the suspended job in the background.
    Background = 5,
}

impl ControlCode {
    pub const fn from_raw(code: c_int) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::Failure),
            4 => Some(Self::ExitAll),
            5 => Some(Self::Background),
            _ => None,
        }
    }

    pub const fn as_raw(self) -> c_int {
        self as c_int
    }
}

trait HandleSigchld: Process {
    const OPTIONS: WaitOptions;

    fn on_exit(&mut self, pid: ProcessId, exit_code: c_int, registry: &mut EventRegistry<Self>);
    fn on_term(&mut self, pid: ProcessId, signal: SignalNumber, registry: &mut EventRegistry<Self>);
    fn on_stop(&mut self, pid: ProcessId, signal: SignalNumber, registry: &mut EventRegistry<Self>);
    fn on_continue(&mut self, pid: ProcessId, registry: &mut EventRegistry<Self>);
}

/// Reap `child_pid` (or any child if it is [`ProcessId::ANY`]) until no state change is left to
/// report, dispatching each status to `handler`.
fn handle_sigchld<T: HandleSigchld>(
    handler: &mut T,
    registry: &mut EventRegistry<T>,
    child_name: &'static str,
    child_pid: ProcessId,
) {
    loop {
        let (pid, status) = match child_pid.wait(T::OPTIONS) {
            Ok(report) => report,
            Err(WaitError::Io(err)) if was_interrupted(&err) => continue,
            // Either the report was consumed by a previous call or the signal was not about a
            // state change we wait for.
            Err(WaitError::NotReady) => return,
            Err(err) if err.is_no_child() => return,
            Err(WaitError::Unknown(raw)) => {
                dev_warn!("unknown wait status {raw:#x} for {child_pid} ({child_name})");
                continue;
            }
            Err(WaitError::Io(err)) => {
                dev_warn!("cannot wait for {child_pid} ({child_name}): {err}");
                return;
            }
        };

        match status {
            WaitStatus::Exited(exit_code) => {
                dev_info!("{pid} ({child_name}) exited with status code {exit_code}");
                handler.on_exit(pid, exit_code, registry)
            }
            WaitStatus::Stopped(signal) => {
                dev_info!("{pid} ({child_name}) was stopped by {}", signal_name(signal));
                handler.on_stop(pid, signal, registry)
            }
            WaitStatus::Signaled(signal) => {
                dev_info!(
                    "{pid} ({child_name}) was terminated by {}",
                    signal_name(signal)
                );
                handler.on_term(pid, signal, registry)
            }
            WaitStatus::Continued => {
                dev_info!("{pid} ({child_name}) continued execution");
                handler.on_continue(pid, registry)
            }
        }
    }
}

/// Fork a process that runs `child` and exits with the status it returns.
///
/// Every signal stays blocked in the child until `child` restores the mask it is given, so it
/// can install its own handlers first.
fn spawn_process(child: impl FnOnce(SignalSet) -> c_int) -> std::io::Result<ProcessId> {
    let original_set = SignalSet::full()?.block()?;

    let result = match fork() {
        Ok(ForkResult::Child) => {
            let status = child(original_set);
            let _ = std::io::stdout().flush();
            _exit(status)
        }
        Ok(ForkResult::Parent(pid)) => Ok(pid),
        Err(err) => {
            dev_warn!("unable to fork: {err}");
            Err(err)
        }
    };

    if let Err(err) = original_set.set_mask() {
        dev_warn!("cannot restore signal mask: {err}");
    }

    result
}
