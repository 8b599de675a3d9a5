use std::{env, ffi::c_int, io};

use crate::{
    common::CommandLine,
    cutils::was_interrupted,
    history::HistorySnapshot,
    log::{dev_error, dev_info, dev_warn, user_error, Role},
    store::{FileStore, JobStateStore},
    system::{
        getpid, kill,
        interface::ProcessId,
        poll::PollEvent,
        setpgid,
        signal::{
            consts::*, register_handlers, signal_name, SignalHandler, SignalHandlerBehavior,
            SignalNumber, SignalSet, SignalStream,
        },
        wait::WaitOptions,
    },
};

use super::{
    event::{EventRegistry, Process, StopReason},
    executor, handle_sigchld, spawn_process, ControlCode, HandleSigchld,
};

/// Spawn a coordinator running every command of `line` in order.
pub(super) fn spawn(
    line: &CommandLine,
    history: HistorySnapshot,
    store: &FileStore,
    controller: ProcessId,
) -> io::Result<ProcessId> {
    spawn_process(|original_set| {
        let coordinator = match Coordinator::new(history, store, controller, original_set) {
            Ok(coordinator) => coordinator,
            Err(err) => {
                dev_error!("cannot set up coordinator: {err}");
                return ControlCode::Failure.as_raw();
            }
        };
        coordinator.run(line).as_raw()
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(super) enum CoordinatorEvent {
    Signal,
}

/// How the current executor ended, from the point of view of the line.
pub(super) enum Step {
    Next,
    Finish(ControlCode),
}

struct Coordinator<'a> {
    pid: ProcessId,
    controller: ProcessId,
    history: HistorySnapshot,
    store: &'a FileStore,
    executor: Option<ProcessId>,
    signal_stream: SignalStream,
    _signal_handlers: Vec<SignalHandler>,
}

impl<'a> Coordinator<'a> {
    const DEFAULT_SIGNALS: [SignalNumber; 4] = [SIGINT, SIGTSTP, SIGTTIN, SIGTTOU];
    const STREAMED_SIGNALS: [SignalNumber; 2] = [SIGCHLD, SIGCONT];

    fn new(
        history: HistorySnapshot,
        store: &'a FileStore,
        controller: ProcessId,
        original_set: SignalSet,
    ) -> io::Result<Self> {
        Role::Coordinator.stamp();

        let mut signal_handlers =
            register_handlers(Self::DEFAULT_SIGNALS, SignalHandlerBehavior::Default)?;
        let signal_stream = SignalStream::open()?;
        signal_handlers.extend(register_handlers(
            Self::STREAMED_SIGNALS,
            SignalHandlerBehavior::Stream,
        )?);

        original_set.set_mask()?;

        Ok(Self {
            pid: getpid(),
            controller,
            history,
            store,
            executor: None,
            signal_stream,
            _signal_handlers: signal_handlers,
        })
    }

    fn run(mut self, line: &CommandLine) -> ControlCode {
        dev_info!("running line {line}");
        let mut registry = EventRegistry::new();
        registry.register_event(&self.signal_stream, PollEvent::Readable, |_| {
            CoordinatorEvent::Signal
        });

        for command in line.commands() {
            if let Err(err) = command.check_length() {
                user_error!("{err}");
                return ControlCode::Failure;
            }

            let executor =
                match executor::spawn(&command, &self.history, self.store, self.controller) {
                    Ok(pid) => pid,
                    Err(err) => {
                        user_error!("cannot run {command}: {err}");
                        return ControlCode::Failure;
                    }
                };
            self.executor = Some(executor);
            if let Err(err) = self.store.append_spawned_pid(self.pid, executor) {
                dev_warn!("cannot record executor {executor}: {err}");
            }

            let step = match registry.event_loop(&mut self) {
                StopReason::Exit(step) => step,
                StopReason::Break(err) => {
                    dev_error!("coordinator event loop failed: {err}");
                    Step::Finish(ControlCode::Failure)
                }
            };
            self.executor = None;

            match step {
                Step::Next => self.refresh_cwd(),
                Step::Finish(code) => return code,
            }
        }

        ControlCode::Success
    }

    /// Follow a `cd` done by the last executor.
    fn refresh_cwd(&self) {
        match self.store.get_cwd(self.controller) {
            Ok(cwd) => {
                if let Err(err) = env::set_current_dir(&cwd) {
                    dev_warn!("cannot change directory to {}: {err}", cwd.display());
                }
            }
            Err(err) => dev_warn!("cannot read the working directory: {err}"),
        }
    }

    /// We were resumed after a suspension: keep running detached from the terminal.
    fn on_continued(&self) {
        if let Err(err) = setpgid(ProcessId::SELF, ProcessId::SELF) {
            dev_warn!("cannot create a process group: {err}");
        }

        let Some(executor) = self.executor else {
            return;
        };

        // This fails once the executor has loaded a program, which keeps the controller's group.
        if let Err(err) = setpgid(executor, self.pid) {
            dev_info!(
                "cannot move executor {executor} to process group {}: {err}",
                self.pid
            );
        }
        if let Err(err) = kill(executor, SIGCONT) {
            dev_warn!("cannot continue executor {executor}: {err}");
        }
    }

    fn on_signal(&mut self, registry: &mut EventRegistry<Self>) {
        let info = match self.signal_stream.recv() {
            Ok(info) => info,
            Err(err) if was_interrupted(&err) => return,
            Err(err) => return registry.set_break(err),
        };

        match info.signal() {
            SIGCHLD => match self.executor {
                Some(executor) => handle_sigchld(self, registry, "executor", executor),
                None => dev_info!("SIGCHLD without an executor"),
            },
            SIGCONT => {
                if info.is_user_signaled() {
                    dev_info!("continued by {}", info.pid());
                }
                self.on_continued()
            }
            signal => dev_warn!("unexpected {}", signal_name(signal)),
        }
    }
}

impl<'a> Process for Coordinator<'a> {
    type Event = CoordinatorEvent;
    type Break = io::Error;
    type Exit = Step;

    fn on_event(&mut self, event: Self::Event, registry: &mut EventRegistry<Self>) {
        match event {
            CoordinatorEvent::Signal => self.on_signal(registry),
        }
    }
}

impl<'a> HandleSigchld for Coordinator<'a> {
    const OPTIONS: WaitOptions = WaitOptions::new().untraced().continued().no_hang();

    fn on_exit(&mut self, _pid: ProcessId, exit_code: c_int, registry: &mut EventRegistry<Self>) {
        let step = match ControlCode::from_raw(exit_code) {
            Some(ControlCode::Success) => Step::Next,
            // The controller decides what to do with these.
            Some(code @ (ControlCode::ExitAll | ControlCode::Background)) => Step::Finish(code),
            _ => Step::Finish(ControlCode::Failure),
        };
        registry.set_exit(step);
    }

    fn on_term(
        &mut self,
        _pid: ProcessId,
        _signal: SignalNumber,
        registry: &mut EventRegistry<Self>,
    ) {
        registry.set_exit(Step::Finish(ControlCode::Failure));
    }

    fn on_stop(
        &mut self,
        pid: ProcessId,
        signal: SignalNumber,
        _registry: &mut EventRegistry<Self>,
    ) {
        if signal != SIGTSTP {
            dev_warn!(
                "unexpected {} stopped executor {pid}, killing it",
                signal_name(signal)
            );
            if let Err(err) = kill(pid, SIGKILL) {
                dev_warn!("cannot kill executor {pid}: {err}");
            }
        }
    }

    fn on_continue(&mut self, _pid: ProcessId, _registry: &mut EventRegistry<Self>) {}
}
