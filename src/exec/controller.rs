use std::{
    collections::VecDeque,
    env,
    ffi::c_int,
    fs::File,
    io::{self, Read, Write},
    os::fd::AsFd,
};

use crate::{
    common::{CommandLine, Error},
    cutils::{safe_isatty, was_interrupted},
    history::HistorySnapshot,
    jobs::{FollowUp, JobTable, Notification},
    log::{dev_error, dev_info, dev_warn, user_error, user_warn, Role},
    store::{FileStore, JobStateStore},
    system::{
        getpgrp, getpid,
        interface::ProcessId,
        kill, killpg,
        poll::PollEvent,
        setpgid,
        signal::{
            consts::*, register_handlers, signal_name, SignalHandler, SignalHandlerBehavior,
            SignalNumber, SignalStream,
        },
        term::Terminal,
        wait::WaitOptions,
    },
};

use super::{
    coordinator,
    event::{EventRegistry, Process, StopReason},
    handle_sigchld, ControlCode, HandleSigchld,
};

const PROMPT: &str = "msh> ";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(super) enum ControllerEvent {
    Signal,
    Input,
}

/// Where the lines come from.
pub enum Input {
    /// Standard input, until it ends.
    Stdin,
    /// A single line given up front.
    Line(String),
}

/// The long-lived process of the shell: reads lines, spawns a coordinator for each one and
/// keeps track of them as jobs.
pub struct Controller {
    pid: ProcessId,
    pgrp: ProcessId,
    interactive: bool,
    jobs: JobTable,
    history: HistorySnapshot,
    store: FileStore,
    input: Option<File>,
    partial_line: Vec<u8>,
    pending_lines: VecDeque<String>,
    input_done: bool,
    exiting: bool,
    signal_stream: SignalStream,
    _signal_handlers: Vec<SignalHandler>,
}

impl Controller {
    const IGNORED_SIGNALS: [SignalNumber; 4] = [SIGINT, SIGTSTP, SIGTTIN, SIGTTOU];

    /// Set up job control. Every failure here is fatal for the shell.
    pub fn new(input: Input) -> Result<Self, Error> {
        Role::Controller.stamp();

        let mut signal_handlers =
            register_handlers(Self::IGNORED_SIGNALS, SignalHandlerBehavior::Ignore)
                .map_err(|err| Error::job_control("cannot ignore job control signals", err))?;
        let signal_stream = SignalStream::open()
            .map_err(|err| Error::job_control("cannot open signal stream", err))?;
        signal_handlers.extend(
            register_handlers([SIGCHLD], SignalHandlerBehavior::Stream)
                .map_err(|err| Error::job_control("cannot handle SIGCHLD", err))?,
        );

        let pid = getpid();
        if getpgrp() != pid {
            setpgid(ProcessId::SELF, ProcessId::SELF)
                .map_err(|err| Error::job_control("cannot create a process group", err))?;
        }
        let pgrp = getpgrp();

        let interactive = safe_isatty(libc::STDIN_FILENO);
        if interactive {
            io::stdin()
                .tcsetpgrp(pgrp)
                .map_err(|err| Error::job_control("cannot take the terminal", err))?;
        }

        let store = FileStore::create(pid)
            .map_err(|err| Error::job_control("cannot create the job state store", err))?;
        store.set_cwd(pid, &env::current_dir()?)?;

        let (input, pending_lines, input_done) = match input {
            Input::Stdin => {
                let stdin = io::stdin().as_fd().try_clone_to_owned()?;
                (Some(File::from(stdin)), VecDeque::new(), false)
            }
            Input::Line(line) => (None, VecDeque::from([line]), true),
        };

        dev_info!("controller started, interactive: {interactive}");

        Ok(Self {
            pid,
            pgrp,
            interactive,
            jobs: JobTable::new(pgrp),
            history: HistorySnapshot::default(),
            store,
            input,
            partial_line: Vec::new(),
            pending_lines,
            input_done,
            exiting: false,
            signal_stream,
            _signal_handlers: signal_handlers,
        })
    }

    /// Run the shell until it is told to exit or its input ends. Returns the exit status.
    pub fn run(mut self) -> c_int {
        let mut registry = EventRegistry::new();
        registry.register_event(&self.signal_stream, PollEvent::Readable, |_| {
            ControllerEvent::Signal
        });
        if let Some(input) = &self.input {
            registry.register_event(input, PollEvent::Readable, |_| ControllerEvent::Input);
        }

        self.prompt();
        self.dispatch_lines(&mut registry);

        let status = match registry.event_loop(&mut self) {
            StopReason::Exit(()) => ControlCode::Success.as_raw(),
            StopReason::Break(err) => {
                dev_error!("controller event loop failed: {err}");
                ControlCode::Failure.as_raw()
            }
        };

        self.shutdown();
        status
    }

    fn prompt(&self) {
        if self.interactive && self.input.is_some() {
            let mut stdout = io::stdout().lock();
            let _ = stdout.write_all(PROMPT.as_bytes());
            // Coordinators are forked with a copy of this buffer.
            let _ = stdout.flush();
        }
    }

    /// Run pending lines until one of them occupies the foreground, then decide whether to read
    /// more input or to stop.
    fn dispatch_lines(&mut self, registry: &mut EventRegistry<Self>) {
        if self.exiting {
            return;
        }

        while !self.jobs.has_active_foreground() {
            let Some(raw) = self.pending_lines.pop_front() else {
                break;
            };
            self.run_line(&raw);
        }

        if self.jobs.has_active_foreground() {
            registry.ignore_event(ControllerEvent::Input);
        } else if self.input_done {
            registry.set_exit(());
        } else {
            registry.resume_event(ControllerEvent::Input);
        }
    }

    fn run_line(&mut self, raw: &str) {
        let Some(mut line) = CommandLine::normalize(raw) else {
            self.prompt();
            return;
        };

        if let Some(position) = line.recall_position() {
            match self.history.commands.recall(position) {
                Ok(recalled) => line = recalled,
                Err(err) => {
                    user_error!("{err}");
                    self.prompt();
                    return;
                }
            }
        }

        // The line itself is not part of the history it can list.
        let snapshot = self.history.clone();
        self.history.commands.record(line.clone());

        match coordinator::spawn(&line, snapshot, &self.store, self.pid) {
            Ok(pid) => {
                dev_info!("spawned coordinator {pid} for {line}");
                self.history.pids.record(pid);
                self.jobs.spawned(pid);
            }
            Err(err) => {
                user_error!("cannot run {line}: {err}");
                self.prompt();
            }
        }
    }

    fn on_input(&mut self, registry: &mut EventRegistry<Self>) {
        let Some(input) = self.input.as_mut() else {
            return;
        };

        let mut buf = [0u8; 4096];
        let read = match input.read(&mut buf) {
            Ok(read) => read,
            Err(err) if was_interrupted(&err) => return,
            Err(err) => {
                dev_warn!("cannot read input: {err}");
                0
            }
        };

        if read == 0 {
            registry.deregister_event(ControllerEvent::Input);
            self.input = None;
            self.input_done = true;
            if !self.partial_line.is_empty() {
                let rest = std::mem::take(&mut self.partial_line);
                self.pending_lines
                    .push_back(String::from_utf8_lossy(&rest).into_owned());
            }
        } else {
            self.partial_line.extend_from_slice(&buf[..read]);
            while let Some(end) = self.partial_line.iter().position(|&byte| byte == b'\n') {
                let line = self.partial_line.drain(..=end).collect::<Vec<_>>();
                self.pending_lines
                    .push_back(String::from_utf8_lossy(&line).into_owned());
            }
        }

        self.dispatch_lines(registry);
    }

    fn on_signal(&mut self, registry: &mut EventRegistry<Self>) {
        let info = match self.signal_stream.recv() {
            Ok(info) => info,
            Err(err) if was_interrupted(&err) => return,
            Err(err) => return registry.set_break(err),
        };

        match info.signal() {
            SIGCHLD => handle_sigchld(self, registry, "coordinator", ProcessId::ANY),
            signal => dev_warn!("unexpected {}", signal_name(signal)),
        }

        if !self.jobs.has_active_foreground() {
            self.dispatch_lines(registry);
        }
    }

    /// Apply a state change of the coordinator `pid` to the job table and act on the result.
    fn on_notification(
        &mut self,
        pid: ProcessId,
        notification: Notification,
        registry: &mut EventRegistry<Self>,
    ) {
        let had_foreground = self.jobs.has_active_foreground();
        let outcome = self.jobs.apply(pid, notification);

        // A coordinator may have changed directory on the way out.
        self.refresh_cwd();

        if outcome.released {
            match self.store.drain_spawned_pids(pid) {
                Ok(pids) => self.history.pids.extend(pids),
                Err(err) => dev_warn!("cannot collect the pids spawned by {pid}: {err}"),
            }
        }

        match outcome.follow_up {
            FollowUp::Nothing => {}
            FollowUp::Kill => {
                if let Err(err) = kill(pid, SIGKILL) {
                    dev_warn!("cannot kill {pid}: {err}");
                }
            }
            FollowUp::Continue(suspended) => {
                if let Err(err) = kill(suspended, SIGCONT) {
                    dev_warn!("cannot continue {suspended}: {err}");
                }
            }
            FollowUp::NothingToContinue => user_warn!("no job to continue"),
            FollowUp::Shutdown => {
                self.exiting = true;
                registry.set_exit(());
            }
        }

        self.reclaim_terminal();

        let released_foreground = had_foreground && !self.jobs.has_active_foreground();
        if released_foreground && !self.exiting && self.pending_lines.is_empty() {
            self.prompt();
        }
    }

    fn refresh_cwd(&self) {
        match self.store.get_cwd(self.pid) {
            Ok(cwd) => {
                if let Err(err) = env::set_current_dir(&cwd) {
                    dev_warn!("cannot change directory to {}: {err}", cwd.display());
                }
            }
            Err(err) => dev_warn!("cannot read the working directory: {err}"),
        }
    }

    /// Any state change of a job may have moved the terminal to another process group.
    fn reclaim_terminal(&self) {
        if !self.interactive || io::stdin().tcgetpgrp().ok() == Some(self.pgrp) {
            return;
        }
        if let Err(err) = io::stdin().tcsetpgrp(self.pgrp) {
            dev_warn!("cannot take the terminal back: {err}");
        }
    }

    fn shutdown(self) {
        let Self {
            mut jobs,
            store,
            pgrp,
            ..
        } = self;

        if !jobs.is_empty() {
            dev_info!("killing {} remaining jobs", jobs.len());
        }
        for job in jobs.drain() {
            dev_info!("killing job {}", job.pid);

            // A coordinator waits for each executor before spawning the next one, so only the
            // last recorded executor can still be running. Once it has loaded a program it
            // stays in our process group, out of reach of the kill aimed at the job's group.
            match store.drain_spawned_pids(job.pid) {
                Ok(spawned) => {
                    if let Some(&executor) = spawned.last() {
                        if let Err(err) = kill(executor, SIGKILL) {
                            dev_info!("cannot kill executor {executor}: {err}");
                        }
                    }
                }
                Err(err) => dev_warn!("cannot collect the pids spawned by {}: {err}", job.pid),
            }

            if let Err(err) = kill(job.pid, SIGKILL) {
                dev_warn!("cannot kill job {}: {err}", job.pid);
            }
            if job.pgid != pgrp {
                let _ = killpg(job.pgid, SIGKILL);
            }
        }

        if let Err(err) = store.remove() {
            dev_warn!("cannot remove the job state store: {err}");
        }
    }
}

impl Process for Controller {
    type Event = ControllerEvent;
    type Break = io::Error;
    type Exit = ();

    fn on_event(&mut self, event: Self::Event, registry: &mut EventRegistry<Self>) {
        match event {
            ControllerEvent::Signal => self.on_signal(registry),
            ControllerEvent::Input => self.on_input(registry),
        }
    }
}

impl HandleSigchld for Controller {
    const OPTIONS: WaitOptions = WaitOptions::new().untraced().continued().no_hang();

    fn on_exit(&mut self, pid: ProcessId, exit_code: c_int, registry: &mut EventRegistry<Self>) {
        self.on_notification(pid, Notification::Exited(exit_code), registry)
    }

    fn on_term(
        &mut self,
        pid: ProcessId,
        signal: SignalNumber,
        registry: &mut EventRegistry<Self>,
    ) {
        self.on_notification(pid, Notification::Signaled(signal), registry)
    }

    fn on_stop(
        &mut self,
        pid: ProcessId,
        signal: SignalNumber,
        registry: &mut EventRegistry<Self>,
    ) {
        self.on_notification(pid, Notification::Stopped(signal), registry)
    }

    fn on_continue(&mut self, pid: ProcessId, registry: &mut EventRegistry<Self>) {
        self.on_notification(pid, Notification::Continued, registry)
    }
}
