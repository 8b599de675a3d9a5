//! The controller's table of live coordinators and the state machine driving it.
use std::collections::BTreeMap;

use crate::{
    exec::ControlCode,
    log::{dev_info, dev_warn},
    system::{
        interface::ProcessId,
        signal::{consts::*, signal_name, SignalNumber},
    },
};

#[cfg(test)]
mod tests;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    /// Running in the foreground.
    Active,
    /// Stopped from the terminal.
    Suspended,
    /// Resumed after a suspension, running detached from the terminal.
    Background,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Job {
    pub pid: ProcessId,
    pub pgid: ProcessId,
    pub state: JobState,
}

/// A state change of a coordinator, as reported by `waitpid`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notification {
    Continued,
    Exited(libc::c_int),
    Stopped(SignalNumber),
    Signaled(SignalNumber),
}

/// What the controller has to do after a notification was applied to the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowUp {
    Nothing,
    /// Kill the coordinator, it can no longer be controlled.
    Kill,
    /// Send `SIGCONT` to this suspended job.
    Continue(ProcessId),
    /// A job asked to background the suspended job but there is none.
    NothingToContinue,
    /// Terminate the whole shell.
    Shutdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// Whether the job left the table.
    pub released: bool,
    pub follow_up: FollowUp,
}

impl Outcome {
    const fn stays(follow_up: FollowUp) -> Self {
        Self {
            released: false,
            follow_up,
        }
    }

    const fn released(follow_up: FollowUp) -> Self {
        Self {
            released: true,
            follow_up,
        }
    }
}

pub struct JobTable {
    jobs: BTreeMap<ProcessId, Job>,
    foreground: Option<ProcessId>,
    /// Process group coordinators start in.
    shell_pgid: ProcessId,
}

impl JobTable {
    pub fn new(shell_pgid: ProcessId) -> Self {
        Self {
            jobs: BTreeMap::new(),
            foreground: None,
            shell_pgid,
        }
    }

    /// Track a freshly spawned coordinator as the foreground job.
    pub fn spawned(&mut self, pid: ProcessId) {
        if self.jobs.contains_key(&pid) {
            dev_info!("job {pid} was registered already");
        } else {
            self.jobs.insert(pid, self.new_job(pid));
        }
        self.foreground = Some(pid);
    }

    fn new_job(&self, pid: ProcessId) -> Job {
        Job {
            pid,
            pgid: self.shell_pgid,
            state: JobState::Active,
        }
    }

    #[cfg(test)]
    pub fn get(&self, pid: ProcessId) -> Option<&Job> {
        self.jobs.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Whether a foreground job is still running, in which case no new line may be read.
    pub fn has_active_foreground(&self) -> bool {
        self.foreground
            .and_then(|pid| self.jobs.get(&pid))
            .is_some_and(|job| job.state == JobState::Active)
    }

    /// Any suspended job; the one with the lowest pid.
    pub fn find_suspended(&self) -> Option<&Job> {
        self.jobs
            .values()
            .find(|job| job.state == JobState::Suspended)
    }

    /// Remove every job, for shutdown.
    pub fn drain(&mut self) -> Vec<Job> {
        self.foreground = None;
        std::mem::take(&mut self.jobs).into_values().collect()
    }

    /// Apply a state change of the coordinator `pid`.
    pub fn apply(&mut self, pid: ProcessId, notification: Notification) -> Outcome {
        if !self.jobs.contains_key(&pid) {
            // The coordinator changed state before it could be registered.
            dev_warn!("no job with pid {pid}, assuming it is active");
            let job = self.new_job(pid);
            self.jobs.insert(pid, job);
        }

        let outcome = match notification {
            Notification::Continued => {
                self.to_background(pid);
                Outcome::stays(FollowUp::Nothing)
            }
            Notification::Exited(code) => {
                self.jobs.remove(&pid);
                Outcome::released(self.on_exit(pid, code))
            }
            Notification::Stopped(SIGTSTP) => {
                self.transition(pid, JobState::Active, JobState::Suspended);
                Outcome::stays(FollowUp::Nothing)
            }
            Notification::Stopped(SIGCONT) | Notification::Signaled(SIGCONT) => {
                self.to_background(pid);
                Outcome::stays(FollowUp::Nothing)
            }
            Notification::Signaled(SIGKILL | SIGINT) => {
                self.jobs.remove(&pid);
                Outcome::released(FollowUp::Nothing)
            }
            Notification::Signaled(signal) => {
                dev_warn!("job {pid} was terminated by {}", signal_name(signal));
                self.jobs.remove(&pid);
                Outcome::released(FollowUp::Nothing)
            }
            Notification::Stopped(signal) => {
                dev_warn!(
                    "unexpected {} stopped job {pid}, killing it",
                    signal_name(signal)
                );
                self.jobs.remove(&pid);
                Outcome::released(FollowUp::Kill)
            }
        };

        if self.foreground == Some(pid)
            && self.jobs.get(&pid).map(|job| job.state) != Some(JobState::Active)
        {
            self.foreground = None;
        }

        outcome
    }

    fn on_exit(&self, pid: ProcessId, code: libc::c_int) -> FollowUp {
        match ControlCode::from_raw(code) {
            Some(ControlCode::ExitAll) => FollowUp::Shutdown,
            Some(ControlCode::Background) => match self.find_suspended() {
                Some(job) => {
                    dev_info!("continuing job {}", job.pid);
                    FollowUp::Continue(job.pid)
                }
                None => FollowUp::NothingToContinue,
            },
            Some(ControlCode::Success) => FollowUp::Nothing,
            _ => {
                dev_info!("job {pid} exited with status {code}");
                FollowUp::Nothing
            }
        }
    }

    /// A continued coordinator runs in the background in its own process group.
    fn to_background(&mut self, pid: ProcessId) {
        self.transition(pid, JobState::Suspended, JobState::Background);
        if let Some(job) = self.jobs.get_mut(&pid) {
            job.pgid = pid;
        }
    }

    fn transition(&mut self, pid: ProcessId, expected: JobState, to: JobState) {
        if let Some(job) = self.jobs.get_mut(&pid) {
            if job.state != expected {
                dev_warn!("bad apriori status {:?} for job {pid}", job.state);
            }
            job.state = to;
        }
    }
}
