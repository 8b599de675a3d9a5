use pretty_assertions::assert_eq;

use super::*;

const SHELL: ProcessId = ProcessId::new(100);
const JOB: ProcessId = ProcessId::new(200);
const OTHER: ProcessId = ProcessId::new(300);

fn table_with_foreground() -> JobTable {
    let mut table = JobTable::new(SHELL);
    table.spawned(JOB);
    table
}

fn state(table: &JobTable, pid: ProcessId) -> Option<JobState> {
    table.get(pid).map(|job| job.state)
}

fn exit(code: ControlCode) -> Notification {
    Notification::Exited(code.as_raw())
}

#[test]
fn spawned_jobs_are_active_in_the_shell_group() {
    let table = table_with_foreground();
    assert_eq!(
        table.get(JOB),
        Some(&Job {
            pid: JOB,
            pgid: SHELL,
            state: JobState::Active
        })
    );
    assert!(table.has_active_foreground());
}

#[test]
fn ordinary_exit_empties_the_table() {
    for code in [0, 1, 2, 127] {
        let mut table = table_with_foreground();
        let outcome = table.apply(JOB, Notification::Exited(code));
        assert_eq!(outcome, Outcome::released(FollowUp::Nothing));
        assert!(table.is_empty());
        assert!(!table.has_active_foreground());
    }
}

#[test]
fn stop_suspends_and_releases_the_foreground() {
    let mut table = table_with_foreground();
    let outcome = table.apply(JOB, Notification::Stopped(SIGTSTP));

    assert_eq!(outcome, Outcome::stays(FollowUp::Nothing));
    assert_eq!(state(&table, JOB), Some(JobState::Suspended));
    assert!(!table.has_active_foreground());
}

#[test]
fn continue_moves_a_suspended_job_to_its_own_group() {
    let mut table = table_with_foreground();
    table.apply(JOB, Notification::Stopped(SIGTSTP));
    let outcome = table.apply(JOB, Notification::Continued);

    assert_eq!(outcome, Outcome::stays(FollowUp::Nothing));
    assert_eq!(
        table.get(JOB),
        Some(&Job {
            pid: JOB,
            pgid: JOB,
            state: JobState::Background
        })
    );
}

#[test]
fn continuing_an_active_job_still_backgrounds_it() {
    let mut table = table_with_foreground();
    table.apply(JOB, Notification::Continued);

    assert_eq!(state(&table, JOB), Some(JobState::Background));
    assert!(!table.has_active_foreground());
}

#[test]
fn exit_all_shuts_down() {
    let mut table = table_with_foreground();
    let outcome = table.apply(JOB, exit(ControlCode::ExitAll));
    assert_eq!(outcome, Outcome::released(FollowUp::Shutdown));
    assert!(table.is_empty());
}

#[test]
fn background_continues_a_suspended_job() {
    let mut table = table_with_foreground();
    table.apply(JOB, Notification::Stopped(SIGTSTP));
    table.spawned(OTHER);

    let outcome = table.apply(OTHER, exit(ControlCode::Background));

    assert_eq!(outcome, Outcome::released(FollowUp::Continue(JOB)));
    assert_eq!(table.len(), 1);
    assert_eq!(state(&table, JOB), Some(JobState::Suspended));
    assert!(!table.has_active_foreground());

    table.apply(JOB, Notification::Continued);
    assert_eq!(state(&table, JOB), Some(JobState::Background));
}

#[test]
fn background_without_suspended_job() {
    let mut table = table_with_foreground();
    let outcome = table.apply(JOB, exit(ControlCode::Background));
    assert_eq!(outcome, Outcome::released(FollowUp::NothingToContinue));
    assert!(table.is_empty());
}

#[test]
fn background_ignores_jobs_that_are_not_suspended() {
    let mut table = table_with_foreground();
    table.apply(JOB, Notification::Continued);
    table.spawned(OTHER);

    let outcome = table.apply(OTHER, exit(ControlCode::Background));
    assert_eq!(outcome.follow_up, FollowUp::NothingToContinue);
}

#[test]
fn interrupted_or_killed_jobs_are_released() {
    for signal in [SIGINT, SIGKILL, SIGTERM] {
        let mut table = table_with_foreground();
        let outcome = table.apply(JOB, Notification::Signaled(signal));
        assert_eq!(outcome, Outcome::released(FollowUp::Nothing));
        assert!(table.is_empty());
    }
}

#[test]
fn unexpected_stop_kills_the_job() {
    for signal in [SIGSTOP, SIGTTIN, SIGTTOU] {
        let mut table = table_with_foreground();
        let outcome = table.apply(JOB, Notification::Stopped(signal));
        assert_eq!(outcome, Outcome::released(FollowUp::Kill));
        assert!(table.is_empty());
        assert!(!table.has_active_foreground());
    }
}

#[test]
fn unknown_pid_is_synthesized_as_active() {
    let mut table = JobTable::new(SHELL);
    let outcome = table.apply(JOB, Notification::Stopped(SIGTSTP));

    assert_eq!(outcome, Outcome::stays(FollowUp::Nothing));
    assert_eq!(
        table.get(JOB),
        Some(&Job {
            pid: JOB,
            pgid: SHELL,
            state: JobState::Suspended
        })
    );

    let mut table = JobTable::new(SHELL);
    let outcome = table.apply(JOB, Notification::Exited(0));
    assert_eq!(outcome, Outcome::released(FollowUp::Nothing));
    assert!(table.is_empty());
}

#[test]
fn background_job_events_leave_the_foreground_alone() {
    let mut table = table_with_foreground();
    table.apply(JOB, Notification::Stopped(SIGTSTP));
    table.apply(JOB, Notification::Continued);
    table.spawned(OTHER);

    let outcome = table.apply(JOB, Notification::Exited(0));

    assert_eq!(outcome, Outcome::released(FollowUp::Nothing));
    assert!(table.has_active_foreground());
    assert_eq!(state(&table, OTHER), Some(JobState::Active));
}

#[test]
fn registering_twice_keeps_the_job() {
    let mut table = table_with_foreground();
    table.apply(JOB, Notification::Stopped(SIGTSTP));
    table.spawned(JOB);
    assert_eq!(state(&table, JOB), Some(JobState::Suspended));
    assert_eq!(table.len(), 1);
}

#[test]
fn drain_returns_every_job() {
    let mut table = table_with_foreground();
    table.apply(JOB, Notification::Stopped(SIGTSTP));
    table.spawned(OTHER);

    let pids = table.drain().into_iter().map(|job| job.pid).collect::<Vec<_>>();
    assert_eq!(pids, vec![JOB, OTHER]);
    assert!(table.is_empty());
    assert!(!table.has_active_foreground());
}
