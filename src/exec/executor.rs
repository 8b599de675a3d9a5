use std::{env, ffi::c_int, io, os::unix::process::CommandExt, process::Command};

use crate::{
    common::{
        resolve::{resolve_command, search_path},
        AtomicCommand, Error,
    },
    history::HistorySnapshot,
    log::{dev_info, dev_warn, user_error, Role},
    store::JobStateStore,
    system::{
        close_inherited_fds,
        interface::ProcessId,
        signal::{consts::*, register_handlers, SignalHandlerBehavior, SignalSet},
    },
};

use super::{
    builtins::{Builtin, Context},
    spawn_process, ControlCode,
};

/// Signals whose disposition is changed by the controller or the coordinator.
const INHERITED_SIGNALS: [c_int; 6] = [SIGINT, SIGTSTP, SIGTTIN, SIGTTOU, SIGCHLD, SIGCONT];

/// Spawn an executor running `command`.
pub(super) fn spawn(
    command: &AtomicCommand,
    history: &HistorySnapshot,
    store: &dyn JobStateStore,
    controller: ProcessId,
) -> io::Result<ProcessId> {
    spawn_process(|original_set| {
        let context = Context {
            history,
            store,
            controller,
        };
        Executor::new(original_set).run(command, &context).as_raw()
    })
}

struct Executor;

impl Executor {
    fn new(original_set: SignalSet) -> Self {
        Role::Executor.stamp();

        // Nothing is restored when the executor exits, so the handlers can be forgotten.
        match register_handlers(INHERITED_SIGNALS, SignalHandlerBehavior::Default) {
            Ok(handlers) => handlers.into_iter().for_each(|handler| handler.forget()),
            Err(err) => dev_warn!("cannot restore default signal handlers: {err}"),
        }

        if let Err(err) = original_set.set_mask() {
            dev_warn!("cannot restore signal mask: {err}");
        }

        Self
    }

    fn run(self, command: &AtomicCommand, context: &Context<'_>) -> ControlCode {
        let result = match Builtin::lookup(command.name()) {
            Some(builtin) => {
                dev_info!("running built-in {builtin:?}");
                builtin.run(command, context)
            }
            None => Err(exec_program(command)),
        };

        result.unwrap_or_else(|err| {
            user_error!("{err}");
            ControlCode::Failure
        })
    }
}

/// Replace the executor with the program `command` names. Only returns if that fails.
fn exec_program(command: &AtomicCommand) -> Error {
    let cwd = match env::current_dir() {
        Ok(cwd) => cwd,
        Err(err) => return err.into(),
    };
    let path = search_path(&cwd);

    let Some(program) = resolve_command(command.name(), &path) else {
        return Error::CommandNotFound(command.name().to_string());
    };

    if let Err(err) = close_inherited_fds() {
        return err.into();
    }

    dev_info!("executing {}", program.display());
    let err = Command::new(&program)
        .arg0(command.name())
        .args(command.arguments())
        .env("PATH", &path)
        .exec();

    if err.kind() == io::ErrorKind::NotFound {
        Error::CommandNotFound(command.name().to_string())
    } else {
        Error::Io(Some(program), err)
    }
}
