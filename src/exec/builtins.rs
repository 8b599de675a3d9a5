use std::{
    env, fmt,
    io::{self, Write},
    path::PathBuf,
};

use crate::{
    common::{AtomicCommand, Error},
    history::HistorySnapshot,
    store::JobStateStore,
    system::interface::ProcessId,
};

use super::ControlCode;

/// Commands the executor runs itself instead of loading a program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Builtin {
    Cd,
    Exit,
    Background,
    History,
    ListPids,
}

/// What a built-in may look at.
pub(super) struct Context<'a> {
    pub(super) history: &'a HistorySnapshot,
    pub(super) store: &'a dyn JobStateStore,
    /// Key of the working directory shared by the whole shell.
    pub(super) controller: ProcessId,
}

impl Builtin {
    pub(super) fn lookup(name: &str) -> Option<Self> {
        match name {
            "cd" => Some(Self::Cd),
            "exit" | "quit" => Some(Self::Exit),
            "bg" => Some(Self::Background),
            "history" => Some(Self::History),
            "listpids" | "showpids" => Some(Self::ListPids),
            _ => None,
        }
    }

    pub(super) fn run(
        self,
        command: &AtomicCommand,
        context: &Context<'_>,
    ) -> Result<ControlCode, Error> {
        match self {
            Self::Cd => change_directory(command.arguments(), context),
            Self::Exit => Ok(ControlCode::ExitAll),
            Self::Background => Ok(ControlCode::Background),
            Self::History => {
                print_listing(&context.history.commands);
                Ok(ControlCode::Success)
            }
            Self::ListPids => {
                print_listing(&context.history.pids);
                Ok(ControlCode::Success)
            }
        }
    }
}

fn change_directory(arguments: &[String], context: &Context<'_>) -> Result<ControlCode, Error> {
    let target = match arguments {
        [] => env::var_os("HOME").map(PathBuf::from).ok_or(Error::HomeNotSet)?,
        [dir] => PathBuf::from(dir),
        _ => return Err(Error::TooManyArguments("cd".into())),
    };

    env::set_current_dir(&target).map_err(|source| Error::ChDir {
        path: target,
        source,
    })?;

    let cwd = env::current_dir()?;
    context.store.set_cwd(context.controller, &cwd)?;

    Ok(ControlCode::Success)
}

fn print_listing(listing: &impl fmt::Display) {
    let mut stdout = io::stdout().lock();
    let _ = write!(stdout, "{listing}");
    let _ = stdout.flush();
}
