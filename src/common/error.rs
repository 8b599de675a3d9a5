use std::{fmt, io, path::PathBuf};

#[derive(Debug)]
pub enum Error {
    CommandNotFound(String),
    TooManyArguments(String),
    ChDir { path: PathBuf, source: io::Error },
    HomeNotSet,
    NotInHistory,
    JobControl(String),
    Options(String),
    Io(Option<PathBuf>, io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CommandNotFound(name) => write!(f, "{name}: Command not found."),
            Error::TooManyArguments(name) => write!(f, "{name}: too many arguments"),
            Error::ChDir { path, source } => write!(f, "cd: {}: {source}", path.display()),
            Error::HomeNotSet => f.write_str("cd: HOME variable not set"),
            Error::NotInHistory => f.write_str("Command not in history"),
            Error::JobControl(e) => write!(f, "cannot set up job control: {e}"),
            Error::Options(e) => write!(f, "{e}"),
            Error::Io(location, e) => {
                if let Some(path) = location {
                    write!(f, "cannot execute '{}': {e}", path.display())
                } else {
                    write!(f, "IO error: {e}")
                }
            }
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(None, err)
    }
}

impl Error {
    pub(crate) fn job_control(context: &str, err: io::Error) -> Self {
        Self::JobControl(format!("{context}: {err}"))
    }
}
