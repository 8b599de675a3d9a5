#![forbid(unsafe_code)]

use crate::cli::{help, MshAction, MshOptions};
use crate::common::Error;
use crate::exec::{Controller, Input};
use crate::log::{dev_info, user_error};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn shell_process() -> Result<i32, Error> {
    crate::log::ShellLogger::new("msh: ").into_global_logger();

    dev_info!("development logs are enabled");

    // parse cli options
    match MshOptions::from_env() {
        Ok(options) => match options.action {
            MshAction::Help => {
                println_ignore_io_error!("{}", help::long_help_message());
                std::process::exit(0);
            }
            MshAction::Version => {
                println_ignore_io_error!("msh {VERSION}");
                std::process::exit(0);
            }
            MshAction::RunLine(line) => Ok(Controller::new(Input::Line(line))?.run()),
            MshAction::ReadInput => Ok(Controller::new(Input::Stdin)?.run()),
        },
        Err(e) => Err(Error::Options(e)),
    }
}

pub fn main() {
    match shell_process() {
        Ok(status) => std::process::exit(status),
        Err(error) => {
            user_error!("{error}");
            if matches!(error, Error::Options(_)) {
                eprintln_ignore_io_error!("{}", help::USAGE_MSG);
            }
            std::process::exit(1);
        }
    }
}
