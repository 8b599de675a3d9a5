#![forbid(unsafe_code)]

pub mod help;

#[cfg(test)]
mod tests;

#[derive(Debug, Default, PartialEq, Clone)]
pub enum MshAction {
    Help,
    Version,
    /// Run the single given line, then behave as if the input ended.
    RunLine(String),
    /// Read lines from standard input.
    #[default]
    ReadInput,
}

#[derive(Debug, Default, PartialEq, Clone)]
pub struct MshOptions {
    // resulting action enum
    pub action: MshAction,
    // actions
    help: bool,
    version: bool,
    command: Option<String>,
}

enum MshArg {
    Flag(String),
    Argument(String, String),
    Stray(String),
}

impl MshOptions {
    const TAKES_ARGUMENT_SHORT: &'static [char] = &['c'];
    const TAKES_ARGUMENT: &'static [&'static str] = &["command"];

    /// argument assignments and shorthand options preprocessing
    fn normalize_arguments<I>(iter: I) -> Result<Vec<MshArg>, String>
    where
        I: IntoIterator<Item = String>,
    {
        // the first argument is the msh command - so we can skip it
        let mut arg_iter = iter.into_iter().skip(1);
        let mut processed: Vec<MshArg> = vec![];

        while let Some(arg) = arg_iter.next() {
            match arg.as_str() {
                long_arg if long_arg.starts_with("--") => {
                    if let Some((key, value)) = long_arg.split_once('=') {
                        // only accept arguments when one is expected
                        if !Self::TAKES_ARGUMENT.contains(&&key[2..]) {
                            Err(format!("'{key}' does not take any arguments"))?;
                        }
                        processed.push(MshArg::Argument(key.to_string(), value.to_string()));
                    } else if Self::TAKES_ARGUMENT.contains(&&long_arg[2..]) {
                        if let Some(next) = arg_iter.next() {
                            processed.push(MshArg::Argument(arg, next));
                        } else {
                            Err(format!("'{long_arg}' expects an argument"))?;
                        }
                    } else {
                        processed.push(MshArg::Flag(arg));
                    }
                }
                short_arg if short_arg.starts_with('-') && short_arg.len() > 1 => {
                    // split combined shorthand options
                    for (n, char) in short_arg.trim_start_matches('-').chars().enumerate() {
                        let flag = format!("-{char}");
                        // convert option argument to seperate segment
                        if Self::TAKES_ARGUMENT_SHORT.contains(&char) {
                            let rest = short_arg[(n + 2)..].to_string();
                            if !rest.is_empty() {
                                processed.push(MshArg::Argument(flag, rest));
                            } else if let Some(next) = arg_iter.next() {
                                processed.push(MshArg::Argument(flag, next));
                            } else {
                                Err(format!("'-{char}' expects an argument"))?;
                            }
                            break;
                        } else {
                            processed.push(MshArg::Flag(flag));
                        }
                    }
                }
                _argument => processed.push(MshArg::Stray(arg)),
            }
        }

        Ok(processed)
    }

    /// parse command line arguments from the environment and handle errors
    pub fn from_env() -> Result<MshOptions, String> {
        Self::try_parse_from(std::env::args())
    }

    /// from the arguments resolve which action should be performed
    fn resolve_action(&mut self) {
        if self.help {
            self.action = MshAction::Help;
        } else if self.version {
            self.action = MshAction::Version;
        } else if let Some(line) = self.command.take() {
            self.action = MshAction::RunLine(line);
        } else {
            self.action = MshAction::ReadInput;
        }
    }

    /// parse an iterator over command line arguments
    pub fn try_parse_from<I, T>(iter: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = T>,
        T: Into<String> + Clone,
    {
        let mut options: MshOptions = MshOptions::default();
        let arg_iter = Self::normalize_arguments(iter.into_iter().map(Into::into))?;

        for arg in arg_iter {
            match arg {
                MshArg::Flag(flag) => match flag.as_str() {
                    "-h" | "--help" => {
                        options.help = true;
                    }
                    "-V" | "--version" => {
                        options.version = true;
                    }
                    option => {
                        Err(format!("invalid option '{option}'"))?;
                    }
                },
                MshArg::Argument(option, value) => match option.as_str() {
                    "-c" | "--command" => {
                        if options.command.is_some() {
                            Err("'--command' may only be given once")?;
                        }
                        options.command = Some(value);
                    }
                    option => {
                        Err(format!("invalid option '{option}'"))?;
                    }
                },
                MshArg::Stray(arg) => {
                    Err(format!("unexpected argument '{arg}'"))?;
                }
            }
        }

        options.resolve_action();

        Ok(options)
    }
}
