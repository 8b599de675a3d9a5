pub const USAGE_MSG: &str = "\
usage: msh [-c line]
       msh -h | -V";

const DESCRIPTOR: &str = "msh - a small job-control shell";

const HELP_MSG: &str = "Options:
  -c, --command=line            run the given line instead of reading standard input
  -h, --help                    display help message and exit
  -V, --version                 display version information and exit

Lines are split into commands at ';'. Built-in commands:
  cd [dir]                      change the working directory ($HOME by default)
  exit, quit                    terminate the shell and every job
  bg                            resume a suspended job in the background
  history                       list the previous lines; '!n' runs line n again
  listpids, showpids            list the pids of the last spawned processes";

pub fn long_help_message() -> String {
    format!("{DESCRIPTOR}\n{USAGE_MSG}\n{HELP_MSG}")
}
