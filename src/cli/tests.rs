use super::{MshAction, MshOptions};
use pretty_assertions::assert_eq;

fn action(args: &[&str]) -> MshAction {
    MshOptions::try_parse_from(args.iter().copied()).unwrap().action
}

fn error(args: &[&str]) -> String {
    MshOptions::try_parse_from(args.iter().copied()).unwrap_err()
}

/// Without arguments the shell reads its standard input
#[test]
fn no_arguments() {
    assert_eq!(action(&["msh"]), MshAction::ReadInput);
}

#[test]
fn help_and_version() {
    assert_eq!(action(&["msh", "-h"]), MshAction::Help);
    assert_eq!(action(&["msh", "--help"]), MshAction::Help);
    assert_eq!(action(&["msh", "-V"]), MshAction::Version);
    assert_eq!(action(&["msh", "--version"]), MshAction::Version);
}

/// Help wins over every other action
#[test]
fn help_takes_precedence() {
    assert_eq!(action(&["msh", "-V", "-h"]), MshAction::Help);
    assert_eq!(action(&["msh", "-c", "ls", "-h"]), MshAction::Help);
    assert_eq!(action(&["msh", "-hV"]), MshAction::Help);
}

#[test]
fn command_forms() {
    let line = MshAction::RunLine("echo a; echo b".into());
    assert_eq!(action(&["msh", "-c", "echo a; echo b"]), line);
    assert_eq!(action(&["msh", "--command", "echo a; echo b"]), line);
    assert_eq!(action(&["msh", "--command=echo a; echo b"]), line);
    assert_eq!(action(&["msh", "-cecho"]), MshAction::RunLine("echo".into()));
}

#[test]
fn command_needs_a_value() {
    assert_eq!(error(&["msh", "-c"]), "'-c' expects an argument");
    assert_eq!(error(&["msh", "--command"]), "'--command' expects an argument");
}

#[test]
fn command_only_once() {
    assert!(MshOptions::try_parse_from(["msh", "-c", "a", "-c", "b"]).is_err());
}

#[test]
fn invalid_arguments() {
    assert_eq!(error(&["msh", "-x"]), "invalid option '-x'");
    assert_eq!(error(&["msh", "--frobnicate"]), "invalid option '--frobnicate'");
    assert_eq!(
        error(&["msh", "--help=yes"]),
        "'--help' does not take any arguments"
    );
    assert_eq!(error(&["msh", "script.msh"]), "unexpected argument 'script.msh'");
}
