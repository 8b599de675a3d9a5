use std::fmt;

use super::{Error, MAX_TOKENS};

/// A line of input after whitespace normalization: tokens are separated by exactly one space
/// and every `;` is a token of its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine(String);

impl CommandLine {
    /// Normalize a raw input line. Returns `None` if nothing but whitespace is left.
    pub fn normalize(raw: &str) -> Option<Self> {
        let mut tokens = Vec::new();
        for word in raw.split_whitespace() {
            let mut pieces = word.split(';').peekable();
            while let Some(piece) = pieces.next() {
                if !piece.is_empty() {
                    tokens.push(piece);
                }
                if pieces.peek().is_some() {
                    tokens.push(";");
                }
            }
        }

        if tokens.is_empty() {
            None
        } else {
            Some(Self(tokens.join(" ")))
        }
    }

    /// If this line is a history recall (`!` followed by one or two digits), the requested
    /// 1-based position.
    pub fn recall_position(&self) -> Option<usize> {
        let digits = self.0.strip_prefix('!')?;
        if (1..=2).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()) {
            digits.parse().ok()
        } else {
            None
        }
    }

    /// The atomic commands of this line, in order. Empty commands (as in `;;`) are skipped.
    pub fn commands(&self) -> impl Iterator<Item = AtomicCommand> + '_ {
        self.0
            .split(';')
            .map(|command| {
                command
                    .split_whitespace()
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|tokens| !tokens.is_empty())
            .map(|tokens| AtomicCommand { tokens })
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single command without semicolons: a name followed by its arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomicCommand {
    tokens: Vec<String>,
}

impl AtomicCommand {
    pub fn name(&self) -> &str {
        // never empty, see `CommandLine::commands`
        &self.tokens[0]
    }

    pub fn arguments(&self) -> &[String] {
        &self.tokens[1..]
    }

    /// Reject commands with more than [`MAX_TOKENS`] tokens.
    pub fn check_length(&self) -> Result<(), Error> {
        if self.tokens.len() > MAX_TOKENS {
            Err(Error::TooManyArguments(self.name().to_string()))
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for AtomicCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::CommandLine;

    fn normalized(raw: &str) -> Option<String> {
        CommandLine::normalize(raw).map(|line| line.to_string())
    }

    #[test]
    fn normalization() {
        assert_eq!(normalized("ls"), Some("ls".into()));
        assert_eq!(normalized("  ls   -l \t /tmp \n"), Some("ls -l /tmp".into()));
        assert_eq!(normalized("cd /tmp;ls"), Some("cd /tmp ; ls".into()));
        assert_eq!(normalized("a;;b"), Some("a ; ; b".into()));
        assert_eq!(normalized(";"), Some(";".into()));
        assert_eq!(normalized("echo a ;"), Some("echo a ;".into()));
        assert_eq!(normalized(""), None);
        assert_eq!(normalized(" \t\n"), None);
    }

    #[test]
    fn splitting() {
        let line = CommandLine::normalize("cd /tmp ;ls -l;; pwd").unwrap();
        let commands = line.commands().map(|c| c.to_string()).collect::<Vec<_>>();
        assert_eq!(commands, ["cd /tmp", "ls -l", "pwd"]);

        let first = line.commands().next().unwrap();
        assert_eq!(first.name(), "cd");
        assert_eq!(first.arguments(), ["/tmp".to_string()]);

        assert_eq!(CommandLine::normalize(";;").unwrap().commands().count(), 0);
    }

    #[test]
    fn recall_positions() {
        let recall = |raw: &str| CommandLine::normalize(raw).unwrap().recall_position();
        assert_eq!(recall("!1"), Some(1));
        assert_eq!(recall("!42"), Some(42));
        assert_eq!(recall("!0"), Some(0));
        assert_eq!(recall("!123"), None);
        assert_eq!(recall("!"), None);
        assert_eq!(recall("!a"), None);
        assert_eq!(recall("ls !1"), None);
    }

    #[test]
    fn token_limit() {
        let ok = CommandLine::normalize("echo 1 2 3 4 5 6 7 8 9 10").unwrap();
        assert!(ok.commands().next().unwrap().check_length().is_ok());

        let too_long = CommandLine::normalize("echo 1 2 3 4 5 6 7 8 9 10 11").unwrap();
        let err = too_long.commands().next().unwrap().check_length().unwrap_err();
        assert_eq!(err.to_string(), "echo: too many arguments");
    }
}
