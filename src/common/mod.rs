#![forbid(unsafe_code)]

pub use command::{AtomicCommand, CommandLine};
pub use error::Error;

pub mod command;
pub mod error;
pub mod resolve;

/// Largest number of tokens (the command name included) an atomic command may have.
pub const MAX_TOKENS: usize = 11;
