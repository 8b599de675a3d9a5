use std::{
    io::{self, Write},
    sync::Mutex,
};

#[cfg(feature = "dev")]
use std::{fs::File, path::Path};

/// A logger that writes every record as a single line to `target`.
pub struct SimpleLogger<W: Write + Send> {
    target: Mutex<W>,
    prefix: &'static str,
}

impl<W: Write + Send> SimpleLogger<W> {
    fn new(target: W, prefix: &'static str) -> Self {
        Self {
            target: Mutex::new(target),
            prefix,
        }
    }
}

impl SimpleLogger<io::Stderr> {
    pub fn to_stderr(prefix: &'static str) -> Self {
        Self::new(io::stderr(), prefix)
    }
}

#[cfg(feature = "dev")]
impl SimpleLogger<File> {
    pub fn to_file(path: impl AsRef<Path>, prefix: &'static str) -> io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)?;
        Ok(Self::new(file, prefix))
    }
}

impl<W: Write + Send> log::Log for SimpleLogger<W> {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        // Several processes share stderr; a single write keeps their lines whole.
        let line = format!("{}{}\n", self.prefix, record.args());
        if let Ok(mut target) = self.target.lock() {
            let _ = target.write_all(line.as_bytes());
        }
    }

    fn flush(&self) {
        if let Ok(mut target) = self.target.lock() {
            let _ = target.flush();
        }
    }
}
