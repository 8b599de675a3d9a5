#![allow(unused_macros)]
use self::simple_logger::SimpleLogger;
use std::{
    fmt,
    ops::Deref,
    sync::atomic::{AtomicU8, Ordering},
};

mod simple_logger;

macro_rules! logger_macro {
    ($name:ident is $rule_level:ident to $target:expr, $d:tt) => {
        macro_rules! $name {
            ($d($d arg:tt)+) => (::log::log!(target: $target, ::log::Level::$rule_level, $d($d arg)+));
        }

        pub(crate) use $name;
    };
    ($name:ident is $rule_level:ident to $target:expr) => {
        logger_macro!($name is $rule_level to $target, $);
    };
}

logger_macro!(user_error is Error to "msh::user");
logger_macro!(user_warn is Warn to "msh::user");

macro_rules! dev_logger_macro {
    ($name:ident is $rule_level:ident to $target:expr, $d:tt) => {
        macro_rules! $name {
            ($d($d arg:tt)+) => {
                if std::cfg!(feature = "dev") {
                    (::log::log!(
                        target: $target,
                        ::log::Level::$rule_level,
                        "{} {}: {}",
                        $crate::log::Role::current(),
                        std::panic::Location::caller(),
                        format_args!($d($d arg)+)
                    ));
                }
            };
        }

        pub(crate) use $name;
    };
    ($name:ident is $rule_level:ident to $target:expr) => {
        dev_logger_macro!($name is $rule_level to $target, $);
    };
}

dev_logger_macro!(dev_error is Error to "msh::dev");
dev_logger_macro!(dev_warn is Warn to "msh::dev");
dev_logger_macro!(dev_info is Info to "msh::dev");

/// The part a process plays in the shell. Every process has exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Role {
    Controller = 1,
    Coordinator = 2,
    Executor = 3,
}

static ROLE: AtomicU8 = AtomicU8::new(0);

impl Role {
    /// Stamp the calling process with this role.
    pub(crate) fn stamp(self) {
        ROLE.store(self as u8, Ordering::Relaxed);
    }

    /// The role of the calling process, if it has been stamped already.
    pub(crate) fn current() -> RoleTag {
        RoleTag(match ROLE.load(Ordering::Relaxed) {
            1 => Some(Role::Controller),
            2 => Some(Role::Coordinator),
            3 => Some(Role::Executor),
            _ => None,
        })
    }
}

/// Display helper for dev log lines: `controller[1234]`.
pub(crate) struct RoleTag(Option<Role>);

impl RoleTag {
    #[cfg(test)]
    pub(crate) fn role(&self) -> Option<Role> {
        self.0
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.0 {
            Some(Role::Controller) => "controller",
            Some(Role::Coordinator) => "coordinator",
            Some(Role::Executor) => "executor",
            None => "unknown",
        };
        write!(f, "{name}[{}]", std::process::id())
    }
}

#[derive(Default)]
pub struct ShellLogger(Vec<(String, Box<dyn log::Log>)>);

impl ShellLogger {
    pub fn new(prefix: &'static str) -> Self {
        let mut logger: Self = Default::default();

        logger.add_logger("msh::user", SimpleLogger::to_stderr(prefix));

        #[cfg(feature = "dev")]
        {
            let path = option_env!("MSH_DEV_LOGS")
                .map(|s| s.into())
                .unwrap_or_else(|| {
                    std::env::temp_dir().join(format!("msh-dev-{}.log", std::process::id()))
                });
            if let Ok(file_logger) = SimpleLogger::to_file(path, "") {
                logger.add_logger("msh::dev", file_logger);
            }
        }

        logger
    }

    pub fn into_global_logger(self) {
        if log::set_boxed_logger(Box::new(self)).is_ok() {
            log::set_max_level(log::LevelFilter::Trace);
        }
    }

    /// Add a logger for a specific prefix to the stack
    fn add_logger(
        &mut self,
        prefix: impl ToString + Deref<Target = str>,
        logger: impl log::Log + 'static,
    ) {
        let prefix = if prefix.ends_with("::") {
            prefix.to_string()
        } else {
            // given a prefix `my::prefix`, we want to match `my::prefix::somewhere`
            // but not `my::prefix_to_somewhere`
            format!("{}::", prefix.to_string())
        };
        self.0.push((prefix, Box::new(logger)))
    }
}

impl log::Log for ShellLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level() && metadata.level() <= log::STATIC_MAX_LEVEL
    }

    fn log(&self, record: &log::Record) {
        for (prefix, l) in self.0.iter() {
            if record.target() == &prefix[..prefix.len() - 2] || record.target().starts_with(prefix)
            {
                l.log(record);
            }
        }
    }

    fn flush(&self) {
        for (_, l) in self.0.iter() {
            l.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Role, ShellLogger};
    use pretty_assertions::assert_eq;

    #[test]
    fn can_construct_logger() {
        let logger = ShellLogger::new("msh: ");
        let len = if cfg!(feature = "dev") { 2 } else { 1 };
        assert_eq!(logger.0.len(), len);
        assert_eq!(logger.0[0].0, "msh::user::");
    }

    #[test]
    fn role_is_stamped() {
        Role::Coordinator.stamp();
        assert_eq!(Role::current().role(), Some(Role::Coordinator));
        assert_eq!(
            Role::current().to_string(),
            format!("coordinator[{}]", std::process::id())
        );
        Role::Controller.stamp();
        assert_eq!(Role::current().role(), Some(Role::Controller));
    }
}
