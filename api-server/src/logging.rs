//! Process-wide `env_logger` setup plus the per-component handle services log through.

use std::fmt;
use std::sync::Once;

use env_logger::Env;
use log::Level;

static LOGGER: Once = Once::new();

pub const DEFAULT_FILTER: &str = "info,rocket::server=warn,rocket::request=warn";

pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER)).init();
    });
}

/// Logging handle handed to a component at construction; every record it
/// emits is tagged with the component's name as the `log` target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogContext {
    target: &'static str,
}

impl LogContext {
    pub const fn new(target: &'static str) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, args);
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Error, args);
    }

    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: self.target, level, "{}", args);
    }
}
