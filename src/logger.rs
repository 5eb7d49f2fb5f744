//! Leveled logging capability handed to the reader at construction

use std::error::Error;
use std::fmt;

pub use log::Level;

/// Sink for the reader's diagnostic messages.
///
/// Only [`ListingLogger::log`] is required; the level helpers forward to it.
pub trait ListingLogger: Send + Sync {
    fn log(&self, level: Level, args: fmt::Arguments<'_>);

    fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    /// Error message carrying the fault that caused it.
    fn error_with_cause(&self, cause: &dyn Error, args: fmt::Arguments<'_>) {
        self.log(Level::Error, format_args!("{} ({})", args, cause));
    }
}

/// Forwards to the `log` facade. Silent unless the host installs a backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeLogger;

impl ListingLogger for FacadeLogger {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: "xmltv_listings", level, "{}", args);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl ListingLogger for NullLogger {
    fn log(&self, _level: Level, _args: fmt::Arguments<'_>) {}
}
