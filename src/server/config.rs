//! Run configuration for the dispatcher.

use super::error::ServerError;
use super::lock::DEFAULT_MAX_READERS;
use std::fmt;

/// How requests are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// One thread decodes and applies requests in order.
    #[default]
    Sequential,
    /// One producer feeds a lock-free queue drained by a pool of consumers.
    Parallel,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Sequential => write!(f, "sequential"),
            Mode::Parallel => write!(f, "parallel"),
        }
    }
}

/// Configuration of a [`Dispatcher`](super::dispatcher::Dispatcher) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Execution mode
    pub mode: Mode,

    /// Number of consumers; only meaningful in parallel mode
    pub consumers: usize,

    /// Cap on concurrent feed readers
    pub max_readers: usize,

    /// Stack size in bytes for consumer threads; the platform default when
    /// `None`
    pub stack_size: Option<usize>,
}

impl ServerConfig {
    /// Sequential execution.
    pub fn sequential() -> Self {
        ServerConfig {
            mode: Mode::Sequential,
            consumers: 1,
            max_readers: DEFAULT_MAX_READERS,
            stack_size: None,
        }
    }

    /// Parallel execution with `consumers` worker threads.
    pub fn parallel(consumers: usize) -> Self {
        ServerConfig {
            mode: Mode::Parallel,
            consumers,
            max_readers: DEFAULT_MAX_READERS,
            stack_size: None,
        }
    }

    /// Overrides the cap on concurrent feed readers.
    #[must_use]
    pub fn with_max_readers(mut self, max_readers: usize) -> Self {
        self.max_readers = max_readers;
        self
    }

    /// Sets the stack size of consumer threads.
    #[must_use]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Builds a configuration from command-line arguments (program name
    /// excluded).
    ///
    /// The first argument, when it is an integer greater than one, selects
    /// parallel mode with that many consumers. Anything else, including no
    /// argument at all, selects sequential mode.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match args
            .into_iter()
            .next()
            .and_then(|arg| arg.as_ref().trim().parse::<usize>().ok())
        {
            Some(consumers) if consumers > 1 => Self::parallel(consumers),
            _ => Self::sequential(),
        }
    }

    /// Checks that the configuration can be run.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidConfig`] for a parallel configuration
    /// without consumers or a reader cap of zero.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.mode == Mode::Parallel && self.consumers == 0 {
            return Err(ServerError::InvalidConfig {
                message: "parallel mode needs at least one consumer".to_string(),
            });
        }
        if self.max_readers == 0 {
            return Err(ServerError::InvalidConfig {
                message: "max_readers must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::sequential()
    }
}
