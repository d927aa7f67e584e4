//! I define [`ReasoningConfig`], the tuning knobs of the [reasoning engine](crate::engine).
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// The configuration of a [`ReasoningEngine`](crate::engine::ReasoningEngine).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReasoningConfig {
    /// Number of inferred triples after which the store and the justifications are committed.
    ///
    /// Larger batches improve throughput,
    /// smaller batches reduce the memory footprint of transactions and lock hold time.
    pub batch_size: usize,
    /// Whether justifications already persisted are filtered out before persisting new ones.
    pub remove_duplicate_justifications: bool,
    /// Number of reasoning workers.
    ///
    /// Rule evaluation always runs on a single worker;
    /// larger values are accepted and ignored.
    pub workers: usize,
    /// Number of transactions that can wait for reasoning
    /// before committing threads are blocked.
    pub queue_capacity: usize,
    /// Number of times [`shutdown`](crate::engine::ReasoningEngine::shutdown)
    /// checks whether the worker has finished.
    pub shutdown_retries: u32,
    /// Delay between two such checks.
    pub shutdown_poll: Duration,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        ReasoningConfig {
            batch_size: 1000,
            remove_duplicate_justifications: true,
            workers: 1,
            queue_capacity: 100_000,
            shutdown_retries: 10,
            shutdown_poll: Duration::from_millis(100),
        }
    }
}

impl ReasoningConfig {
    /// Return this configuration with the given batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Return this configuration with duplicate removal enabled or disabled.
    pub fn with_remove_duplicate_justifications(mut self, remove: bool) -> Self {
        self.remove_duplicate_justifications = remove;
        self
    }

    /// Return this configuration with the given number of workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Return this configuration with the given queue capacity.
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Return this configuration with the given shutdown polling policy.
    pub fn with_shutdown_poll(mut self, retries: u32, poll: Duration) -> Self {
        self.shutdown_retries = retries;
        self.shutdown_poll = poll;
        self
    }

    /// Build a configuration from `reasoning.*` properties,
    /// starting from the default configuration.
    ///
    /// Recognized keys are
    /// `reasoning.batch_size`, `reasoning.remove_duplicates`, `reasoning.workers`,
    /// `reasoning.queue_capacity`, `reasoning.shutdown_retries` and `reasoning.shutdown_poll_ms`.
    /// Other keys are ignored with a warning.
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in properties {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key {
                "reasoning.batch_size" => config.batch_size = parse(key, value)?,
                "reasoning.remove_duplicates" => {
                    config.remove_duplicate_justifications = parse(key, value)?
                }
                "reasoning.workers" => config.workers = parse(key, value)?,
                "reasoning.queue_capacity" => config.queue_capacity = parse(key, value)?,
                "reasoning.shutdown_retries" => config.shutdown_retries = parse(key, value)?,
                "reasoning.shutdown_poll_ms" => {
                    config.shutdown_poll = Duration::from_millis(parse(key, value)?)
                }
                _ => log::warn!("Ignoring unknown reasoning property {key:?}"),
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Check that this configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Zero("batch_size"));
        }
        if self.workers == 0 {
            return Err(ConfigError::Zero("workers"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Zero("queue_capacity"));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// This error is raised when a [`ReasoningConfig`] is invalid.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A property value could not be parsed
    #[error("Invalid value {value:?} for property {key:?}")]
    InvalidValue {
        /// The property key
        key: String,
        /// The offending value
        value: String,
    },
    /// A setting that must be strictly positive is zero
    #[error("Reasoning setting '{0}' must be strictly positive")]
    Zero(&'static str),
}
