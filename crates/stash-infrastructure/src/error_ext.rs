//! Error context extension
//!
//! Lifts foreign errors (I/O, TOML, sysinfo tasks...) into the domain
//! [`Error`] while keeping them as the `source`.
//!
//! ```ignore
//! use stash_infrastructure::error_ext::ErrorContext;
//!
//! let text = std::fs::read_to_string(&path).io_context("Failed to read stash.toml")?;
//! let parsed: AppConfig = toml::from_str(&text).config_context("Invalid stash.toml")?;
//! ```

use stash_domain::error::{Error, Result};
use std::fmt;

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Wrap the error as an infrastructure error
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;

    /// Same as [`ErrorContext::context`] with a lazily built message
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;

    /// Wrap the error as an I/O error
    fn io_context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;

    /// Wrap the error as a configuration error
    fn config_context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;

    /// Wrap the error as a (transient) network error
    fn network_context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|err| Error::infrastructure_with_source(format!("{context}: {err}"), err))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|err| Error::infrastructure_with_source(format!("{}: {err}", f()), err))
    }

    fn io_context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|err| Error::io_with_source(format!("{context}: {err}"), err))
    }

    fn config_context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|err| Error::configuration_with_source(format!("{context}: {err}"), err))
    }

    fn network_context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|err| Error::network_with_source(format!("{context}: {err}"), err))
    }
}
