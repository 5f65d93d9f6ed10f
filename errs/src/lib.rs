//! Error wrapping helpers
//!
//! Attach a context message to an error without losing it. The wrapped error
//! stays reachable through [`std::error::Error::source`], so callers can still
//! match on the original type with [`is`], [`find`] or [`is_any`].
//!
//! ```rust
//! use errs::ResultExt;
//!
//! fn port() -> Result<u16, errs::Wrapped> {
//!     "80a".parse::<u16>().wrap("parsing port")
//! }
//!
//! let err = port().unwrap_err();
//! assert_eq!(err.to_string(), "parsing port: invalid digit found in string");
//! assert!(errs::is::<std::num::ParseIntError>(&err));
//! ```

use std::error::Error as StdError;
use thiserror::Error;

/// Owned, thread-safe trait object used as the wrapped source.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Predicate applied to each link of an error chain by [`is_any`].
pub type Matcher = fn(&(dyn StdError + 'static)) -> bool;

/// An error with a context message in front of it.
#[derive(Debug, Error)]
#[error("{message}: {source}")]
pub struct Wrapped {
    message: String,
    #[source]
    source: BoxError,
}

impl Wrapped {
    pub fn new(source: impl Into<BoxError>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: source.into(),
        }
    }

    /// The context message, without the wrapped error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Drop the context and return the wrapped error.
    pub fn into_inner(self) -> BoxError {
        self.source
    }
}

/// Wrap `err` with `message`.
pub fn wrap<E: Into<BoxError>>(err: E, message: impl Into<String>) -> Wrapped {
    Wrapped::new(err, message)
}

/// Context helpers on any `Result` whose error can be boxed.
///
/// `Ok` values pass through untouched.
pub trait ResultExt<T> {
    fn wrap(self, message: &str) -> Result<T, Wrapped>;

    /// Like [`ResultExt::wrap`] with a lazily formatted message.
    fn wrap_with<F, S>(self, message: F) -> Result<T, Wrapped>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<BoxError>,
{
    fn wrap(self, message: &str) -> Result<T, Wrapped> {
        self.map_err(|e| Wrapped::new(e, message))
    }

    fn wrap_with<F, S>(self, message: F) -> Result<T, Wrapped>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Wrapped::new(e, message()))
    }
}

/// Iterator over an error and its sources, outermost first.
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    next: Option<&'a (dyn StdError + 'static)>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a (dyn StdError + 'static);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.source();
        Some(current)
    }
}

pub fn chain<'a>(err: &'a (dyn StdError + 'static)) -> Chain<'a> {
    Chain { next: Some(err) }
}

/// The innermost error of the chain.
pub fn cause<'a>(err: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    chain(err).last().unwrap_or(err)
}

/// First error of type `E` anywhere in the chain.
pub fn find<'a, E>(err: &'a (dyn StdError + 'static)) -> Option<&'a E>
where
    E: StdError + 'static,
{
    chain(err).find_map(|e| e.downcast_ref::<E>())
}

pub fn is<E>(err: &(dyn StdError + 'static)) -> bool
where
    E: StdError + 'static,
{
    find::<E>(err).is_some()
}

/// Matcher for [`is_any`] accepting errors of type `E`.
pub fn of<E>(err: &(dyn StdError + 'static)) -> bool
where
    E: StdError + 'static,
{
    err.is::<E>()
}

/// True when any matcher accepts any link of the chain.
pub fn is_any(err: &(dyn StdError + 'static), matchers: &[Matcher]) -> bool {
    chain(err).any(|e| matchers.iter().any(|m| m(e)))
}
