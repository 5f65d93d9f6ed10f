//! Typed environment lookups
//!
//! [`get`] never fails: a missing variable or a value that does not parse as
//! the requested type yields the supplied default. [`get_exists`] tells the
//! two cases apart.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

/// Variable consulted by [`load_environment`].
pub const ENVIRONMENT_VAR: &str = "APP_ENV";

/// Types that can be read from an environment variable.
pub trait FromEnv: Sized {
    fn from_env_str(raw: &str) -> Option<Self>;
}

impl FromEnv for String {
    fn from_env_str(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl FromEnv for Vec<u8> {
    fn from_env_str(raw: &str) -> Option<Self> {
        Some(raw.as_bytes().to_vec())
    }
}

impl FromEnv for bool {
    fn from_env_str(raw: &str) -> Option<Self> {
        match raw {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
            _ => None,
        }
    }
}

macro_rules! from_env_via_parse {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromEnv for $ty {
                fn from_env_str(raw: &str) -> Option<Self> {
                    raw.parse().ok()
                }
            }
        )*
    };
}

from_env_via_parse!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// Value of `key`, or `default` when unset or unparsable.
pub fn get<T: FromEnv>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => T::from_env_str(&raw).unwrap_or(default),
        Err(_) => default,
    }
}

/// `None` when `key` is unset.
///
/// A set but unparsable value yields `Some(T::default())`.
pub fn get_exists<T: FromEnv + Default>(key: &str) -> Option<T> {
    std::env::var_os(key)?;
    Some(get(key, T::default()))
}

/// Deployment tier of the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Qa,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Qa => "qa",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Environment::Local),
            "qa" => Ok(Environment::Qa),
            "prod" => Ok(Environment::Prod),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }
}

static CURRENT: RwLock<Option<Environment>> = RwLock::new(None);

pub fn set_environment(env: Environment) {
    *CURRENT.write().unwrap_or_else(PoisonError::into_inner) = Some(env);
}

/// The tier set by [`set_environment`] or [`load_environment`], if any.
pub fn environment() -> Option<Environment> {
    *CURRENT.read().unwrap_or_else(PoisonError::into_inner)
}

/// Read the tier from `APP_ENV` and make it current.
pub fn load_environment() -> Result<Environment, ConfigError> {
    let raw: String = get(ENVIRONMENT_VAR, String::new());
    let env = raw.parse::<Environment>()?;
    set_environment(env);
    tracing::debug!(environment = %env, "environment loaded");
    Ok(env)
}

pub fn is_local() -> bool {
    environment() == Some(Environment::Local)
}

pub fn is_qa() -> bool {
    environment() == Some(Environment::Qa)
}

pub fn is_prod() -> bool {
    environment() == Some(Environment::Prod)
}
