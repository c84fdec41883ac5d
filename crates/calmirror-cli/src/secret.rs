//! Secret reference resolver.
//!
//! Values in `config.toml` can point at secrets stored outside the file:
//!
//! - `pass::path/in/store` runs `pass show path/in/store` and keeps the first line
//! - `env::VAR_NAME` reads `$VAR_NAME`
//! - anything else is used as-is

use std::process::Command;

use thiserror::Error;

/// Failure to resolve a secret reference.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to run `pass show {path}`: {source}")]
    PassSpawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`pass show {path}` failed ({status}): {stderr}")]
    PassFailed {
        path: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("`pass show {path}` produced no output")]
    PassEmpty { path: String },

    #[error("environment variable `{0}` is not set")]
    EnvMissing(String),
}

/// A parsed config value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretRef<'a> {
    Pass(&'a str),
    Env(&'a str),
    Plain(&'a str),
}

impl<'a> SecretRef<'a> {
    pub fn parse(value: &'a str) -> Self {
        if let Some(path) = value.strip_prefix("pass::") {
            Self::Pass(path)
        } else if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else {
            Self::Plain(value)
        }
    }

    /// Returns true if resolving this value reads from outside the file.
    pub fn is_reference(&self) -> bool {
        !matches!(self, Self::Plain(_))
    }

    pub fn resolve(self) -> Result<String, SecretError> {
        match self {
            Self::Pass(path) => resolve_pass(path),
            Self::Env(var) => std::env::var(var).map_err(|_| SecretError::EnvMissing(var.to_string())),
            Self::Plain(value) => Ok(value.to_string()),
        }
    }
}

/// Resolves a value that may carry a `pass::` or `env::` prefix.
pub fn resolve(value: &str) -> Result<String, SecretError> {
    SecretRef::parse(value).resolve()
}

fn resolve_pass(path: &str) -> Result<String, SecretError> {
    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|source| SecretError::PassSpawn {
            path: path.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(SecretError::PassFailed {
            path: path.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| SecretError::PassEmpty {
            path: path.to_string(),
        })
}
