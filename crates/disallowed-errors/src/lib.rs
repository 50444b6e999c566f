//! Shared error facade for disallowed-call rule translation.
//!
//! Every fallible operation in the workspace returns [`RuleResult`]. Errors carry a
//! coarse [`ErrorKind`] describing who is at fault, a stable [`ErrorCode`] that
//! tooling can match on, a human readable message, and ordered key/value context.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

/// Convenient alias used across the workspace.
pub type RuleResult<T> = Result<T, RuleError>;

/// Who is responsible for an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorKind {
    /// The caller supplied invalid configuration.
    Usage,
    /// The surrounding environment failed (filesystem, permissions).
    Environment,
    /// An invariant inside this workspace was violated.
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Usage => "usage",
            ErrorKind::Environment => "environment",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable error codes surfaced to hosts and log consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
    Unknown,
    /// A configuration entry names neither a function nor a method.
    MissingCallName,
    InvalidConfigValue,
    InvalidGlob,
    Io,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 5] = [
        ErrorCode::Unknown,
        ErrorCode::MissingCallName,
        ErrorCode::InvalidConfigValue,
        ErrorCode::InvalidGlob,
        ErrorCode::Io,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Unknown => "ERR_UNKNOWN",
            ErrorCode::MissingCallName => "ERR_MISSING_CALL_NAME",
            ErrorCode::InvalidConfigValue => "ERR_INVALID_CONFIG_VALUE",
            ErrorCode::InvalidGlob => "ERR_INVALID_GLOB",
            ErrorCode::Io => "ERR_IO",
        }
    }

    /// Parse the `ERR_*` representation back into a code.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_str() == value)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type shared by every crate in the workspace.
#[derive(Debug)]
pub struct RuleError {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    message: Cow<'static, str>,
    pub context: Vec<(&'static str, String)>,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl RuleError {
    pub fn new(kind: ErrorKind, code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            context: Vec::new(),
            source: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Attach a key/value annotation. Repeated keys replace the earlier value.
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.context.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.context.push((key, value)),
        }
        self
    }

    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(existing, _)| *existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn source_ref(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.context.is_empty() {
            f.write_str(" (")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl StdError for RuleError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

/// Build a [`ErrorKind::Usage`] error from a code and format arguments.
#[macro_export]
macro_rules! usage {
    ($code:expr, $($arg:tt)+) => {
        $crate::RuleError::new($crate::ErrorKind::Usage, $code, format!($($arg)+))
    };
}

/// Build a [`ErrorKind::Environment`] error from a code and format arguments.
#[macro_export]
macro_rules! enverr {
    ($code:expr, $($arg:tt)+) => {
        $crate::RuleError::new($crate::ErrorKind::Environment, $code, format!($($arg)+))
    };
}

/// Build a [`ErrorKind::Internal`] error from a code and format arguments.
#[macro_export]
macro_rules! bug {
    ($code:expr, $($arg:tt)+) => {
        $crate::RuleError::new($crate::ErrorKind::Internal, $code, format!($($arg)+))
    };
}
