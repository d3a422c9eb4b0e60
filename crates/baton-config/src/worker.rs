//! Identity and opaque parameters of the gated worker.
//!
//! A [`WorkerSection`] mirrors the on-disk shape of the worker table: a single
//! key naming the worker (`kind` or `kind/name`) that maps to the parameters
//! handed verbatim to the worker factory. [`WorkerSection::to_spec`] turns it
//! into the immutable [`WorkerSpec`] consumed by the lifecycle manager.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::ConfigurationError;

const KIND_MAX_LEN: usize = 63;
const NAME_SEPARATOR: char = '/';

/// Opaque worker parameters. Never interpreted by the lifecycle manager.
pub type Parameters = BTreeMap<String, Value>;

/// Structured worker identity: a kind plus an optional instance qualifier.
///
/// Used for logging and correlation only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId {
    kind: String,
    name: Option<String>,
}

impl WorkerId {
    /// Builds an identity without an instance qualifier.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerIdParseError`] when `kind` is not a valid kind.
    pub fn new(kind: &str) -> Result<Self, WorkerIdParseError> {
        validate_kind(kind)?;
        Ok(Self {
            kind: kind.to_owned(),
            name: None,
        })
    }

    /// Builds an identity qualified by an instance name.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerIdParseError`] when either part is invalid.
    pub fn with_name(kind: &str, name: &str) -> Result<Self, WorkerIdParseError> {
        validate_kind(kind)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkerIdParseError::EmptyName {
                kind: kind.to_owned(),
            });
        }
        Ok(Self {
            kind: kind.to_owned(),
            name: Some(name.to_owned()),
        })
    }

    /// Worker kind, e.g. `otlp`.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.kind.as_str()
    }

    /// Instance qualifier, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(formatter, "{}{NAME_SEPARATOR}{name}", self.kind),
            None => formatter.write_str(&self.kind),
        }
    }
}

impl FromStr for WorkerId {
    type Err = WorkerIdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match trimmed.split_once(NAME_SEPARATOR) {
            Some((kind, name)) => Self::with_name(kind.trim(), name),
            None => Self::new(trimmed),
        }
    }
}

/// Errors raised while parsing a [`WorkerId`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkerIdParseError {
    /// The kind was empty.
    #[error("worker kind must not be empty")]
    EmptyKind,
    /// The kind contained unsupported characters or was too long.
    #[error(
        "invalid worker kind '{kind}': must start with an ASCII letter and contain at most \
         {KIND_MAX_LEN} ASCII alphanumerics or underscores"
    )]
    InvalidKind {
        /// Offending kind.
        kind: String,
    },
    /// A `/` separator was present but the instance name was blank.
    #[error("worker '{kind}' has an empty instance name")]
    EmptyName {
        /// Kind preceding the separator.
        kind: String,
    },
}

fn validate_kind(kind: &str) -> Result<(), WorkerIdParseError> {
    let mut chars = kind.chars();
    let Some(first) = chars.next() else {
        return Err(WorkerIdParseError::EmptyKind);
    };
    let valid = first.is_ascii_alphabetic()
        && kind.len() <= KIND_MAX_LEN
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(WorkerIdParseError::InvalidKind {
            kind: kind.to_owned(),
        })
    }
}

/// The single worker gated by a lifecycle manager.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSpec {
    id: WorkerId,
    parameters: Parameters,
}

impl WorkerSpec {
    /// Builds a specification from its parts.
    #[must_use]
    pub const fn new(id: WorkerId, parameters: Parameters) -> Self {
        Self { id, parameters }
    }

    /// Worker identity.
    #[must_use]
    pub const fn id(&self) -> &WorkerId {
        &self.id
    }

    /// Opaque parameters passed through to the worker factory.
    #[must_use]
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}

/// Worker table as it appears in configuration sources.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct WorkerSection {
    entries: BTreeMap<String, Value>,
}

impl WorkerSection {
    /// Returns `true` when no worker is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validates the section and materialises the [`WorkerSpec`].
    ///
    /// # Errors
    ///
    /// Fails unless exactly one worker with a valid identity and table-shaped
    /// (or null) parameters is present.
    pub fn to_spec(&self) -> Result<WorkerSpec, ConfigurationError> {
        let mut entries = self.entries.iter();
        let Some((raw_id, value)) = entries.next() else {
            return Err(ConfigurationError::MissingWorker);
        };
        if entries.next().is_some() {
            return Err(ConfigurationError::MultipleWorkers {
                ids: self.entries.keys().cloned().collect(),
            });
        }

        let id = raw_id
            .parse::<WorkerId>()
            .map_err(|source| ConfigurationError::InvalidWorkerId {
                id: raw_id.clone(),
                source,
            })?;
        let parameters = match value {
            Value::Null => Parameters::new(),
            Value::Object(table) => table
                .iter()
                .map(|(key, entry)| (key.clone(), entry.clone()))
                .collect(),
            _ => {
                return Err(ConfigurationError::InvalidParameters {
                    id: raw_id.clone(),
                });
            }
        };
        Ok(WorkerSpec::new(id, parameters))
    }
}

impl From<&WorkerSpec> for WorkerSection {
    fn from(spec: &WorkerSpec) -> Self {
        let table = spec
            .parameters()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<serde_json::Map<String, Value>>();
        let mut entries = BTreeMap::new();
        entries.insert(spec.id().to_string(), Value::Object(table));
        Self { entries }
    }
}

impl FromStr for WorkerSection {
    type Err = WorkerSectionParseError;

    /// Parses the JSON form used on the command line and in the environment,
    /// e.g. `{"otlp/1": {"protocols": {"grpc": null}}}`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(value).map_err(WorkerSectionParseError)
    }
}

/// Error returned when the JSON form of a [`WorkerSection`] is malformed.
#[derive(Debug, Error)]
#[error("invalid worker table: {0}")]
pub struct WorkerSectionParseError(#[source] serde_json::Error);
