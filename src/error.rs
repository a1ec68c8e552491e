//! Error types for world construction, copying, and (de)serialization.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of record a schema check was run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    World,
    Location,
    Layout,
    Layer,
    Element,
    Coordinate,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::World => "World",
            Entity::Location => "Location",
            Entity::Layout => "Layout",
            Entity::Layer => "Layer",
            Entity::Element => "Geometry::Element",
            Entity::Coordinate => "Coordinate",
        };
        f.write_str(name)
    }
}

/// A record did not have the shape its entity requires.
///
/// Validation stops at the first violation. Failures inside children are
/// wrapped in [`SchemaError::Nested`], one layer per level of the tree, so the
/// message of a deep failure reads from the World down to the offending key.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("object is not a {entity}: expected a record, found {found}")]
    NotARecord { entity: Entity, found: &'static str },

    #[error("object is not a {entity}: missing required key '{key}'")]
    MissingKey { entity: Entity, key: &'static str },

    #[error("object is not a {entity}: '{key}' must be {expected}")]
    WrongType {
        entity: Entity,
        key: &'static str,
        expected: &'static str,
    },

    #[error("object is not a Coordinate: {reason}")]
    InvalidCoordinate { reason: String },

    #[error("object is not a {entity}: unrecognized kind {found}")]
    UnknownKind { entity: Entity, found: String },

    #[error("object is not a {entity}: '{key}' is invalid: {source}")]
    InvalidField {
        entity: Entity,
        key: &'static str,
        #[source]
        source: Box<SchemaError>,
    },

    #[error("object is not a valid {parent}: element {index} of '{key}' is invalid: {source}")]
    Nested {
        parent: Entity,
        key: &'static str,
        index: usize,
        #[source]
        source: Box<SchemaError>,
    },
}

impl SchemaError {
    pub(crate) fn nested(parent: Entity, key: &'static str, index: usize, source: Self) -> Self {
        SchemaError::Nested {
            parent,
            key,
            index,
            source: Box::new(source),
        }
    }

    pub(crate) fn field(entity: Entity, key: &'static str, source: Self) -> Self {
        SchemaError::InvalidField {
            entity,
            key,
            source: Box::new(source),
        }
    }

    fn inner(&self) -> Option<&SchemaError> {
        match self {
            SchemaError::Nested { source, .. } | SchemaError::InvalidField { source, .. } => {
                Some(source.as_ref())
            }
            _ => None,
        }
    }

    /// The innermost failure of a nested chain.
    pub fn root_cause(&self) -> &SchemaError {
        let mut current = self;
        while let Some(inner) = current.inner() {
            current = inner;
        }
        current
    }

    /// The `(key, index)` sequence steps leading to the root cause, outermost first.
    pub fn path(&self) -> Vec<(&'static str, usize)> {
        let mut steps = Vec::new();
        let mut current = Some(self);
        while let Some(err) = current {
            if let SchemaError::Nested { key, index, .. } = err {
                steps.push((*key, *index));
            }
            current = err.inner();
        }
        steps
    }
}

/// Failure while taking a reference-free copy of a [`Dynamic`](crate::value::Dynamic) graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CopyError {
    #[error("cycle detected during copying: a container refers back to one of its ancestors")]
    Cycle,

    #[error("unsupported type encountered during copying: {type_name}")]
    UnsupportedType { type_name: String },
}

/// Top-level error for every fallible operation of the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Copy(#[from] CopyError),

    #[error("failed to parse world data: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("parsed data is not a valid World: {0}")]
    InvalidWorld(#[source] SchemaError),

    #[error("failed to emit text: {0}")]
    Emit(#[source] serde_json::Error),

    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),
}
